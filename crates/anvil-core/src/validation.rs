//! # Validation Module
//!
//! Input checks run before anything touches the store.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: CLI argument parsing (clap)                                  │
//! │  ├── Types, required flags                                             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                   │
//! │  ├── Names, phones, quantities, prices, payments                       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite                                                        │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use anvil_core::validation::{validate_product_name, validate_quantity};
//!
//! validate_product_name("CPVC Elbow 3/4in").unwrap();
//! validate_quantity(25).unwrap();
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{NewCustomer, NewProduct, NewSupplier, ShopInfo};
use crate::{MAX_AMOUNT_PAISE, MAX_CART_ITEMS, MAX_ITEM_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

const MAX_NAME_LEN: usize = 200;
const MAX_TEXT_LEN: usize = 500;

// =============================================================================
// String Validators
// =============================================================================

fn required_text(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

fn optional_text(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    if value.trim().chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }
    Ok(())
}

/// Validates a product name.
///
/// ## Example
/// ```rust
/// use anvil_core::validation::validate_product_name;
///
/// assert!(validate_product_name("Ball Valve 1in").is_ok());
/// assert!(validate_product_name("   ").is_err());
/// ```
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    required_text("name", name, MAX_NAME_LEN)
}

/// Validates a category, supplier or customer name.
pub fn validate_party_name(name: &str) -> ValidationResult<()> {
    required_text("name", name, MAX_NAME_LEN)
}

/// Validates a phone number. Empty is allowed.
///
/// ## Rules
/// - Digits, spaces, hyphens and one leading `+`
/// - 6 to 15 digits
pub fn validate_phone(phone: &str) -> ValidationResult<()> {
    let phone = phone.trim();
    if phone.is_empty() {
        return Ok(());
    }

    let body = phone.strip_prefix('+').unwrap_or(phone);
    if !body
        .chars()
        .all(|c| c.is_ascii_digit() || c == ' ' || c == '-')
    {
        return Err(ValidationError::InvalidFormat {
            field: "phone".to_string(),
            reason: "may only contain digits, spaces and hyphens".to_string(),
        });
    }

    let digits = body.chars().filter(|c| c.is_ascii_digit()).count();
    if !(6..=15).contains(&digits) {
        return Err(ValidationError::InvalidFormat {
            field: "phone".to_string(),
            reason: "must have between 6 and 15 digits".to_string(),
        });
    }

    Ok(())
}

/// Validates an email address. Empty is allowed.
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();
    if email.is_empty() {
        return Ok(());
    }

    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(ValidationError::InvalidFormat {
            field: "email".to_string(),
            reason: "must look like name@example.com".to_string(),
        }),
    }
}

/// Validates the sale invoice prefix (1-10 letters, digits, `-` or `/`).
pub fn validate_invoice_prefix(prefix: &str) -> ValidationResult<()> {
    required_text("invoice prefix", prefix, 10)?;

    if !prefix
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '/')
    {
        return Err(ValidationError::InvalidFormat {
            field: "invoice prefix".to_string(),
            reason: "may only contain letters, digits, '-' and '/'".to_string(),
        });
    }

    Ok(())
}

/// Validates a search query.
///
/// Empty is allowed and means "everything". Returns the trimmed query.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.len() > 100 {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: 100,
        });
    }

    Ok(query.to_string())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
///
/// ```text
/// Cart: add "M8 Anchor Bolt" × qty
///       │
///       ├── qty <= 0?      → "quantity must be positive"
///       ├── qty > 99 999?  → "quantity must be between 1 and 99999"
///       └── OK → stock check
/// ```
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a stock level or threshold (zero allowed).
pub fn validate_stock_level(field: &str, level: i64) -> ValidationResult<()> {
    if level < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates a price. Zero is allowed (free samples).
///
/// ## Example
/// ```rust
/// use anvil_core::money::Money;
/// use anvil_core::validation::validate_price;
///
/// assert!(validate_price("selling price", Money::from_paise(0)).is_ok());
/// assert!(validate_price("selling price", Money::from_paise(-1)).is_err());
/// assert!(validate_price("selling price", Money::from_paise(i64::MAX)).is_err());
/// ```
pub fn validate_price(field: &str, price: Money) -> ValidationResult<()> {
    if price.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    validate_amount_cap(field, price)
}

/// Validates a payment against an existing sale or purchase.
pub fn validate_payment_amount(amount: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "payment amount".to_string(),
        });
    }
    validate_amount_cap("payment amount", amount)
}

/// Rejects amounts above [`MAX_AMOUNT_PAISE`]. The message is in rupees.
fn validate_amount_cap(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.paise() > MAX_AMOUNT_PAISE {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_AMOUNT_PAISE / 100,
        });
    }
    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates that one more line fits in the cart.
pub fn validate_cart_size(current_lines: usize) -> ValidationResult<()> {
    if current_lines >= MAX_CART_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "cart items".to_string(),
            min: 0,
            max: MAX_CART_ITEMS as i64,
        });
    }
    Ok(())
}

// =============================================================================
// Record Validators
// =============================================================================

pub fn validate_new_product(product: &NewProduct) -> ValidationResult<()> {
    validate_product_name(&product.name)?;
    optional_text("brand", &product.brand, MAX_NAME_LEN)?;
    optional_text("size", &product.size, MAX_NAME_LEN)?;
    optional_text("color", &product.color, MAX_NAME_LEN)?;
    required_text("unit", &product.unit, 20)?;
    optional_text("barcode", &product.barcode, 64)?;
    validate_price("purchase price", product.purchase_price)?;
    validate_price("selling price", product.selling_price)?;
    validate_stock_level("opening stock", product.opening_stock)?;
    validate_stock_level("low stock alert", product.low_stock_alert)?;
    Ok(())
}

pub fn validate_new_supplier(supplier: &NewSupplier) -> ValidationResult<()> {
    validate_party_name(&supplier.name)?;
    validate_phone(&supplier.phone)?;
    optional_text("address", &supplier.address, MAX_TEXT_LEN)
}

pub fn validate_new_customer(customer: &NewCustomer) -> ValidationResult<()> {
    validate_party_name(&customer.name)?;
    validate_phone(&customer.phone)
}

pub fn validate_shop_info(info: &ShopInfo) -> ValidationResult<()> {
    required_text("shop name", &info.shop_name, MAX_NAME_LEN)?;
    optional_text("location", &info.location, MAX_TEXT_LEN)?;
    validate_phone(&info.phone)?;
    validate_email(&info.email)?;
    optional_text("GST number", &info.gst_number, 15)?;
    validate_invoice_prefix(&info.invoice_prefix)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_product_name() {
        assert!(validate_product_name("GI Pipe 1/2in").is_ok());
        assert!(validate_product_name("").is_err());
        assert!(validate_product_name(&"A".repeat(300)).is_err());
    }

    #[test]
    fn test_validate_phone() {
        assert!(validate_phone("").is_ok());
        assert!(validate_phone("9999999999").is_ok());
        assert!(validate_phone("+91 98765-43210").is_ok());

        assert!(validate_phone("12345").is_err());
        assert!(validate_phone("98765abc10").is_err());
        assert!(validate_phone("1234567890123456").is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("").is_ok());
        assert!(validate_email("shop@example.in").is_ok());
        assert!(validate_email("shop@local").is_err());
        assert!(validate_email("@example.in").is_err());
    }

    #[test]
    fn test_validate_invoice_prefix() {
        assert!(validate_invoice_prefix("INV").is_ok());
        assert!(validate_invoice_prefix("KH/24-").is_ok());
        assert!(validate_invoice_prefix("").is_err());
        assert!(validate_invoice_prefix("INV #").is_err());
        assert!(validate_invoice_prefix("ABCDEFGHIJK").is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(MAX_ITEM_QUANTITY).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(MAX_ITEM_QUANTITY + 1).is_err());
    }

    #[test]
    fn test_validate_payment_amount() {
        assert!(validate_payment_amount(Money::from_paise(1)).is_ok());
        assert!(validate_payment_amount(Money::zero()).is_err());
        assert!(validate_payment_amount(Money::from_paise(-100)).is_err());
        assert!(validate_payment_amount(Money::from_paise(MAX_AMOUNT_PAISE)).is_ok());
        assert!(validate_payment_amount(Money::from_paise(i64::MAX - 10)).is_err());
    }

    #[test]
    fn test_validate_price_cap() {
        assert!(validate_price("selling price", Money::zero()).is_ok());
        assert!(validate_price("selling price", Money::from_paise(MAX_AMOUNT_PAISE)).is_ok());
        assert!(matches!(
            validate_price("selling price", Money::from_paise(MAX_AMOUNT_PAISE + 1)),
            Err(ValidationError::OutOfRange { max, .. }) if max == MAX_AMOUNT_PAISE / 100
        ));
        assert!(validate_price("selling price", Money::from_paise(-1)).is_err());
    }

    #[test]
    fn test_validate_cart_size() {
        assert!(validate_cart_size(0).is_ok());
        assert!(validate_cart_size(MAX_CART_ITEMS - 1).is_ok());
        assert!(validate_cart_size(MAX_CART_ITEMS).is_err());
    }

    #[test]
    fn test_validate_new_product() {
        let ok = NewProduct::new("Hacksaw Blade", Money::from_rupees(20), Money::from_rupees(30));
        assert!(validate_new_product(&ok).is_ok());

        let negative = ok.clone().with_opening_stock(-1);
        assert!(matches!(
            validate_new_product(&negative),
            Err(ValidationError::MustNotBeNegative { .. })
        ));

        let mut no_unit = ok;
        no_unit.unit = String::new();
        assert!(validate_new_product(&no_unit).is_err());
    }

    #[test]
    fn test_validate_search_query_trims() {
        assert_eq!(validate_search_query("  paint ").unwrap(), "paint");
        assert!(validate_search_query(&"x".repeat(101)).is_err());
    }
}
