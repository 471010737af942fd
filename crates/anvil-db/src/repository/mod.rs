//! # Repositories
//!
//! One repository per table group. Repositories own reads and master-data
//! edits; anything that moves stock or money is done by
//! [`Ledger`](crate::ledger::Ledger), which reuses the crate-private
//! helpers below inside its own transaction.
//!
//! ## Layout
//! ```text
//! product    products (+ opening stock, stock adjustment)
//! category   categories
//! supplier   suppliers, supplier dues
//! customer   customers, customer dues, counter lookup by phone
//! purchase   purchases + purchase_items (read side)
//! sale       sales + sale_items (read side)
//! stock      stock_history (append-only)
//! shop       shop_info singleton, invoice counter
//! ```

pub mod category;
pub mod customer;
pub mod product;
pub mod purchase;
pub mod sale;
pub mod shop;
pub mod stock;
pub mod supplier;

/// Builds a `LIKE` pattern for a case-insensitive substring match.
///
/// `%`, `_` and `\` in the user's text are escaped; queries using it
/// must say `ESCAPE '\'`.
pub(crate) fn like_pattern(query: &str) -> String {
    let mut pattern = String::with_capacity(query.len() + 2);
    pattern.push('%');
    for c in query.trim().chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern(" pipe "), "%pipe%");
        assert_eq!(like_pattern("50%"), "%50\\%%");
        assert_eq!(like_pattern("a_b"), "%a\\_b%");
    }
}
