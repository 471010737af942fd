//! # Customer Repository
//!
//! Customer records, the running amount each one owes, and the counter
//! lookup that turns a typed name and phone into a customer id.
//!
//! ## Counter Lookup
//! ```text
//! name blank ───────────────► walk-in, no customer row
//! name given
//!   ├── phone given, match ─► reuse that customer
//!   └── otherwise ──────────► insert a new customer
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use anvil_core::ledger::CustomerRef;
use anvil_core::validation::{validate_new_customer, validate_search_query};
use anvil_core::{BalancePolicy, Customer, Money, NewCustomer};

use crate::changes::{ChangeFeed, Table};
use crate::error::{DbError, DbResult};
use crate::repository::like_pattern;

/// Resolves the customer for a sale on the caller's transaction.
///
/// Returns the id and whether a new row was inserted.
pub(crate) async fn resolve(
    conn: &mut SqliteConnection,
    customer: &CustomerRef,
    now: DateTime<Utc>,
) -> DbResult<Option<(i64, bool)>> {
    if !customer.is_named() {
        return Ok(None);
    }

    let name = customer.name.trim();
    let phone = customer.phone.trim();

    if !phone.is_empty() {
        let existing: Option<i64> =
            sqlx::query_scalar("SELECT id FROM customers WHERE phone = ?1 ORDER BY id LIMIT 1")
                .bind(phone)
                .fetch_optional(&mut *conn)
                .await?;
        if let Some(id) = existing {
            debug!(customer_id = id, "Customer matched by phone");
            return Ok(Some((id, false)));
        }
    }

    validate_new_customer(&NewCustomer {
        name: name.to_string(),
        phone: phone.to_string(),
    })?;

    let id = sqlx::query(
        "INSERT INTO customers (name, phone, total_due_paise, created_at) VALUES (?1, ?2, 0, ?3)",
    )
    .bind(name)
    .bind(phone)
    .bind(now)
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();

    debug!(customer_id = id, "Customer created at the counter");
    Ok(Some((id, true)))
}

/// Adds `amount` to a customer's due.
pub(crate) async fn add_due(conn: &mut SqliteConnection, id: i64, amount: Money) -> DbResult<()> {
    let result = sqlx::query("UPDATE customers SET total_due_paise = total_due_paise + ?1 WHERE id = ?2")
        .bind(amount.paise())
        .bind(id)
        .execute(&mut *conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Customer", id));
    }
    Ok(())
}

/// Takes a payment off a customer's due under `policy`. A customer deleted
/// since the sale is skipped.
pub(crate) async fn settle_due(
    conn: &mut SqliteConnection,
    id: i64,
    amount: Money,
    policy: BalancePolicy,
) -> DbResult<Option<Money>> {
    let due: Option<i64> = sqlx::query_scalar("SELECT total_due_paise FROM customers WHERE id = ?1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    let Some(due) = due else {
        return Ok(None);
    };

    let new_due = policy.settle_due(Money::from_paise(due), amount);
    sqlx::query("UPDATE customers SET total_due_paise = ?1 WHERE id = ?2")
        .bind(new_due.paise())
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(Some(new_due))
}

#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
    changes: ChangeFeed,
}

impl CustomerRepository {
    pub fn new(pool: SqlitePool, changes: ChangeFeed) -> Self {
        CustomerRepository { pool, changes }
    }

    pub async fn list(&self) -> DbResult<Vec<Customer>> {
        let customers = sqlx::query_as::<_, Customer>("SELECT * FROM customers ORDER BY name, id")
            .fetch_all(&self.pool)
            .await?;
        Ok(customers)
    }

    pub async fn get(&self, id: i64) -> DbResult<Customer> {
        sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Customer", id))
    }

    /// First customer with this exact phone number.
    pub async fn by_phone(&self, phone: &str) -> DbResult<Option<Customer>> {
        let phone = phone.trim();
        if phone.is_empty() {
            return Ok(None);
        }
        let customer = sqlx::query_as::<_, Customer>(
            "SELECT * FROM customers WHERE phone = ?1 ORDER BY id LIMIT 1",
        )
        .bind(phone)
        .fetch_optional(&self.pool)
        .await?;
        Ok(customer)
    }

    /// Substring search over name and phone. Blank returns everyone.
    pub async fn search(&self, query: &str) -> DbResult<Vec<Customer>> {
        let query = validate_search_query(query)?;
        if query.is_empty() {
            return self.list().await;
        }

        let customers = sqlx::query_as::<_, Customer>(
            r#"
            SELECT * FROM customers
            WHERE name LIKE ?1 ESCAPE '\' OR phone LIKE ?1 ESCAPE '\'
            ORDER BY name, id
            "#,
        )
        .bind(like_pattern(&query))
        .fetch_all(&self.pool)
        .await?;
        Ok(customers)
    }

    /// Customers who owe the shop, largest due first.
    pub async fn with_dues(&self) -> DbResult<Vec<Customer>> {
        let customers = sqlx::query_as::<_, Customer>(
            "SELECT * FROM customers WHERE total_due_paise > 0 ORDER BY total_due_paise DESC, name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(customers)
    }

    pub async fn total_due(&self) -> DbResult<Money> {
        let paise: i64 = sqlx::query_scalar("SELECT COALESCE(SUM(total_due_paise), 0) FROM customers")
            .fetch_one(&self.pool)
            .await?;
        Ok(Money::from_paise(paise))
    }

    pub async fn create(&self, new: &NewCustomer) -> DbResult<Customer> {
        validate_new_customer(new)?;

        let id = sqlx::query(
            "INSERT INTO customers (name, phone, total_due_paise, created_at) VALUES (?1, ?2, 0, ?3)",
        )
        .bind(new.name.trim())
        .bind(new.phone.trim())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        info!(customer_id = id, "Customer created");
        self.changes.publish(&[Table::Customers]);
        self.get(id).await
    }

    /// Updates name and phone. Past sales keep the details they were
    /// recorded with.
    pub async fn update(&self, id: i64, changes: &NewCustomer) -> DbResult<Customer> {
        validate_new_customer(changes)?;

        let result = sqlx::query("UPDATE customers SET name = ?1, phone = ?2 WHERE id = ?3")
            .bind(changes.name.trim())
            .bind(changes.phone.trim())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", id));
        }

        self.changes.publish(&[Table::Customers]);
        self.get(id).await
    }

    pub async fn delete(&self, id: i64) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM customers WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", id));
        }

        info!(customer_id = id, "Customer deleted");
        self.changes.publish(&[Table::Customers, Table::Sales]);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn test_resolve_matches_by_phone() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let existing = db
            .customers()
            .create(&NewCustomer {
                name: "Ravi Kumar".to_string(),
                phone: "9999999999".to_string(),
            })
            .await
            .unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        let typed = CustomerRef::new("Ravi K", "9999999999");
        let resolved = resolve(&mut conn, &typed, Utc::now()).await.unwrap();
        assert_eq!(resolved, Some((existing.id, false)));
    }

    #[tokio::test]
    async fn test_resolve_creates_without_phone() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();

        let first = resolve(&mut conn, &CustomerRef::new("Anil", ""), Utc::now())
            .await
            .unwrap();
        let second = resolve(&mut conn, &CustomerRef::new("Anil", ""), Utc::now())
            .await
            .unwrap();
        assert!(matches!(first, Some((_, true))));
        assert!(matches!(second, Some((_, true))));
        assert_ne!(first, second);

        let walk_in = resolve(&mut conn, &CustomerRef::default(), Utc::now())
            .await
            .unwrap();
        assert_eq!(walk_in, None);
    }

    #[tokio::test]
    async fn test_settle_due_policies() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let c = db
            .customers()
            .create(&NewCustomer {
                name: "Meena".to_string(),
                phone: String::new(),
            })
            .await
            .unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        add_due(&mut conn, c.id, Money::from_rupees(100)).await.unwrap();

        let clamped = settle_due(&mut conn, c.id, Money::from_rupees(150), BalancePolicy::ClampAtZero)
            .await
            .unwrap();
        assert_eq!(clamped, Some(Money::zero()));

        let negative = settle_due(&mut conn, c.id, Money::from_rupees(30), BalancePolicy::AllowNegative)
            .await
            .unwrap();
        assert_eq!(negative, Some(Money::from_rupees(-30)));

        let gone = settle_due(&mut conn, 999, Money::from_rupees(1), BalancePolicy::AllowNegative)
            .await
            .unwrap();
        assert_eq!(gone, None);
    }
}
