//! # Category Repository
//!
//! Category names are unique regardless of case. Deleting a category
//! leaves its products uncategorised.

use sqlx::SqlitePool;
use tracing::info;

use anvil_core::validation::validate_party_name;
use anvil_core::Category;

use crate::changes::{ChangeFeed, Table};
use crate::error::{DbError, DbResult};

#[derive(Debug, Clone)]
pub struct CategoryRepository {
    pool: SqlitePool,
    changes: ChangeFeed,
}

impl CategoryRepository {
    pub fn new(pool: SqlitePool, changes: ChangeFeed) -> Self {
        CategoryRepository { pool, changes }
    }

    pub async fn list(&self) -> DbResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT * FROM categories ORDER BY name COLLATE NOCASE",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(categories)
    }

    pub async fn get(&self, id: i64) -> DbResult<Category> {
        sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Category", id))
    }

    /// Case-insensitive lookup by name.
    pub async fn by_name(&self, name: &str) -> DbResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE name = ?1")
            .bind(name.trim())
            .fetch_optional(&self.pool)
            .await?;
        Ok(category)
    }

    /// Creates a category.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - A category with that name exists
    pub async fn create(&self, name: &str) -> DbResult<Category> {
        validate_party_name(name)?;
        let name = name.trim();

        let id = sqlx::query("INSERT INTO categories (name) VALUES (?1)")
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(|e| match DbError::from(e) {
                DbError::UniqueViolation { .. } => DbError::duplicate("category", name),
                other => other,
            })?
            .last_insert_rowid();

        info!(category_id = id, name = %name, "Category created");
        self.changes.publish(&[Table::Categories]);
        Ok(Category {
            id,
            name: name.to_string(),
        })
    }

    pub async fn rename(&self, id: i64, name: &str) -> DbResult<Category> {
        validate_party_name(name)?;
        let name = name.trim();

        let result = sqlx::query("UPDATE categories SET name = ?1 WHERE id = ?2")
            .bind(name)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| match DbError::from(e) {
                DbError::UniqueViolation { .. } => DbError::duplicate("category", name),
                other => other,
            })?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Category", id));
        }

        self.changes.publish(&[Table::Categories]);
        Ok(Category {
            id,
            name: name.to_string(),
        })
    }

    pub async fn delete(&self, id: i64) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM categories WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Category", id));
        }

        info!(category_id = id, "Category deleted");
        self.changes.publish(&[Table::Categories, Table::Products]);
        Ok(())
    }
}
