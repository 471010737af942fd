//! # Search
//!
//! The global search box: one query run against products, customers,
//! suppliers and sales. Matching is a case-insensitive substring match;
//! a blank query lists everything (products capped at the limit).

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::debug;

use anvil_core::validation::validate_search_query;
use anvil_core::{Customer, Product, Sale, Supplier};

use crate::changes::ChangeFeed;
use crate::error::DbResult;
use crate::repository::customer::CustomerRepository;
use crate::repository::product::ProductRepository;
use crate::repository::sale::SaleRepository;
use crate::repository::supplier::SupplierRepository;

/// Default number of products returned by a search.
pub const DEFAULT_PRODUCT_LIMIT: u32 = 50;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    pub query: String,
    pub products: Vec<Product>,
    pub customers: Vec<Customer>,
    pub suppliers: Vec<Supplier>,
    pub sales: Vec<Sale>,
}

impl SearchResults {
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
            && self.customers.is_empty()
            && self.suppliers.is_empty()
            && self.sales.is_empty()
    }

    pub fn len(&self) -> usize {
        self.products.len() + self.customers.len() + self.suppliers.len() + self.sales.len()
    }
}

#[derive(Debug, Clone)]
pub struct SearchRepository {
    products: ProductRepository,
    customers: CustomerRepository,
    suppliers: SupplierRepository,
    sales: SaleRepository,
}

impl SearchRepository {
    pub fn new(pool: SqlitePool, changes: ChangeFeed) -> Self {
        SearchRepository {
            products: ProductRepository::new(pool.clone(), changes.clone()),
            customers: CustomerRepository::new(pool.clone(), changes.clone()),
            suppliers: SupplierRepository::new(pool.clone(), changes),
            sales: SaleRepository::new(pool),
        }
    }

    /// Runs `query` against every searchable table.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let hits = db.search().all("ravi").await?;
    /// println!("{} customers, {} sales", hits.customers.len(), hits.sales.len());
    /// ```
    pub async fn all(&self, query: &str) -> DbResult<SearchResults> {
        let query = validate_search_query(query)?;
        debug!(query = %query, "Global search");

        Ok(SearchResults {
            products: self.products.search(&query, DEFAULT_PRODUCT_LIMIT).await?,
            customers: self.customers.search(&query).await?,
            suppliers: self.suppliers.search(&query).await?,
            sales: self.sales.search(&query).await?,
            query,
        })
    }

    pub async fn products(&self, query: &str) -> DbResult<Vec<Product>> {
        self.products.search(query, DEFAULT_PRODUCT_LIMIT).await
    }

    pub async fn customers(&self, query: &str) -> DbResult<Vec<Customer>> {
        self.customers.search(query).await
    }

    pub async fn suppliers(&self, query: &str) -> DbResult<Vec<Supplier>> {
        self.suppliers.search(query).await
    }

    pub async fn sales(&self, query: &str) -> DbResult<Vec<Sale>> {
        self.sales.search(query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use anvil_core::{Money, NewCustomer, NewProduct, NewSupplier};

    async fn seeded() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.products()
            .create(
                &NewProduct::new("CPVC Pipe", Money::from_rupees(180), Money::from_rupees(230))
                    .with_brand("Astral")
                    .with_size("1 inch"),
            )
            .await
            .unwrap();
        db.products()
            .create(&NewProduct::new("Enamel Paint", Money::from_rupees(400), Money::from_rupees(520)).with_brand("Asian Paints"))
            .await
            .unwrap();
        db.customers()
            .create(&NewCustomer {
                name: "Asha Patil".to_string(),
                phone: "9822001100".to_string(),
            })
            .await
            .unwrap();
        db.suppliers()
            .create(&NewSupplier {
                name: "Astral Distributors".to_string(),
                ..NewSupplier::default()
            })
            .await
            .unwrap();
        db
    }

    #[tokio::test]
    async fn test_search_spans_tables() {
        let db = seeded().await;
        let hits = db.search().all("ast").await.unwrap();

        assert_eq!(hits.query, "ast");
        assert_eq!(hits.products.len(), 1);
        assert_eq!(hits.products[0].name, "CPVC Pipe");
        assert_eq!(hits.suppliers.len(), 1);
        assert!(hits.customers.is_empty());
        assert_eq!(hits.len(), 2);
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive() {
        let db = seeded().await;
        let hits = db.search().all("  ASHA ").await.unwrap();
        assert_eq!(hits.customers.len(), 1);
        assert_eq!(hits.customers[0].phone, "9822001100");
    }

    #[tokio::test]
    async fn test_blank_query_lists_everything() {
        let db = seeded().await;
        let hits = db.search().all("").await.unwrap();
        assert_eq!(hits.products.len(), 2);
        assert_eq!(hits.customers.len(), 1);
        assert_eq!(hits.suppliers.len(), 1);
        assert!(hits.sales.is_empty());
    }

    #[tokio::test]
    async fn test_wildcards_are_literal() {
        let db = seeded().await;
        assert!(db.search().all("%").await.unwrap().is_empty());
    }
}
