//! # Change Feed and Live Queries
//!
//! Screens in the shop show numbers that must follow the books: the
//! dashboard, the low-stock list, a customer's due. Instead of polling,
//! every committed write publishes the tables it touched and live queries
//! re-run when one of theirs is in the set.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Ledger::record_sale ──► COMMIT ──► ChangeFeed::publish([Sales, ...])   │
//! │                                          │ (broadcast)                  │
//! │                     ┌────────────────────┼────────────────────┐         │
//! │                     ▼                    ▼                    ▼         │
//! │              LiveQuery<Dashboard>  LiveQuery<low stock>  (not watching  │
//! │              re-runs query         re-runs query          Sales: skip)  │
//! │                     │                    │                              │
//! │                     ▼                    ▼                              │
//! │               watch::Receiver      watch::Receiver  ◄── UI awaits       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing is published for a rolled-back transaction, so a live query
//! never shows a half-written sale.

use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{DbError, DbResult};
use crate::pool::Database;

/// Pending notifications a slow subscriber may fall behind by before it
/// is told it lagged.
const FEED_CAPACITY: usize = 256;

// =============================================================================
// Tables
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Categories,
    Products,
    Suppliers,
    Customers,
    Purchases,
    PurchaseItems,
    Sales,
    SaleItems,
    StockHistory,
    ShopInfo,
}

/// One committed write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub tables: Vec<Table>,
}

impl Change {
    pub fn touches(&self, watched: &[Table]) -> bool {
        self.tables.iter().any(|t| watched.contains(t))
    }
}

// =============================================================================
// Change Feed
// =============================================================================

#[derive(Debug, Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<Change>,
}

impl ChangeFeed {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(FEED_CAPACITY);
        ChangeFeed { sender }
    }

    /// Announces a committed write. Call only after COMMIT succeeded.
    pub fn publish(&self, tables: &[Table]) {
        // No subscribers is the normal case for the CLI
        let receivers = self
            .sender
            .send(Change {
                tables: tables.to_vec(),
            })
            .unwrap_or(0);
        debug!(?tables, receivers, "Change published");
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Change> {
        self.sender.subscribe()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Live Query
// =============================================================================

/// The latest result of a watched query.
///
/// Dropping it stops the refresh task.
#[derive(Debug)]
pub struct LiveQuery<T> {
    receiver: watch::Receiver<Arc<T>>,
    task: JoinHandle<()>,
}

impl<T> LiveQuery<T> {
    /// The most recent result.
    pub fn current(&self) -> Arc<T> {
        Arc::clone(&self.receiver.borrow())
    }

    /// Waits for the next refresh and returns it.
    pub async fn changed(&mut self) -> DbResult<Arc<T>> {
        self.receiver
            .changed()
            .await
            .map_err(|_| DbError::Internal("live query stopped".to_string()))?;
        Ok(Arc::clone(&self.receiver.borrow_and_update()))
    }
}

impl<T> Drop for LiveQuery<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Starts a live query.
///
/// The feed is subscribed before the first run so a write that lands
/// between the first run and the subscription is not missed.
pub(crate) async fn live<T, F, Fut>(
    db: Database,
    tables: &'static [Table],
    query: F,
) -> DbResult<LiveQuery<T>>
where
    T: Send + Sync + 'static,
    F: Fn(Database) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = DbResult<T>> + Send + 'static,
{
    let mut feed = db.changes().subscribe();
    let initial = query(db.clone()).await?;
    let (sender, receiver) = watch::channel(Arc::new(initial));

    let task = tokio::spawn(async move {
        loop {
            match feed.recv().await {
                Ok(change) if !change.touches(tables) => continue,
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "Live query lagged, refreshing");
                }
                Err(RecvError::Closed) => break,
            }

            match query(db.clone()).await {
                Ok(value) => {
                    if sender.send(Arc::new(value)).is_err() {
                        break;
                    }
                }
                Err(e) => warn!(error = %e, ?tables, "Live query refresh failed"),
            }
        }
    });

    Ok(LiveQuery { receiver, task })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_touches() {
        let change = Change {
            tables: vec![Table::Sales, Table::Products],
        };
        assert!(change.touches(&[Table::Products]));
        assert!(!change.touches(&[Table::Suppliers, Table::Purchases]));
    }

    #[tokio::test]
    async fn test_publish_reaches_subscriber() {
        let feed = ChangeFeed::new();
        let mut rx = feed.subscribe();
        feed.publish(&[Table::Customers]);

        let change = rx.recv().await.unwrap();
        assert_eq!(change.tables, vec![Table::Customers]);
    }

    #[test]
    fn test_publish_without_subscribers() {
        ChangeFeed::new().publish(&[Table::ShopInfo]);
    }
}
