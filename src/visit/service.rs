use crate::storage::{sqlite, SqliteStore, StoreResult, VisitorCount};
use tracing::debug;

/// Key of the singleton counter row
pub const COUNTER_ID: i64 = 1;

/// Reads and bumps the global unique-visitor count
#[derive(Clone)]
pub struct VisitService {
    store: SqliteStore,
}

impl VisitService {
    pub fn new(store: SqliteStore) -> Self {
        Self { store }
    }

    /// Add one to the counter and return the new value.
    ///
    /// The read, increment and write share one transaction, so concurrent
    /// first visits are each counted.
    pub async fn increment_and_get_count(&self) -> StoreResult<i64> {
        let mut tx = self.store.begin().await?;

        let mut counter = sqlite::find_by_id(&mut *tx, COUNTER_ID)
            .await?
            .unwrap_or_else(|| VisitorCount::new(COUNTER_ID));

        counter.count += 1;
        sqlite::save(&mut *tx, &counter).await?;

        tx.commit().await?;

        debug!(count = counter.count, "Visitor counter incremented");
        Ok(counter.count)
    }

    /// Current count without touching it; 0 before the first visit
    pub async fn get_current_count(&self) -> StoreResult<i64> {
        Ok(self
            .store
            .get(COUNTER_ID)
            .await?
            .map(|counter| counter.count)
            .unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn service() -> VisitService {
        VisitService::new(SqliteStore::in_memory().await.unwrap())
    }

    #[tokio::test]
    async fn empty_store_reads_zero() {
        let service = service().await;
        assert_eq!(service.get_current_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn first_increment_creates_row_with_one() {
        let service = service().await;

        assert_eq!(service.increment_and_get_count().await.unwrap(), 1);
        assert_eq!(service.get_current_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn reads_do_not_mutate() {
        let service = service().await;
        service.increment_and_get_count().await.unwrap();

        for _ in 0..3 {
            assert_eq!(service.get_current_count().await.unwrap(), 1);
        }
    }

    #[tokio::test]
    async fn concurrent_increments_are_all_counted() {
        let service = service().await;

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let service = service.clone();
                tokio::spawn(async move { service.increment_and_get_count().await })
            })
            .collect();

        let mut seen = Vec::new();
        for handle in handles {
            seen.push(handle.await.unwrap().unwrap());
        }
        seen.sort_unstable();

        assert_eq!(seen, (1..=10).collect::<Vec<i64>>());
        assert_eq!(service.get_current_count().await.unwrap(), 10);
    }
}
