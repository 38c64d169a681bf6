use std::{future::Future, sync::Arc, time::Duration};

use tracing::warn;

use crate::logic::{competition::ranking::PointsRules, config::Config, error::{Error, Result}, lock::StageLocks, types::Db};

// For keeping track of stuff. Every component gets a clone of this when it is built.
#[derive(Debug, Clone)]
pub struct AppData {
    pub db: Db,
    pub locks: Arc<StageLocks>,
    pub timeout: Duration,
    pub points: PointsRules,
}

impl AppData {
    // Build the thing.
    pub fn build(db: Db, config: &Config) -> Self {
        Self {
            db,
            locks: Arc::new(StageLocks::default()),
            timeout: Duration::from_secs(config.timeout_secs),
            points: config.points,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    // Run an operation under the deadline.
    // On expiry the future is dropped, which rolls back any transaction it had open.
    pub async fn within<T, F>(&self, operation: &str, future: F) -> Result<T>
    where F: Future<Output = Result<T>> {
        match tokio::time::timeout(self.timeout, future).await {
            Ok(result) => result,
            Err(_) => {
                warn!(operation, timeout = ?self.timeout, "deadline expired, operation cancelled");
                Err(Error::Timeout(operation.to_string()))
            },
        }
    }
}
