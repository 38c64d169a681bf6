// One read/write lock per stage.
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::trace;

use crate::logic::competition::Stage;

// Writers (builder, resolver, repairs) take a stage exclusively, the checker and readers share it.
#[derive(Debug, Default)]
pub struct StageLocks {
    locks: [RwLock<()>; Stage::ALL.len()],
}

impl StageLocks {
    pub async fn read(&self, stage: Stage) -> RwLockReadGuard<'_, ()> {
        trace!(%stage, "waiting for read lock");
        self.locks[stage.index()].read().await
    }

    pub async fn write(&self, stage: Stage) -> RwLockWriteGuard<'_, ()> {
        trace!(%stage, "waiting for write lock");
        self.locks[stage.index()].write().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stages_lock_independently() {
        let locks = StageLocks::default();
        let _group = locks.write(Stage::GroupStage).await;
        assert!(locks.locks[Stage::RoundOf16.index()].try_write().is_ok());
        assert!(locks.locks[Stage::GroupStage.index()].try_read().is_err());
    }

    #[tokio::test]
    async fn readers_share_a_stage() {
        let locks = StageLocks::default();
        let _a = locks.read(Stage::Final).await;
        let _b = locks.read(Stage::Final).await;
        assert!(locks.locks[Stage::Final.index()].try_write().is_err());
    }
}
