//! Savepoint-based nested transactions: most drivers don't support true
//! nested transactions, so a "nested" transaction is really the outer
//! one plus a named savepoint that commit/rollback resolves to
//! release/rollback-to.

use std::sync::atomic::{AtomicUsize, Ordering};

use common::err::GatewayError;
use tracing::warn;

use crate::driver::Transaction;

/// One level of savepoint nesting. Must be resolved with `commit` or
/// `rollback` — dropping it unresolved leaves the savepoint open on the
/// connection and is logged as a bug.
pub struct SavepointScope<'a> {
    txn: &'a dyn Transaction,
    name: String,
    resolved: bool,
}

impl<'a> SavepointScope<'a> {
    pub async fn open(txn: &'a dyn Transaction, depth: &AtomicUsize) -> Result<Self, GatewayError> {
        let n = depth.fetch_add(1, Ordering::SeqCst);
        let name = format!("sp_{n}");
        txn.savepoint(&name).await?;
        Ok(SavepointScope { txn, name, resolved: false })
    }

    pub async fn commit(mut self) -> Result<(), GatewayError> {
        self.txn.release_savepoint(&self.name).await?;
        self.resolved = true;
        Ok(())
    }

    pub async fn rollback(mut self) -> Result<(), GatewayError> {
        self.txn.rollback_to_savepoint(&self.name).await?;
        self.resolved = true;
        Ok(())
    }
}

impl<'a> Drop for SavepointScope<'a> {
    fn drop(&mut self) {
        if !self.resolved {
            warn!(savepoint = %self.name, "savepoint scope dropped without commit or rollback");
        }
    }
}

/// Tracks how many savepoint levels a logical transaction has opened,
/// so nested calls get distinct, collision-free names.
#[derive(Default)]
pub struct NestingDepth(AtomicUsize);

impl NestingDepth {
    pub fn new() -> Self {
        NestingDepth(AtomicUsize::new(0))
    }

    pub fn counter(&self) -> &AtomicUsize {
        &self.0
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::record::{Record, Value};
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingTxn {
        log: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Transaction for RecordingTxn {
        async fn execute(&self, _sql: &str, _args: &[Value]) -> Result<u64, GatewayError> {
            Ok(0)
        }
        async fn query(&self, _sql: &str, _args: &[Value]) -> Result<Vec<Record>, GatewayError> {
            Ok(vec![])
        }
        async fn savepoint(&self, name: &str) -> Result<(), GatewayError> {
            self.log.lock().unwrap().push(format!("SAVEPOINT {name}"));
            Ok(())
        }
        async fn release_savepoint(&self, name: &str) -> Result<(), GatewayError> {
            self.log.lock().unwrap().push(format!("RELEASE {name}"));
            Ok(())
        }
        async fn rollback_to_savepoint(&self, name: &str) -> Result<(), GatewayError> {
            self.log.lock().unwrap().push(format!("ROLLBACK TO {name}"));
            Ok(())
        }
        async fn commit(self: Box<Self>) -> Result<(), GatewayError> {
            Ok(())
        }
        async fn rollback(self: Box<Self>) -> Result<(), GatewayError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn nested_savepoints_get_distinct_names() {
        let txn = RecordingTxn::default();
        let depth = NestingDepth::new();

        let sp1 = SavepointScope::open(&txn, depth.counter()).await.unwrap();
        let sp2 = SavepointScope::open(&txn, depth.counter()).await.unwrap();
        sp2.commit().await.unwrap();
        sp1.rollback().await.unwrap();

        let log = txn.log.lock().unwrap().clone();
        assert_eq!(
            log,
            vec!["SAVEPOINT sp_0", "SAVEPOINT sp_1", "RELEASE sp_1", "ROLLBACK TO sp_0"]
        );
    }
}
