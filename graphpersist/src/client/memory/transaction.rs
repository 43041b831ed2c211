use super::{MemoryFaults, MemoryStats};
use crate::client::{GraphTransactionProvider, TransactionStatus};
use crate::errors::{ErrorKind, PersistError, PersistResult};
use parking_lot::Mutex;

/// In-memory transaction. Starts `Open`.
pub struct MemoryTransaction {
    status: Mutex<TransactionStatus>,
    stats: MemoryStats,
    faults: MemoryFaults,
}

impl MemoryTransaction {
    pub(crate) fn new(stats: MemoryStats, faults: MemoryFaults) -> Self {
        stats.record_transaction();
        MemoryTransaction {
            status: Mutex::new(TransactionStatus::Open),
            stats,
            faults,
        }
    }
}

impl GraphTransactionProvider for MemoryTransaction {
    fn status(&self) -> TransactionStatus {
        *self.status.lock()
    }

    fn commit(&self) -> PersistResult<()> {
        let mut status = self.status.lock();
        if !status.is_active() {
            log::error!("Cannot commit a transaction in state {}", *status);
            return Err(PersistError::new(
                &format!("Transaction is not active: {}", *status),
                ErrorKind::TransactionError,
            ));
        }

        if self.faults.fail_commit() {
            *status = TransactionStatus::Closed;
            return Err(PersistError::new(
                "Commit rejected by server",
                ErrorKind::TransactionError,
            ));
        }

        *status = TransactionStatus::Committed;
        self.stats.record_commit();
        Ok(())
    }

    fn rollback(&self) -> PersistResult<()> {
        let mut status = self.status.lock();
        if status.is_finished() {
            return Ok(());
        }

        if self.faults.fail_rollback() {
            return Err(PersistError::new(
                "Rollback rejected by server",
                ErrorKind::TransactionError,
            ));
        }

        *status = TransactionStatus::RolledBack;
        self.stats.record_rollback();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transaction() -> (MemoryTransaction, MemoryStats, MemoryFaults) {
        let stats = MemoryStats::new();
        let faults = MemoryFaults::new();
        (MemoryTransaction::new(stats.clone(), faults.clone()), stats, faults)
    }

    #[test]
    fn test_new_transaction_is_open() {
        let (txn, stats, _) = transaction();
        assert_eq!(txn.status(), TransactionStatus::Open);
        assert_eq!(stats.transactions_begun(), 1);
    }

    #[test]
    fn test_commit() {
        let (txn, stats, _) = transaction();
        txn.commit().unwrap();
        assert_eq!(txn.status(), TransactionStatus::Committed);
        assert_eq!(stats.commits(), 1);
    }

    #[test]
    fn test_commit_twice_fails() {
        let (txn, stats, _) = transaction();
        txn.commit().unwrap();
        let err = txn.commit().unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::TransactionError);
        assert_eq!(stats.commits(), 1);
    }

    #[test]
    fn test_rollback_then_rollback_is_noop() {
        let (txn, stats, _) = transaction();
        txn.rollback().unwrap();
        txn.rollback().unwrap();
        assert_eq!(txn.status(), TransactionStatus::RolledBack);
        assert_eq!(stats.rollbacks(), 1);
    }

    #[test]
    fn test_commit_after_rollback_fails() {
        let (txn, _, _) = transaction();
        txn.rollback().unwrap();
        assert!(txn.commit().is_err());
    }

    #[test]
    fn test_failed_commit_closes() {
        let (txn, stats, faults) = transaction();
        faults.set_fail_commit(true);
        assert!(txn.commit().is_err());
        assert_eq!(txn.status(), TransactionStatus::Closed);
        assert_eq!(stats.commits(), 0);
    }

    #[test]
    fn test_failed_rollback_stays_open() {
        let (txn, stats, faults) = transaction();
        faults.set_fail_rollback(true);
        assert!(txn.rollback().is_err());
        assert_eq!(txn.status(), TransactionStatus::Open);
        assert_eq!(stats.rollbacks(), 0);
    }
}
