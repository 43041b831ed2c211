use super::{MemoryFaults, MemoryStats, MemoryTransaction};
use crate::client::{GraphSessionProvider, GraphTransaction};
use crate::errors::{ErrorKind, PersistError, PersistResult};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

/// In-memory session.
///
/// Holds the last transaction it began. Closing rolls back a transaction that
/// is still open and is idempotent.
pub struct MemorySession {
    id: String,
    active: AtomicBool,
    transaction: Mutex<Option<GraphTransaction>>,
    stats: MemoryStats,
    faults: MemoryFaults,
}

impl MemorySession {
    pub(crate) fn new(stats: MemoryStats, faults: MemoryFaults) -> Self {
        stats.record_session_opened();
        MemorySession {
            id: Uuid::new_v4().to_string(),
            active: AtomicBool::new(true),
            transaction: Mutex::new(None),
            stats,
            faults,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    fn check_active(&self) -> PersistResult<()> {
        if !self.is_active() {
            return Err(PersistError::new("Session is closed", ErrorKind::SessionError));
        }
        Ok(())
    }
}

impl GraphSessionProvider for MemorySession {
    fn id(&self) -> &str {
        &self.id
    }

    fn transaction(&self) -> Option<GraphTransaction> {
        self.transaction.lock().clone()
    }

    fn begin_transaction(&self) -> PersistResult<GraphTransaction> {
        self.check_active()?;

        let mut current = self.transaction.lock();
        if let Some(txn) = current.as_ref() {
            if txn.status().is_active() {
                log::error!("Session {} already has an open transaction", self.id);
                return Err(PersistError::new(
                    "Session already has an open transaction",
                    ErrorKind::TransactionError,
                ));
            }
        }

        if self.faults.fail_begin_transaction() {
            return Err(PersistError::new(
                "Server refused to begin a transaction",
                ErrorKind::TransactionError,
            ));
        }

        let txn = GraphTransaction::new(MemoryTransaction::new(
            self.stats.clone(),
            self.faults.clone(),
        ));
        *current = Some(txn.clone());
        Ok(txn)
    }

    fn close(&self) -> PersistResult<()> {
        if self
            .active
            .compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            // already closed
            return Ok(());
        }

        let rolled_back = match self.transaction.lock().take() {
            Some(txn) if txn.status().is_active() => txn.rollback(),
            _ => Ok(()),
        };

        self.stats.record_session_closed();
        rolled_back?;
        if self.faults.fail_close_session() {
            return Err(PersistError::new(
                "Connection reset while closing session",
                ErrorKind::SessionError,
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::TransactionStatus;

    fn session() -> (MemorySession, MemoryStats, MemoryFaults) {
        let stats = MemoryStats::new();
        let faults = MemoryFaults::new();
        (MemorySession::new(stats.clone(), faults.clone()), stats, faults)
    }

    #[test]
    fn test_new_session_has_no_transaction() {
        let (session, stats, _) = session();
        assert!(session.transaction().is_none());
        assert!(session.is_active());
        assert!(!session.id().is_empty());
        assert_eq!(stats.sessions_opened(), 1);
    }

    #[test]
    fn test_begin_transaction_is_visible() {
        let (session, _, _) = session();
        let txn = session.begin_transaction().unwrap();
        let current = session.transaction().unwrap();
        assert!(txn.same_as(&current));
        assert_eq!(current.status(), TransactionStatus::Open);
    }

    #[test]
    fn test_begin_while_open_fails() {
        let (session, _, _) = session();
        let _txn = session.begin_transaction().unwrap();
        let err = session.begin_transaction().unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::TransactionError);
    }

    #[test]
    fn test_begin_after_commit_starts_fresh() {
        let (session, stats, _) = session();
        let first = session.begin_transaction().unwrap();
        first.commit().unwrap();
        let second = session.begin_transaction().unwrap();
        assert!(!first.same_as(&second));
        assert_eq!(stats.transactions_begun(), 2);
    }

    #[test]
    fn test_close_rolls_back_open_transaction() {
        let (session, stats, _) = session();
        let txn = session.begin_transaction().unwrap();
        session.close().unwrap();
        assert_eq!(txn.status(), TransactionStatus::RolledBack);
        assert_eq!(stats.rollbacks(), 1);
        assert_eq!(stats.sessions_closed(), 1);
    }

    #[test]
    fn test_close_is_idempotent() {
        let (session, stats, _) = session();
        session.close().unwrap();
        session.close().unwrap();
        assert_eq!(stats.sessions_closed(), 1);
        assert!(!session.is_active());
    }

    #[test]
    fn test_begin_on_closed_session_fails() {
        let (session, _, _) = session();
        session.close().unwrap();
        let err = session.begin_transaction().unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::SessionError);
    }

    #[test]
    fn test_unique_ids() {
        let (first, _, _) = session();
        let (second, _, _) = session();
        assert_ne!(first.id(), second.id());
    }
}
