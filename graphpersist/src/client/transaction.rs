use crate::errors::PersistResult;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::sync::Arc;

/// Status of a client transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionStatus {
    /// Begun but not yet used
    Pending,
    /// Accepting work
    Open,
    /// Successfully committed
    Committed,
    /// Rolled back
    RolledBack,
    /// Resources released without a commit or rollback outcome
    Closed,
}

impl TransactionStatus {
    /// Whether a nested transactional call should join this transaction.
    pub fn is_active(&self) -> bool {
        matches!(self, TransactionStatus::Pending | TransactionStatus::Open)
    }

    /// Whether the transaction reached a final state.
    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            TransactionStatus::Committed | TransactionStatus::RolledBack | TransactionStatus::Closed
        )
    }
}

impl Display for TransactionStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionStatus::Pending => write!(f, "PENDING"),
            TransactionStatus::Open => write!(f, "OPEN"),
            TransactionStatus::Committed => write!(f, "COMMITTED"),
            TransactionStatus::RolledBack => write!(f, "ROLLEDBACK"),
            TransactionStatus::Closed => write!(f, "CLOSED"),
        }
    }
}

/// Contract for a transaction owned by a graph session.
///
/// # Thread Safety
/// Implementers must be `Send + Sync`; a transaction is still only driven by the
/// execution context that owns its session.
pub trait GraphTransactionProvider: Send + Sync {
    /// Current status of the transaction.
    fn status(&self) -> TransactionStatus;

    /// Commits the transaction.
    ///
    /// Fails if the transaction is not `Open` or `Pending`, or if the server
    /// rejects the commit.
    fn commit(&self) -> PersistResult<()>;

    /// Rolls back the transaction. Rolling back a finished transaction is a no-op.
    fn rollback(&self) -> PersistResult<()>;
}

/// Handle to a client transaction.
#[derive(Clone)]
pub struct GraphTransaction {
    inner: Arc<dyn GraphTransactionProvider>,
}

impl GraphTransaction {
    pub fn new<T: GraphTransactionProvider + 'static>(inner: T) -> Self {
        GraphTransaction {
            inner: Arc::new(inner),
        }
    }

    /// Whether both handles point at the same client transaction.
    pub fn same_as(&self, other: &GraphTransaction) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for GraphTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphTransaction")
            .field("status", &self.status())
            .finish()
    }
}

impl Deref for GraphTransaction {
    type Target = Arc<dyn GraphTransactionProvider>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct FixedTransaction(Mutex<TransactionStatus>);

    impl GraphTransactionProvider for FixedTransaction {
        fn status(&self) -> TransactionStatus {
            *self.0.lock()
        }

        fn commit(&self) -> PersistResult<()> {
            *self.0.lock() = TransactionStatus::Committed;
            Ok(())
        }

        fn rollback(&self) -> PersistResult<()> {
            *self.0.lock() = TransactionStatus::RolledBack;
            Ok(())
        }
    }

    #[test]
    fn test_active_statuses() {
        assert!(TransactionStatus::Open.is_active());
        assert!(TransactionStatus::Pending.is_active());
        assert!(!TransactionStatus::Committed.is_active());
        assert!(!TransactionStatus::RolledBack.is_active());
        assert!(!TransactionStatus::Closed.is_active());
    }

    #[test]
    fn test_finished_statuses() {
        assert!(TransactionStatus::Committed.is_finished());
        assert!(TransactionStatus::RolledBack.is_finished());
        assert!(TransactionStatus::Closed.is_finished());
        assert!(!TransactionStatus::Open.is_finished());
        assert!(!TransactionStatus::Pending.is_finished());
    }

    #[test]
    fn test_handle_derefs_to_provider() {
        let txn = GraphTransaction::new(FixedTransaction(Mutex::new(TransactionStatus::Open)));
        assert_eq!(txn.status(), TransactionStatus::Open);
        txn.commit().unwrap();
        assert_eq!(txn.status(), TransactionStatus::Committed);
    }

    #[test]
    fn test_same_as() {
        let txn = GraphTransaction::new(FixedTransaction(Mutex::new(TransactionStatus::Open)));
        let clone = txn.clone();
        let other = GraphTransaction::new(FixedTransaction(Mutex::new(TransactionStatus::Open)));
        assert!(txn.same_as(&clone));
        assert!(!txn.same_as(&other));
    }

    #[test]
    fn test_status_display() {
        assert_eq!(TransactionStatus::RolledBack.to_string(), "ROLLEDBACK");
    }
}
