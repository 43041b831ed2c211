use super::GraphTransaction;
use crate::errors::PersistResult;
use std::ops::Deref;
use std::sync::Arc;

/// Contract for a live, connection-scoped session of the graph client.
///
/// A session holds zero or one transaction at a time. `transaction()` keeps
/// returning the last transaction after it finished, so callers inspect its
/// status to decide whether to join it or begin a new one.
///
/// # Thread Safety
/// Implementers must be `Send + Sync` so sessions can sit in the process-wide
/// registry, but a session is used by a single execution context.
pub trait GraphSessionProvider: Send + Sync {
    /// Unique id of this session.
    fn id(&self) -> &str;

    /// The transaction currently associated with this session, if any.
    fn transaction(&self) -> Option<GraphTransaction>;

    /// Begins a new transaction on this session.
    ///
    /// Fails if the session is closed or a transaction is still open.
    fn begin_transaction(&self) -> PersistResult<GraphTransaction>;

    /// Releases the session. Idempotent; an open transaction is rolled back.
    fn close(&self) -> PersistResult<()>;
}

/// Handle to a client session.
///
/// Cloning is cheap and every clone refers to the same session.
#[derive(Clone)]
pub struct GraphSession {
    inner: Arc<dyn GraphSessionProvider>,
}

impl GraphSession {
    pub fn new<T: GraphSessionProvider + 'static>(inner: T) -> Self {
        GraphSession {
            inner: Arc::new(inner),
        }
    }

    /// Whether both handles point at the same session instance.
    pub fn same_as(&self, other: &GraphSession) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Deref for GraphSession {
    type Target = Arc<dyn GraphSessionProvider>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl std::fmt::Debug for GraphSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphSession").field("id", &self.id()).finish()
    }
}
