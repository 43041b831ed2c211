use super::GraphSession;
use crate::errors::PersistResult;
use std::ops::Deref;
use std::sync::Arc;

/// Contract for the client's session factory.
///
/// A factory is built once per process from the connection configuration and
/// the scanned domain packages, and is shared read-only by every execution
/// context afterwards.
pub trait SessionFactoryProvider: Send + Sync {
    /// Opens a new session.
    fn open_session(&self) -> PersistResult<GraphSession>;

    /// Packages scanned for persistent types.
    fn packages(&self) -> Vec<String>;

    /// Releases process-wide client resources. Idempotent.
    fn close(&self) -> PersistResult<()>;
}

/// Handle to a session factory.
#[derive(Clone)]
pub struct SessionFactory {
    inner: Arc<dyn SessionFactoryProvider>,
}

impl SessionFactory {
    pub fn new<T: SessionFactoryProvider + 'static>(inner: T) -> Self {
        SessionFactory {
            inner: Arc::new(inner),
        }
    }
}

impl std::fmt::Debug for SessionFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionFactory")
            .field("packages", &self.packages())
            .finish()
    }
}

impl Deref for SessionFactory {
    type Target = Arc<dyn SessionFactoryProvider>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}
