use super::SessionFactory;
use crate::errors::PersistResult;
use crate::persist_config::PersistConfig;
use std::ops::Deref;
use std::sync::Arc;

/// Entry point of a graph client library.
///
/// The driver turns a [`PersistConfig`] plus the scanned packages into a
/// [`SessionFactory`]. It is invoked exactly once, from `PersistService::start`.
pub trait GraphDriverProvider: Send + Sync {
    /// Driver identifier, matched against the configured `neo4j.ogm.driver`.
    fn name(&self) -> &str;

    /// Builds the session factory.
    fn build_session_factory(
        &self,
        config: &PersistConfig,
        packages: &[String],
    ) -> PersistResult<SessionFactory>;
}

/// Handle to a graph driver.
#[derive(Clone)]
pub struct GraphDriver {
    inner: Arc<dyn GraphDriverProvider>,
}

impl GraphDriver {
    pub fn new<T: GraphDriverProvider + 'static>(inner: T) -> Self {
        GraphDriver {
            inner: Arc::new(inner),
        }
    }
}

impl Deref for GraphDriver {
    type Target = Arc<dyn GraphDriverProvider>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}
