use super::{MemoryFaults, MemorySession, MemoryStats};
use crate::client::{
    GraphDriverProvider, GraphSession, SessionFactory, SessionFactoryProvider,
};
use crate::common::MEMORY_DRIVER;
use crate::errors::{ErrorKind, PersistError, PersistResult};
use crate::persist_config::PersistConfig;
use std::sync::atomic::{AtomicBool, Ordering};

/// Driver for the serverless memory client.
///
/// ```rust
/// use graphpersist::client::memory::MemoryDriver;
/// use graphpersist::client::GraphDriverProvider;
/// use graphpersist::PersistConfig;
///
/// let driver = MemoryDriver::new();
/// let factory = driver
///     .build_session_factory(&PersistConfig::new(), &["app.domain".to_string()])
///     .unwrap();
/// let session = factory.open_session().unwrap();
/// assert!(session.transaction().is_none());
/// assert_eq!(driver.stats().sessions_opened(), 1);
/// ```
#[derive(Clone, Default)]
pub struct MemoryDriver {
    stats: MemoryStats,
    faults: MemoryFaults,
}

impl MemoryDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> MemoryStats {
        self.stats.clone()
    }

    pub fn faults(&self) -> MemoryFaults {
        self.faults.clone()
    }
}

impl GraphDriverProvider for MemoryDriver {
    fn name(&self) -> &str {
        MEMORY_DRIVER
    }

    fn build_session_factory(
        &self,
        config: &PersistConfig,
        packages: &[String],
    ) -> PersistResult<SessionFactory> {
        if self.faults.fail_build() {
            return Err(PersistError::new(
                &format!(
                    "Unable to reach {}",
                    config.uri().unwrap_or("the configured server")
                ),
                ErrorKind::DriverError,
            ));
        }

        self.stats.record_factory();
        Ok(SessionFactory::new(MemorySessionFactory {
            packages: packages.to_vec(),
            closed: AtomicBool::new(false),
            stats: self.stats.clone(),
            faults: self.faults.clone(),
        }))
    }
}

/// Session factory of the memory client.
pub struct MemorySessionFactory {
    packages: Vec<String>,
    closed: AtomicBool,
    stats: MemoryStats,
    faults: MemoryFaults,
}

impl SessionFactoryProvider for MemorySessionFactory {
    fn open_session(&self) -> PersistResult<GraphSession> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(PersistError::new(
                "Session factory is closed",
                ErrorKind::SessionError,
            ));
        }

        if self.faults.fail_open_session() {
            return Err(PersistError::new(
                "Unable to open a session",
                ErrorKind::SessionError,
            ));
        }

        Ok(GraphSession::new(MemorySession::new(
            self.stats.clone(),
            self.faults.clone(),
        )))
    }

    fn packages(&self) -> Vec<String> {
        self.packages.clone()
    }

    fn close(&self) -> PersistResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
