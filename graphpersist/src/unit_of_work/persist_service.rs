use super::SessionRegistry;
use crate::client::{GraphDriver, GraphSession, SessionFactory};
use crate::common::ContextId;
use crate::errors::{ErrorKind, PersistError, PersistResult};
use crate::persist_config::PersistConfig;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Explicit unit-of-work boundaries for one execution context.
///
/// `end` without a preceding `begin` is a no-op, so it can be called
/// unconditionally from cleanup code.
pub trait UnitOfWork: Send + Sync {
    /// Opens a session and binds it to `ctx`.
    fn begin(&self, ctx: ContextId) -> PersistResult<()>;

    /// Unbinds and releases the session of `ctx`, if any.
    fn end(&self, ctx: ContextId) -> PersistResult<()>;
}

/// Process-wide lifecycle of the persistence layer.
pub trait PersistLifecycle: Send + Sync {
    /// Builds the session factory. Fails if called twice.
    fn start(&self) -> PersistResult<()>;

    /// Releases process-wide client resources.
    fn stop(&self) -> PersistResult<()>;
}

/// Owns the session factory and the per-context session bindings.
///
/// # Lifecycle
///
/// 1. `start()` builds the [`SessionFactory`] through the driver, once.
/// 2. `begin(ctx)` / `get(ctx)` bind a session to a context.
/// 3. `end(ctx)` unbinds and closes it.
/// 4. `stop()` closes the factory; no new unit of work can begin afterwards.
///
/// Cloning is cheap; every clone shares the same factory and registry.
///
/// ```rust
/// use graphpersist::client::memory::MemoryDriver;
/// use graphpersist::common::ContextId;
/// use graphpersist::{PersistConfig, PersistService};
///
/// let service = PersistService::new(PersistConfig::new(), vec![], MemoryDriver::new());
/// service.start().unwrap();
///
/// let ctx = ContextId::new();
/// let session = service.get(ctx).unwrap();
/// assert!(service.get(ctx).unwrap().same_as(&session));
/// service.end(ctx).unwrap();
/// assert!(!service.is_working(ctx));
/// ```
#[derive(Clone)]
pub struct PersistService {
    inner: Arc<PersistServiceInner>,
}

impl PersistService {
    /// Creates a service that is not started yet.
    pub fn new<D>(config: PersistConfig, packages: Vec<String>, driver: D) -> Self
    where
        D: crate::client::GraphDriverProvider + 'static,
    {
        Self::with_driver(config, packages, GraphDriver::new(driver))
    }

    pub fn with_driver(config: PersistConfig, packages: Vec<String>, driver: GraphDriver) -> Self {
        PersistService {
            inner: Arc::new(PersistServiceInner {
                config,
                packages,
                driver,
                factory: Mutex::new(None),
                stopped: AtomicBool::new(false),
                registry: SessionRegistry::new(),
            }),
        }
    }

    pub fn config(&self) -> &PersistConfig {
        &self.inner.config
    }

    pub fn packages(&self) -> &[String] {
        &self.inner.packages
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.inner.registry
    }

    /// Builds the session factory.
    ///
    /// # Errors
    ///
    /// `AlreadyStarted` if the factory already exists, `ServiceStopped` if
    /// `stop()` ran first, `DriverError` if the driver cannot build it.
    pub fn start(&self) -> PersistResult<()> {
        self.inner.start()
    }

    /// Closes the session factory. Idempotent.
    pub fn stop(&self) -> PersistResult<()> {
        self.inner.stop()
    }

    pub fn is_started(&self) -> bool {
        self.inner.factory.lock().is_some()
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::SeqCst)
    }

    /// Opens a session and binds it to `ctx`.
    ///
    /// # Errors
    ///
    /// `WorkAlreadyBegun` if `ctx` already holds a session; `NotStarted` or
    /// `ServiceStopped` outside the started lifecycle.
    pub fn begin(&self, ctx: ContextId) -> PersistResult<()> {
        self.inner.begin(ctx)
    }

    /// Unbinds and closes the session of `ctx`. No-op when none is bound.
    pub fn end(&self, ctx: ContextId) -> PersistResult<()> {
        self.inner.end(ctx)
    }

    /// The session of `ctx`, beginning a unit of work first if needed.
    pub fn get(&self, ctx: ContextId) -> PersistResult<GraphSession> {
        self.inner.get(ctx)
    }

    /// Whether `ctx` currently holds a session.
    pub fn is_working(&self, ctx: ContextId) -> bool {
        self.inner.registry.is_bound(ctx)
    }

    pub fn begin_current(&self) -> PersistResult<()> {
        self.begin(ContextId::current())
    }

    pub fn end_current(&self) -> PersistResult<()> {
        self.end(ContextId::current())
    }

    pub fn get_current(&self) -> PersistResult<GraphSession> {
        self.get(ContextId::current())
    }

    pub fn is_working_current(&self) -> bool {
        self.is_working(ContextId::current())
    }
}

impl UnitOfWork for PersistService {
    fn begin(&self, ctx: ContextId) -> PersistResult<()> {
        PersistService::begin(self, ctx)
    }

    fn end(&self, ctx: ContextId) -> PersistResult<()> {
        PersistService::end(self, ctx)
    }
}

impl PersistLifecycle for PersistService {
    fn start(&self) -> PersistResult<()> {
        PersistService::start(self)
    }

    fn stop(&self) -> PersistResult<()> {
        PersistService::stop(self)
    }
}

struct PersistServiceInner {
    config: PersistConfig,
    packages: Vec<String>,
    driver: GraphDriver,
    /// Built once by `start`; the lock also serializes construction.
    factory: Mutex<Option<SessionFactory>>,
    stopped: AtomicBool,
    registry: SessionRegistry,
}

impl PersistServiceInner {
    fn start(&self) -> PersistResult<()> {
        let mut factory = self.factory.lock();
        if factory.is_some() {
            log::error!("Persistence service was already initialized");
            return Err(PersistError::new(
                "Persistence service was already initialized",
                ErrorKind::AlreadyStarted,
            ));
        }

        if self.stopped.load(Ordering::SeqCst) {
            log::error!("Persistence service was stopped before it started");
            return Err(PersistError::new(
                "Persistence service was stopped before it started",
                ErrorKind::ServiceStopped,
            ));
        }

        let built = self
            .driver
            .build_session_factory(&self.config, &self.packages)
            .map_err(|e| {
                log::error!("Failed to build session factory: {}", e);
                PersistError::new_with_cause(
                    &format!("Failed to build session factory with driver {}", self.driver.name()),
                    ErrorKind::DriverError,
                    e,
                )
            })?;

        log::debug!(
            "Session factory built by driver {} for packages {:?}",
            self.driver.name(),
            self.packages
        );
        *factory = Some(built);
        Ok(())
    }

    fn stop(&self) -> PersistResult<()> {
        if self
            .stopped
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Ok(());
        }

        let factory = self.factory.lock().clone();
        if let Some(factory) = factory {
            factory.close()?;
            log::debug!("Session factory closed");
        }
        Ok(())
    }

    fn session_factory(&self) -> PersistResult<SessionFactory> {
        if self.stopped.load(Ordering::SeqCst) {
            log::error!("Persistence service was stopped");
            return Err(PersistError::new(
                "Persistence service was stopped",
                ErrorKind::ServiceStopped,
            ));
        }

        self.factory.lock().clone().ok_or_else(|| {
            log::error!("Persistence service was not started");
            PersistError::new(
                "Persistence service was not started. Call start() before beginning work.",
                ErrorKind::NotStarted,
            )
        })
    }

    fn begin(&self, ctx: ContextId) -> PersistResult<()> {
        if self.registry.is_bound(ctx) {
            log::error!("Work already begun on {}", ctx);
            return Err(PersistError::new(
                &format!(
                    "Work already begun on {}. Looks like begin() was called twice \
                     without a balancing call to end() in between.",
                    ctx
                ),
                ErrorKind::WorkAlreadyBegun,
            ));
        }

        let session = self.session_factory()?.open_session()?;
        if let Err(e) = self.registry.bind(ctx, session.clone()) {
            if let Err(close_error) = session.close() {
                log::warn!("Failed to close unbound session {}: {}", session.id(), close_error);
            }
            return Err(e);
        }
        Ok(())
    }

    fn end(&self, ctx: ContextId) -> PersistResult<()> {
        // calling end() more than once is not an error
        match self.registry.unbind(ctx) {
            Some(session) => session.close(),
            None => Ok(()),
        }
    }

    fn get(&self, ctx: ContextId) -> PersistResult<GraphSession> {
        if !self.registry.is_bound(ctx) {
            self.begin(ctx)?;
        }

        self.registry.current(ctx).ok_or_else(|| {
            PersistError::new(
                &format!("Requested session outside a unit of work on {}", ctx),
                ErrorKind::NoActiveSession,
            )
        })
    }
}
