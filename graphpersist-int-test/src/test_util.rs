use graphpersist::client::memory::{MemoryDriver, MemoryStats};
use graphpersist::errors::{ErrorKind, PersistError, PersistResult};
use graphpersist::transaction::{
    ErrorClass, OperationDescriptor, TransactionMetadata, TransactionalInterceptor,
};
use graphpersist::{PersistBindings, PersistModule, PersistService};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;
use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};

pub const ACCOUNT_REPOSITORY: &str = "AccountRepository";
pub const AUDIT_REPOSITORY: &str = "AuditRepository";
pub const TEST_PACKAGE: &str = "com.example.bank";

/// Error type of the repositories exercised by the tests.
#[derive(Debug)]
pub enum RepositoryError {
    Io(io::Error),
    Validation(String),
    Conflict(String),
    Persist(PersistError),
}

impl Display for RepositoryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RepositoryError::Io(e) => write!(f, "I/O failure: {}", e),
            RepositoryError::Validation(msg) => write!(f, "validation failed: {}", msg),
            RepositoryError::Conflict(msg) => write!(f, "conflict: {}", msg),
            RepositoryError::Persist(e) => write!(f, "persistence failure: {}", e),
        }
    }
}

impl Error for RepositoryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            RepositoryError::Io(e) => Some(e),
            RepositoryError::Persist(e) => Some(e),
            _ => None,
        }
    }
}

impl From<PersistError> for RepositoryError {
    fn from(e: PersistError) -> Self {
        RepositoryError::Persist(e)
    }
}

impl From<io::Error> for RepositoryError {
    fn from(e: io::Error) -> Self {
        RepositoryError::Io(e)
    }
}

pub type TestResult = Result<(), RepositoryError>;

/// Any I/O failure, found through the `source()` chain.
pub fn io_failure() -> ErrorClass {
    ErrorClass::caused_by::<io::Error>()
}

/// I/O timeouts only.
pub fn io_timeout() -> ErrorClass {
    ErrorClass::matching("io timeout", |e| {
        matches!(
            e.downcast_ref::<RepositoryError>(),
            Some(RepositoryError::Io(io)) if io.kind() == io::ErrorKind::TimedOut
        )
    })
}

pub fn conflict() -> ErrorClass {
    ErrorClass::matching("conflict", |e| {
        matches!(e.downcast_ref::<RepositoryError>(), Some(RepositoryError::Conflict(_)))
    })
}

#[derive(Clone)]
pub struct TestContext {
    bindings: PersistBindings,
    driver: MemoryDriver,
}

impl TestContext {
    pub fn new(bindings: PersistBindings, driver: MemoryDriver) -> Self {
        Self { bindings, driver }
    }

    pub fn service(&self) -> &PersistService {
        self.bindings.service()
    }

    pub fn interceptor(&self) -> &TransactionalInterceptor {
        self.bindings.interceptor()
    }

    pub fn bindings(&self) -> &PersistBindings {
        &self.bindings
    }

    pub fn driver(&self) -> &MemoryDriver {
        &self.driver
    }

    pub fn stats(&self) -> MemoryStats {
        self.driver.stats()
    }
}

/// Module used by every test context.
///
/// `AccountRepository` rolls back on I/O failures except timeouts,
/// `AuditRepository::append` rolls back on conflicts, everything else uses
/// the default rules.
pub fn test_module(driver: &MemoryDriver) -> PersistModule {
    PersistModule::new()
        .package(TEST_PACKAGE)
        .property("neo4j.ogm.driver", "memory")
        .property("neo4j.ogm.url", "memory://test")
        .driver(driver.clone())
        .for_type(
            ACCOUNT_REPOSITORY,
            TransactionMetadata::new()
                .rollback_on(io_failure())
                .ignore(io_timeout()),
        )
        .for_operation(
            &OperationDescriptor::new("append").declared_in(AUDIT_REPOSITORY),
            TransactionMetadata::new().rollback_on(conflict()),
        )
}

/// A started service over a fresh in-memory driver.
pub fn create_test_context() -> PersistResult<TestContext> {
    let ctx = create_unstarted_context()?;
    ctx.service().start()?;
    Ok(ctx)
}

/// Same as [`create_test_context`] without calling `start()`.
pub fn create_unstarted_context() -> PersistResult<TestContext> {
    let driver = MemoryDriver::new();
    let bindings = test_module(&driver).build()?;
    Ok(TestContext::new(bindings, driver))
}

/// Stops the service and fails if any session is still open.
pub fn cleanup(ctx: TestContext) -> PersistResult<()> {
    ctx.service().stop()?;

    let leaked = ctx.stats().open_sessions();
    if leaked > 0 {
        return Err(PersistError::new(
            &format!("{} session(s) leaked", leaked),
            ErrorKind::InternalError,
        ));
    }
    Ok(())
}

/// Runs `test` between `before` and `after`.
///
/// `after` runs even when the test fails or panics; a panic is resumed once
/// cleanup is done.
pub fn run_test<T, B, A>(before: B, test: T, after: A)
where
    T: FnOnce(TestContext) -> TestResult,
    B: FnOnce() -> PersistResult<TestContext>,
    A: FnOnce(TestContext) -> PersistResult<()>,
{
    let ctx = match before() {
        Ok(ctx) => ctx,
        Err(e) => panic!("Before run failed: {:?}", e),
    };

    let outcome = catch_unwind(AssertUnwindSafe(|| test(ctx.clone())));
    let after_result = after(ctx);

    match outcome {
        Ok(Ok(())) => {
            if let Err(e) = after_result {
                panic!("After run failed: {:?}", e);
            }
        }
        Ok(Err(e)) => panic!("Test failed: {:?}", e),
        Err(panic) => resume_unwind(panic),
    }
}
