use super::{decide, MetadataTable, OperationDescriptor, TransactionDecision};
use crate::client::{GraphSession, GraphTransaction};
use crate::common::ContextId;
use crate::errors::PersistError;
use crate::unit_of_work::PersistService;
use std::error::Error;
use std::sync::Arc;

/// Runs operations inside a unit of work and a transaction.
///
/// For each invocation the interceptor:
///
/// 1. begins a unit of work if the context has none, remembering that this
///    invocation owns it;
/// 2. resolves the operation's [`TransactionMetadata`](super::TransactionMetadata);
/// 3. joins the session's transaction if it is `Open` or `Pending`, running
///    the operation without any commit, rollback or cleanup of its own;
/// 4. otherwise begins a transaction, runs the operation and, on failure,
///    rolls back or commits according to [`decide`] before returning the
///    operation's error unchanged;
/// 5. on success commits and ends the unit of work it began.
///
/// Cleanup failures on the error path are logged and never replace the
/// operation's error. A unit of work begun by the invocation is ended on every
/// path, even when the transaction could not be settled. A panic inside the operation rolls the transaction back
/// and releases a unit of work begun by this invocation before unwinding
/// further.
///
/// # Examples
///
/// ```rust
/// use graphpersist::client::memory::MemoryDriver;
/// use graphpersist::common::ContextId;
/// use graphpersist::errors::PersistError;
/// use graphpersist::transaction::{MetadataTable, OperationDescriptor, TransactionalInterceptor};
/// use graphpersist::{PersistConfig, PersistService};
///
/// let driver = MemoryDriver::new();
/// let service = PersistService::new(PersistConfig::new(), vec![], driver.clone());
/// service.start().unwrap();
/// let interceptor = TransactionalInterceptor::new(service.clone(), MetadataTable::default());
///
/// let ctx = ContextId::new();
/// let save = OperationDescriptor::new("save").declared_in("UserRepository");
/// let answer = interceptor
///     .invoke(ctx, &save, |_session| Ok::<_, PersistError>(42))
///     .unwrap();
///
/// assert_eq!(answer, 42);
/// assert_eq!(driver.stats().commits(), 1);
/// assert!(!service.is_working(ctx));
/// ```
#[derive(Clone)]
pub struct TransactionalInterceptor {
    service: PersistService,
    metadata: Arc<MetadataTable>,
}

impl TransactionalInterceptor {
    pub fn new(service: PersistService, metadata: MetadataTable) -> Self {
        TransactionalInterceptor {
            service,
            metadata: Arc::new(metadata),
        }
    }

    pub fn service(&self) -> &PersistService {
        &self.service
    }

    pub fn metadata(&self) -> &MetadataTable {
        &self.metadata
    }

    /// Binds `operation` to this interceptor for repeated calls.
    pub fn transactional(&self, operation: OperationDescriptor) -> TransactionalOperation {
        TransactionalOperation {
            interceptor: self.clone(),
            operation,
        }
    }

    /// Runs `work` for `operation` on the execution context `ctx`.
    ///
    /// Errors of the persistence layer itself (beginning the unit of work,
    /// opening the transaction, committing a successful operation) are
    /// converted into `E`.
    pub fn invoke<R, E, F>(&self, ctx: ContextId, operation: &OperationDescriptor, work: F) -> Result<R, E>
    where
        F: FnOnce(&GraphSession) -> Result<R, E>,
        E: Error + From<PersistError> + 'static,
    {
        let work_started = if self.service.is_working(ctx) {
            false
        } else {
            self.service.begin(ctx)?;
            true
        };

        let metadata = self.metadata.resolve(operation);
        let session = match self.service.get(ctx) {
            Ok(session) => session,
            Err(e) => {
                if work_started {
                    self.end_quietly(ctx);
                }
                return Err(e.into());
            }
        };

        // an enclosing transactional call owns the open transaction
        if let Some(txn) = session.transaction() {
            if txn.status().is_active() {
                log::debug!("{} joins the open transaction of session {}", operation, session.id());
                return work(&session);
            }
        }

        let txn = match session.begin_transaction() {
            Ok(txn) => txn,
            Err(e) => {
                if work_started {
                    self.end_quietly(ctx);
                }
                return Err(e.into());
            }
        };
        log::debug!("{} began a transaction on session {}", operation, session.id());

        let mut guard = UnwindGuard {
            service: &self.service,
            ctx,
            transaction: &txn,
            work_started,
            armed: true,
        };
        let result = work(&session);
        guard.disarm();

        match result {
            Ok(value) => {
                let committed = txn.commit();
                let ended = if work_started { self.service.end(ctx) } else { Ok(()) };
                match (committed, ended) {
                    (Ok(()), Ok(())) => {
                        log::debug!("{} committed", operation);
                        Ok(value)
                    }
                    (Err(commit_error), Ok(())) => Err(commit_error.into()),
                    (Ok(()), Err(end_error)) => Err(end_error.into()),
                    (Err(commit_error), Err(end_error)) => {
                        log::warn!("Failed to end unit of work on {}: {}", ctx, end_error);
                        Err(commit_error.into())
                    }
                }
            }
            Err(error) => {
                match decide(&error, metadata) {
                    TransactionDecision::Rollback => {
                        log::debug!("{} failed, rolling back: {}", operation, error);
                        if let Err(e) = txn.rollback() {
                            log::warn!("Rollback of {} failed: {}", operation, e);
                        }
                    }
                    TransactionDecision::Commit => {
                        log::debug!("{} failed, committing anyway: {}", operation, error);
                        if let Err(e) = txn.commit() {
                            log::warn!("Commit of failed {} failed: {}", operation, e);
                        }
                    }
                }

                // closing the session releases a transaction left open by a
                // failed rollback or commit
                if work_started {
                    self.end_quietly(ctx);
                }
                Err(error)
            }
        }
    }

    /// [`invoke`](Self::invoke) on the calling thread's context.
    pub fn invoke_current<R, E, F>(&self, operation: &OperationDescriptor, work: F) -> Result<R, E>
    where
        F: FnOnce(&GraphSession) -> Result<R, E>,
        E: Error + From<PersistError> + 'static,
    {
        self.invoke(ContextId::current(), operation, work)
    }

    fn end_quietly(&self, ctx: ContextId) {
        if let Err(e) = self.service.end(ctx) {
            log::warn!("Failed to end unit of work on {}: {}", ctx, e);
        }
    }
}

/// An operation paired with the interceptor that runs it.
///
/// ```rust
/// use graphpersist::client::memory::MemoryDriver;
/// use graphpersist::errors::PersistError;
/// use graphpersist::transaction::{MetadataTable, OperationDescriptor, TransactionalInterceptor};
/// use graphpersist::{PersistConfig, PersistService};
///
/// let service = PersistService::new(PersistConfig::new(), vec![], MemoryDriver::new());
/// service.start().unwrap();
/// let interceptor = TransactionalInterceptor::new(service, MetadataTable::default());
///
/// let count = interceptor.transactional(OperationDescriptor::new("count"));
/// let n: Result<usize, PersistError> = count.run_current(|_session| Ok(3));
/// assert_eq!(n.unwrap(), 3);
/// ```
#[derive(Clone)]
pub struct TransactionalOperation {
    interceptor: TransactionalInterceptor,
    operation: OperationDescriptor,
}

impl TransactionalOperation {
    pub fn descriptor(&self) -> &OperationDescriptor {
        &self.operation
    }

    pub fn run<R, E, F>(&self, ctx: ContextId, work: F) -> Result<R, E>
    where
        F: FnOnce(&GraphSession) -> Result<R, E>,
        E: Error + From<PersistError> + 'static,
    {
        self.interceptor.invoke(ctx, &self.operation, work)
    }

    pub fn run_current<R, E, F>(&self, work: F) -> Result<R, E>
    where
        F: FnOnce(&GraphSession) -> Result<R, E>,
        E: Error + From<PersistError> + 'static,
    {
        self.interceptor.invoke_current(&self.operation, work)
    }
}

/// Rolls back and releases the unit of work when the operation unwinds.
struct UnwindGuard<'a> {
    service: &'a PersistService,
    ctx: ContextId,
    transaction: &'a GraphTransaction,
    work_started: bool,
    armed: bool,
}

impl UnwindGuard<'_> {
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for UnwindGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        log::warn!("Transactional operation on {} panicked, rolling back", self.ctx);
        if let Err(e) = self.transaction.rollback() {
            log::warn!("Rollback after panic failed: {}", e);
        }
        if self.work_started {
            if let Err(e) = self.service.end(self.ctx) {
                log::warn!("Failed to end unit of work on {}: {}", self.ctx, e);
            }
        }
    }
}
