use crate::client::GraphSession;
use crate::common::ContextId;
use crate::errors::{ErrorKind, PersistError, PersistResult};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

/// Process-wide map from execution context to its bound session.
///
/// The map is sharded, so independent contexts never contend on a global lock.
/// A context's own slot is only ever touched by that context.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<DashMap<ContextId, GraphSession>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The session bound to `ctx`, if any.
    pub fn current(&self, ctx: ContextId) -> Option<GraphSession> {
        self.sessions.get(&ctx).map(|entry| entry.value().clone())
    }

    pub fn is_bound(&self, ctx: ContextId) -> bool {
        self.sessions.contains_key(&ctx)
    }

    /// Binds `session` to `ctx`.
    ///
    /// # Errors
    ///
    /// `AlreadyBound` if `ctx` already holds a session.
    pub fn bind(&self, ctx: ContextId, session: GraphSession) -> PersistResult<()> {
        match self.sessions.entry(ctx) {
            Entry::Occupied(_) => {
                log::error!("A session is already bound to {}", ctx);
                Err(PersistError::new(
                    &format!("A session is already bound to {}", ctx),
                    ErrorKind::AlreadyBound,
                ))
            }
            Entry::Vacant(slot) => {
                log::debug!("Bound session {} to {}", session.id(), ctx);
                slot.insert(session);
                Ok(())
            }
        }
    }

    /// Removes the binding of `ctx` and returns the session it held.
    pub fn unbind(&self, ctx: ContextId) -> Option<GraphSession> {
        let removed = self.sessions.remove(&ctx).map(|(_, session)| session);
        if let Some(session) = &removed {
            log::debug!("Unbound session {} from {}", session.id(), ctx);
        }
        removed
    }

    /// Number of contexts holding a session.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::memory::MemoryDriver;
    use crate::client::{GraphDriverProvider, SessionFactory};
    use crate::PersistConfig;
    use std::thread;

    fn factory() -> SessionFactory {
        MemoryDriver::new()
            .build_session_factory(&PersistConfig::new(), &[])
            .unwrap()
    }

    #[test]
    fn test_current_is_none_for_new_context() {
        let registry = SessionRegistry::new();
        assert!(registry.current(ContextId::new()).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_bind_then_current() {
        let registry = SessionRegistry::new();
        let ctx = ContextId::new();
        let session = factory().open_session().unwrap();

        registry.bind(ctx, session.clone()).unwrap();

        let current = registry.current(ctx).unwrap();
        assert!(current.same_as(&session));
        assert!(registry.is_bound(ctx));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_bind_twice_fails() {
        let registry = SessionRegistry::new();
        let ctx = ContextId::new();
        let factory = factory();
        registry.bind(ctx, factory.open_session().unwrap()).unwrap();

        let err = registry.bind(ctx, factory.open_session().unwrap()).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::AlreadyBound);
    }

    #[test]
    fn test_unbind_removes() {
        let registry = SessionRegistry::new();
        let ctx = ContextId::new();
        let session = factory().open_session().unwrap();
        registry.bind(ctx, session.clone()).unwrap();

        let removed = registry.unbind(ctx).unwrap();
        assert!(removed.same_as(&session));
        assert!(registry.current(ctx).is_none());
    }

    #[test]
    fn test_unbind_absent_is_noop() {
        let registry = SessionRegistry::new();
        let ctx = ContextId::new();
        assert!(registry.unbind(ctx).is_none());
        assert!(registry.unbind(ctx).is_none());
    }

    #[test]
    fn test_contexts_are_isolated() {
        let registry = SessionRegistry::new();
        let factory = factory();
        let a = ContextId::new();
        let b = ContextId::new();
        registry.bind(a, factory.open_session().unwrap()).unwrap();

        assert!(registry.current(b).is_none());
        registry.bind(b, factory.open_session().unwrap()).unwrap();
        assert!(!registry.current(a).unwrap().same_as(&registry.current(b).unwrap()));
    }

    #[test]
    fn test_concurrent_binds_from_threads() {
        let registry = SessionRegistry::new();
        let factory = factory();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                let factory = factory.clone();
                thread::spawn(move || {
                    let ctx = ContextId::current();
                    registry.bind(ctx, factory.open_session().unwrap()).unwrap();
                    assert!(registry.is_bound(ctx));
                    registry.unbind(ctx).unwrap();
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert!(registry.is_empty());
    }
}
