use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static THREAD_CONTEXT: ContextId = ContextId::new();
}

/// Identity of an execution context.
///
/// A unit of work binds at most one session per `ContextId`. Callers pass the id
/// explicitly; [`ContextId::current`] yields a stable id for the calling thread,
/// and [`ContextId::new`] allocates a fresh one for logical tasks that are not
/// tied to a single thread.
///
/// ```rust
/// use graphpersist::common::ContextId;
///
/// assert_eq!(ContextId::current(), ContextId::current());
/// assert_ne!(ContextId::new(), ContextId::new());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(u64);

impl ContextId {
    /// Allocates a new, process-unique context id.
    pub fn new() -> Self {
        ContextId(NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the context id of the calling thread.
    pub fn current() -> Self {
        THREAD_CONTEXT.with(|id| *id)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl Default for ContextId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for ContextId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "ctx-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_current_is_stable_within_thread() {
        let first = ContextId::current();
        let second = ContextId::current();
        assert_eq!(first, second);
    }

    #[test]
    fn test_current_differs_across_threads() {
        let here = ContextId::current();
        let there = thread::spawn(ContextId::current).join().unwrap();
        assert_ne!(here, there);
    }

    #[test]
    fn test_new_is_unique() {
        let a = ContextId::new();
        let b = ContextId::new();
        assert_ne!(a, b);
        assert!(b.value() > a.value());
    }

    #[test]
    fn test_display() {
        let id = ContextId(42);
        assert_eq!(id.to_string(), "ctx-42");
    }
}
