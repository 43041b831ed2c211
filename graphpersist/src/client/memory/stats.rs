use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Counters shared by a memory driver and everything it creates.
#[derive(Clone, Default)]
pub struct MemoryStats {
    inner: Arc<MemoryStatsInner>,
}

#[derive(Default)]
struct MemoryStatsInner {
    factories_built: AtomicUsize,
    sessions_opened: AtomicUsize,
    sessions_closed: AtomicUsize,
    transactions_begun: AtomicUsize,
    commits: AtomicUsize,
    rollbacks: AtomicUsize,
}

impl MemoryStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn factories_built(&self) -> usize {
        self.inner.factories_built.load(Ordering::SeqCst)
    }

    pub fn sessions_opened(&self) -> usize {
        self.inner.sessions_opened.load(Ordering::SeqCst)
    }

    pub fn sessions_closed(&self) -> usize {
        self.inner.sessions_closed.load(Ordering::SeqCst)
    }

    /// Sessions opened but not yet closed.
    pub fn open_sessions(&self) -> usize {
        self.sessions_opened().saturating_sub(self.sessions_closed())
    }

    pub fn transactions_begun(&self) -> usize {
        self.inner.transactions_begun.load(Ordering::SeqCst)
    }

    pub fn commits(&self) -> usize {
        self.inner.commits.load(Ordering::SeqCst)
    }

    pub fn rollbacks(&self) -> usize {
        self.inner.rollbacks.load(Ordering::SeqCst)
    }

    pub(crate) fn record_factory(&self) {
        self.inner.factories_built.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn record_session_opened(&self) {
        self.inner.sessions_opened.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn record_session_closed(&self) {
        self.inner.sessions_closed.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn record_transaction(&self) {
        self.inner.transactions_begun.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn record_commit(&self) {
        self.inner.commits.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn record_rollback(&self) {
        self.inner.rollbacks.fetch_add(1, Ordering::SeqCst);
    }
}

/// Switches that make the memory client fail on purpose.
#[derive(Clone, Default)]
pub struct MemoryFaults {
    inner: Arc<MemoryFaultsInner>,
}

#[derive(Default)]
struct MemoryFaultsInner {
    fail_build: AtomicBool,
    fail_open_session: AtomicBool,
    fail_begin_transaction: AtomicBool,
    fail_commit: AtomicBool,
    fail_rollback: AtomicBool,
    fail_close_session: AtomicBool,
}

impl MemoryFaults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_build(&self, fail: bool) {
        self.inner.fail_build.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_open_session(&self, fail: bool) {
        self.inner.fail_open_session.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_begin_transaction(&self, fail: bool) {
        self.inner.fail_begin_transaction.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_commit(&self, fail: bool) {
        self.inner.fail_commit.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_rollback(&self, fail: bool) {
        self.inner.fail_rollback.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_close_session(&self, fail: bool) {
        self.inner.fail_close_session.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn fail_build(&self) -> bool {
        self.inner.fail_build.load(Ordering::SeqCst)
    }

    pub(crate) fn fail_open_session(&self) -> bool {
        self.inner.fail_open_session.load(Ordering::SeqCst)
    }

    pub(crate) fn fail_begin_transaction(&self) -> bool {
        self.inner.fail_begin_transaction.load(Ordering::SeqCst)
    }

    pub(crate) fn fail_commit(&self) -> bool {
        self.inner.fail_commit.load(Ordering::SeqCst)
    }

    pub(crate) fn fail_rollback(&self) -> bool {
        self.inner.fail_rollback.load(Ordering::SeqCst)
    }

    pub(crate) fn fail_close_session(&self) -> bool {
        self.inner.fail_close_session.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_sessions_tracks_balance() {
        let stats = MemoryStats::new();
        stats.record_session_opened();
        stats.record_session_opened();
        stats.record_session_closed();
        assert_eq!(stats.sessions_opened(), 2);
        assert_eq!(stats.open_sessions(), 1);
    }

    #[test]
    fn test_clones_share_counters() {
        let stats = MemoryStats::new();
        let other = stats.clone();
        other.record_commit();
        other.record_rollback();
        assert_eq!(stats.commits(), 1);
        assert_eq!(stats.rollbacks(), 1);
    }

    #[test]
    fn test_faults_default_off() {
        let faults = MemoryFaults::new();
        assert!(!faults.fail_build());
        assert!(!faults.fail_commit());
        faults.set_fail_commit(true);
        assert!(faults.clone().fail_commit());
    }
}
