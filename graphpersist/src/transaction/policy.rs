use super::TransactionMetadata;
use std::error::Error;

/// Outcome for a transaction whose operation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionDecision {
    Commit,
    Rollback,
}

/// Decides whether a failed operation's transaction commits or rolls back.
///
/// The first `rollback_on` class matching `error` selects `Rollback`, unless
/// any `ignore` class matches too, which turns it back into `Commit`. Scanning
/// stops at the first `rollback_on` match, so declaration order matters for
/// overlapping classes. With no match the transaction commits.
///
/// ```rust
/// use graphpersist::transaction::{decide, ErrorClass, TransactionDecision, TransactionMetadata};
/// use std::io;
///
/// let metadata = TransactionMetadata::new().rollback_on(ErrorClass::of::<io::Error>());
/// let error = io::Error::other("disk gone");
/// assert_eq!(decide(&error, &metadata), TransactionDecision::Rollback);
/// ```
pub fn decide(error: &(dyn Error + 'static), metadata: &TransactionMetadata) -> TransactionDecision {
    let Some(matched) = metadata
        .rollback_classes()
        .iter()
        .find(|class| class.is_instance(error))
    else {
        return TransactionDecision::Commit;
    };

    if let Some(ignored) = metadata.ignore_classes().iter().find(|class| class.is_instance(error)) {
        log::debug!(
            "{} matches rollback class {} but is ignored by {}",
            error,
            matched.name(),
            ignored.name()
        );
        return TransactionDecision::Commit;
    }

    log::debug!("{} matches rollback class {}", error, matched.name());
    TransactionDecision::Rollback
}
