use crate::errors::{ErrorKind, PersistError, PersistResult};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;

type ErrorMatcher = dyn Fn(&(dyn Error + 'static)) -> bool + Send + Sync;

/// A named classification of errors.
///
/// `ErrorClass::of::<T>()` matches errors whose concrete type is `T`.
/// `ErrorClass::matching` takes any predicate, which is how a narrower class
/// (a timeout) is declared inside a broader one (any I/O error).
///
/// ```rust
/// use graphpersist::transaction::ErrorClass;
/// use std::io;
///
/// let any_io = ErrorClass::of::<io::Error>();
/// let timeout = ErrorClass::matching("TimedOut", |e| {
///     e.downcast_ref::<io::Error>()
///         .is_some_and(|io| io.kind() == io::ErrorKind::TimedOut)
/// });
///
/// let error = io::Error::new(io::ErrorKind::TimedOut, "slow");
/// assert!(any_io.is_instance(&error));
/// assert!(timeout.is_instance(&error));
/// assert!(!timeout.is_instance(&io::Error::other("down")));
/// ```
#[derive(Clone)]
pub struct ErrorClass {
    name: String,
    matcher: Arc<ErrorMatcher>,
}

impl ErrorClass {
    /// Matches errors of concrete type `T`.
    pub fn of<T: Error + 'static>() -> Self {
        ErrorClass {
            name: std::any::type_name::<T>().to_string(),
            matcher: Arc::new(|error: &(dyn Error + 'static)| error.is::<T>()),
        }
    }

    /// Matches errors of type `T` anywhere in the `source()` chain.
    pub fn caused_by<T: Error + 'static>() -> Self {
        ErrorClass {
            name: format!("caused by {}", std::any::type_name::<T>()),
            matcher: Arc::new(|error: &(dyn Error + 'static)| {
                let mut current = Some(error);
                while let Some(e) = current {
                    if e.is::<T>() {
                        return true;
                    }
                    current = e.source();
                }
                false
            }),
        }
    }

    /// Matches errors accepted by `predicate`.
    pub fn matching<F>(name: &str, predicate: F) -> Self
    where
        F: Fn(&(dyn Error + 'static)) -> bool + Send + Sync + 'static,
    {
        ErrorClass {
            name: name.to_string(),
            matcher: Arc::new(predicate),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_instance(&self, error: &(dyn Error + 'static)) -> bool {
        (self.matcher)(error)
    }
}

impl Debug for ErrorClass {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "ErrorClass({})", self.name)
    }
}

/// Declarative commit/rollback rules of a transactional operation.
///
/// Both lists are ordered. The default value has no rules, so every failure
/// commits the work done so far before the error propagates.
#[derive(Clone, Debug, Default)]
pub struct TransactionMetadata {
    rollback_on: Vec<ErrorClass>,
    ignore: Vec<ErrorClass>,
}

impl TransactionMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a class whose errors roll the transaction back.
    pub fn rollback_on(mut self, class: ErrorClass) -> Self {
        self.rollback_on.push(class);
        self
    }

    /// Appends a class whose errors commit even when a rollback class matches.
    pub fn ignore(mut self, class: ErrorClass) -> Self {
        self.ignore.push(class);
        self
    }

    pub fn rollback_classes(&self) -> &[ErrorClass] {
        &self.rollback_on
    }

    pub fn ignore_classes(&self) -> &[ErrorClass] {
        &self.ignore
    }
}

/// Identifies an invoked operation and the type that declares it.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct OperationDescriptor {
    operation: String,
    declaring_type: Option<String>,
}

impl OperationDescriptor {
    pub fn new(operation: &str) -> Self {
        OperationDescriptor {
            operation: operation.to_string(),
            declaring_type: None,
        }
    }

    pub fn declared_in(mut self, declaring_type: &str) -> Self {
        self.declaring_type = Some(declaring_type.to_string());
        self
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn declaring_type(&self) -> Option<&str> {
        self.declaring_type.as_deref()
    }
}

impl Display for OperationDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.declaring_type {
            Some(declaring_type) => write!(f, "{}::{}", declaring_type, self.operation),
            None => write!(f, "{}", self.operation),
        }
    }
}

/// Transaction metadata registered at startup.
///
/// Lookup goes operation first, then declaring type, then the table default.
/// Operation rules are keyed by the full descriptor, so rules for
/// `AccountRepository::save` never apply to `AuditRepository::save`.
#[derive(Clone, Debug, Default)]
pub struct MetadataTable {
    operations: HashMap<OperationDescriptor, TransactionMetadata>,
    types: HashMap<String, TransactionMetadata>,
    default: TransactionMetadata,
}

impl MetadataTable {
    pub fn builder() -> MetadataTableBuilder {
        MetadataTableBuilder::new()
    }

    pub fn resolve(&self, descriptor: &OperationDescriptor) -> &TransactionMetadata {
        if let Some(metadata) = self.operations.get(descriptor) {
            return metadata;
        }

        descriptor
            .declaring_type()
            .and_then(|declaring_type| self.types.get(declaring_type))
            .unwrap_or(&self.default)
    }

    pub fn default_metadata(&self) -> &TransactionMetadata {
        &self.default
    }

    pub fn len(&self) -> usize {
        self.operations.len() + self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Builder for [`MetadataTable`].
///
/// Registering the same operation or type twice is a configuration error; the
/// first error is kept and returned by `build()`.
///
/// ```rust
/// use graphpersist::transaction::{ErrorClass, MetadataTable, OperationDescriptor, TransactionMetadata};
/// use std::io;
///
/// let table = MetadataTable::builder()
///     .for_type("AccountRepository", TransactionMetadata::new())
///     .for_operation(
///         &OperationDescriptor::new("transfer").declared_in("AccountRepository"),
///         TransactionMetadata::new().rollback_on(ErrorClass::of::<io::Error>()),
///     )
///     .build()
///     .unwrap();
///
/// let transfer = OperationDescriptor::new("transfer").declared_in("AccountRepository");
/// assert_eq!(table.resolve(&transfer).rollback_classes().len(), 1);
/// ```
#[derive(Default)]
pub struct MetadataTableBuilder {
    error: Option<PersistError>,
    table: MetadataTable,
}

impl MetadataTableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers metadata for a single operation of a single type.
    ///
    /// A descriptor without a declaring type only matches descriptors that
    /// have none either.
    pub fn for_operation(mut self, operation: &OperationDescriptor, metadata: TransactionMetadata) -> Self {
        if self.error.is_none() && self.table.operations.contains_key(operation) {
            self.error = Some(duplicate("operation", &operation.to_string()));
            return self;
        }
        self.table.operations.insert(operation.clone(), metadata);
        self
    }

    /// Registers metadata for every operation declared in `declaring_type`.
    pub fn for_type(mut self, declaring_type: &str, metadata: TransactionMetadata) -> Self {
        if self.error.is_none() && self.table.types.contains_key(declaring_type) {
            self.error = Some(duplicate("type", declaring_type));
            return self;
        }
        self.table.types.insert(declaring_type.to_string(), metadata);
        self
    }

    /// Replaces the metadata used when neither operation nor type is registered.
    pub fn default_metadata(mut self, metadata: TransactionMetadata) -> Self {
        self.table.default = metadata;
        self
    }

    pub fn build(self) -> PersistResult<MetadataTable> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.table),
        }
    }
}

fn duplicate(scope: &str, name: &str) -> PersistError {
    log::error!("Transaction metadata for {} {} registered twice", scope, name);
    PersistError::new(
        &format!("Transaction metadata for {} {} registered twice", scope, name),
        ErrorKind::ConfigurationError,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    fn io_rollback() -> TransactionMetadata {
        TransactionMetadata::new().rollback_on(ErrorClass::of::<io::Error>())
    }

    #[test]
    fn test_error_class_of_matches_type() {
        let class = ErrorClass::of::<io::Error>();
        assert!(class.is_instance(&io::Error::other("x")));
        assert!(!class.is_instance(&PersistError::new("x", ErrorKind::InternalError)));
        assert!(class.name().contains("Error"));
    }

    #[test]
    fn test_error_class_caused_by_walks_sources() {
        let cause = PersistError::new("socket closed", ErrorKind::SessionError);
        let wrapped = PersistError::new_with_cause("commit failed", ErrorKind::TransactionError, cause);
        let class = ErrorClass::caused_by::<PersistError>();
        assert!(class.is_instance(&wrapped));
        assert!(!class.is_instance(&io::Error::other("x")));
        assert!(!ErrorClass::caused_by::<io::Error>().is_instance(&wrapped));
    }

    #[test]
    fn test_error_class_debug() {
        let class = ErrorClass::matching("Timeout", |_| true);
        assert_eq!(format!("{:?}", class), "ErrorClass(Timeout)");
    }

    #[test]
    fn test_metadata_keeps_declaration_order() {
        let metadata = TransactionMetadata::new()
            .rollback_on(ErrorClass::matching("first", |_| true))
            .rollback_on(ErrorClass::matching("second", |_| true));
        let names: Vec<_> = metadata.rollback_classes().iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["first", "second"]);
        assert!(metadata.ignore_classes().is_empty());
    }

    #[test]
    fn test_resolve_operation_over_type() {
        let table = MetadataTable::builder()
            .for_type("Repo", TransactionMetadata::new().ignore(ErrorClass::of::<io::Error>()))
            .for_operation(&OperationDescriptor::new("save").declared_in("Repo"), io_rollback())
            .build()
            .unwrap();

        let save = OperationDescriptor::new("save").declared_in("Repo");
        assert_eq!(table.resolve(&save).rollback_classes().len(), 1);
        assert!(table.resolve(&save).ignore_classes().is_empty());
    }

    #[test]
    fn test_resolve_falls_back_to_type() {
        let table = MetadataTable::builder()
            .for_type("Repo", io_rollback())
            .build()
            .unwrap();

        let load = OperationDescriptor::new("load").declared_in("Repo");
        assert_eq!(table.resolve(&load).rollback_classes().len(), 1);
    }

    #[test]
    fn test_resolve_falls_back_to_default() {
        let table = MetadataTable::builder()
            .for_type("Repo", io_rollback())
            .build()
            .unwrap();

        let other = OperationDescriptor::new("load").declared_in("Other");
        let bare = OperationDescriptor::new("load");
        assert!(table.resolve(&other).rollback_classes().is_empty());
        assert!(table.resolve(&bare).rollback_classes().is_empty());
    }

    #[test]
    fn test_custom_default() {
        let table = MetadataTable::builder()
            .default_metadata(io_rollback())
            .build()
            .unwrap();
        let op = OperationDescriptor::new("anything");
        assert_eq!(table.resolve(&op).rollback_classes().len(), 1);
        assert!(table.is_empty());
    }

    #[test]
    fn test_duplicate_operation_is_error() {
        let err = MetadataTable::builder()
            .for_operation(&OperationDescriptor::new("save"), TransactionMetadata::new())
            .for_operation(&OperationDescriptor::new("save"), io_rollback())
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::ConfigurationError);
    }

    #[test]
    fn test_first_error_is_kept() {
        let err = MetadataTable::builder()
            .for_type("Repo", TransactionMetadata::new())
            .for_type("Repo", TransactionMetadata::new())
            .for_operation(&OperationDescriptor::new("save"), TransactionMetadata::new())
            .for_operation(&OperationDescriptor::new("save"), TransactionMetadata::new())
            .build()
            .unwrap_err();
        assert!(err.message().contains("type Repo"));
    }

    #[test]
    fn test_operation_rules_stay_with_their_type() {
        let account_save = OperationDescriptor::new("save").declared_in("AccountRepository");
        let audit_save = OperationDescriptor::new("save").declared_in("AuditRepository");
        let table = MetadataTable::builder()
            .for_type(
                "AuditRepository",
                TransactionMetadata::new().ignore(ErrorClass::of::<io::Error>()),
            )
            .for_operation(&account_save, io_rollback())
            .build()
            .unwrap();

        assert_eq!(table.resolve(&account_save).rollback_classes().len(), 1);
        let audit = table.resolve(&audit_save);
        assert!(audit.rollback_classes().is_empty());
        assert_eq!(audit.ignore_classes().len(), 1);
    }

    #[test]
    fn test_same_operation_name_with_different_rules() {
        let account_save = OperationDescriptor::new("save").declared_in("AccountRepository");
        let audit_save = OperationDescriptor::new("save").declared_in("AuditRepository");
        let table = MetadataTable::builder()
            .for_operation(&account_save, io_rollback())
            .for_operation(
                &audit_save,
                TransactionMetadata::new().ignore(ErrorClass::of::<io::Error>()),
            )
            .build()
            .unwrap();

        assert_eq!(table.resolve(&account_save).rollback_classes().len(), 1);
        assert!(table.resolve(&account_save).ignore_classes().is_empty());
        assert!(table.resolve(&audit_save).rollback_classes().is_empty());
        assert_eq!(table.resolve(&audit_save).ignore_classes().len(), 1);
    }

    #[test]
    fn test_untyped_operation_rules_match_untyped_descriptors_only() {
        let table = MetadataTable::builder()
            .for_operation(&OperationDescriptor::new("save"), io_rollback())
            .build()
            .unwrap();

        assert_eq!(table.resolve(&OperationDescriptor::new("save")).rollback_classes().len(), 1);
        let typed = OperationDescriptor::new("save").declared_in("AuditRepository");
        assert!(table.resolve(&typed).rollback_classes().is_empty());
    }

    #[test]
    fn test_descriptor_display() {
        assert_eq!(OperationDescriptor::new("save").declared_in("Repo").to_string(), "Repo::save");
        assert_eq!(OperationDescriptor::new("save").to_string(), "save");
    }
}
