use crate::client::{GraphDriver, GraphDriverProvider};
use crate::common::CONNECTION_PROPERTIES;
use crate::errors::{ErrorKind, PersistError, PersistResult};
use crate::persist_config::PersistConfig;
use crate::transaction::{
    MetadataTable, MetadataTableBuilder, OperationDescriptor, TransactionMetadata,
    TransactionalInterceptor,
};
use crate::unit_of_work::{PersistLifecycle, PersistService, UnitOfWork};
use std::collections::HashMap;
use std::sync::Arc;

/// Assembles a [`PersistService`] and the [`TransactionalInterceptor`] that
/// shares it.
///
/// Every setter that can fail records the first error and turns the remaining
/// calls into no-ops; the error is returned from [`build`](Self::build).
///
/// # Examples
///
/// ```rust
/// use graphpersist::client::memory::MemoryDriver;
/// use graphpersist::transaction::{ErrorClass, TransactionMetadata};
/// use graphpersist::PersistModule;
/// use std::io;
///
/// let bindings = PersistModule::new()
///     .package("com.example.domain")
///     .property("neo4j.ogm.driver", "memory")
///     .driver(MemoryDriver::new())
///     .for_type(
///         "AccountRepository",
///         TransactionMetadata::new().rollback_on(ErrorClass::of::<io::Error>()),
///     )
///     .build()
///     .unwrap();
///
/// bindings.service().start().unwrap();
/// assert_eq!(bindings.service().packages(), ["com.example.domain"]);
/// ```
#[derive(Default)]
pub struct PersistModule {
    error: Option<PersistError>,
    packages: Vec<String>,
    config: PersistConfig,
    driver: Option<GraphDriver>,
    metadata: MetadataTableBuilder,
    registered: bool,
    table: Option<MetadataTable>,
}

impl PersistModule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a package the client scans for mapped entity types.
    pub fn package(mut self, package: &str) -> Self {
        self.packages.push(package.to_string());
        self
    }

    pub fn packages(mut self, packages: &[&str]) -> Self {
        self.packages.extend(packages.iter().map(|p| p.to_string()));
        self
    }

    /// Reads connection settings from a properties map.
    ///
    /// Keys present in `properties` override earlier settings.
    pub fn properties(mut self, properties: &HashMap<String, String>) -> Self {
        self.config = PersistConfig::from_properties(properties).merge(&self.config);
        self
    }

    /// Sets a single connection property. Only the `neo4j.ogm.*` connection
    /// keys are accepted.
    pub fn property(mut self, key: &str, value: &str) -> Self {
        if self.error.is_some() {
            return self;
        }

        if !CONNECTION_PROPERTIES.contains(&key) {
            log::error!("Unknown connection property {}", key);
            self.error = Some(PersistError::new(
                &format!("Unknown connection property {}", key),
                ErrorKind::ConfigurationError,
            ));
            return self;
        }

        let mut properties = HashMap::new();
        properties.insert(key.to_string(), value.to_string());
        self.properties(&properties)
    }

    /// Replaces the connection settings.
    pub fn config(mut self, config: PersistConfig) -> Self {
        self.config = config;
        self
    }

    pub fn driver<D: GraphDriverProvider + 'static>(mut self, driver: D) -> Self {
        self.driver = Some(GraphDriver::new(driver));
        self
    }

    pub fn for_operation(mut self, operation: &OperationDescriptor, metadata: TransactionMetadata) -> Self {
        self.register_metadata();
        self.metadata = self.metadata.for_operation(operation, metadata);
        self
    }

    pub fn for_type(mut self, declaring_type: &str, metadata: TransactionMetadata) -> Self {
        self.register_metadata();
        self.metadata = self.metadata.for_type(declaring_type, metadata);
        self
    }

    pub fn default_metadata(mut self, metadata: TransactionMetadata) -> Self {
        self.register_metadata();
        self.metadata = self.metadata.default_metadata(metadata);
        self
    }

    /// Uses a prebuilt table.
    ///
    /// A module takes either a prebuilt table or individual registrations;
    /// combining them, or supplying two tables, is a configuration error.
    pub fn metadata_table(mut self, table: MetadataTable) -> Self {
        if self.error.is_none() && (self.registered || self.table.is_some()) {
            self.error = Some(mixed_metadata());
        }
        self.table = Some(table);
        self
    }

    fn register_metadata(&mut self) {
        if self.error.is_none() && self.table.is_some() {
            self.error = Some(mixed_metadata());
        }
        self.registered = true;
    }

    /// Builds the bindings. The service is returned unstarted.
    pub fn build(self) -> PersistResult<PersistBindings> {
        if let Some(error) = self.error {
            return Err(error);
        }

        let Some(driver) = self.driver else {
            log::error!("No graph driver configured");
            return Err(PersistError::new(
                "No graph driver configured",
                ErrorKind::ConfigurationError,
            ));
        };

        if let Some(configured) = self.config.driver() {
            if configured != driver.name() {
                log::error!(
                    "Configured driver {} does not match the supplied driver {}",
                    configured,
                    driver.name()
                );
                return Err(PersistError::new(
                    &format!(
                        "Configured driver {} does not match the supplied driver {}",
                        configured,
                        driver.name()
                    ),
                    ErrorKind::ConfigurationError,
                ));
            }
        }

        let table = match self.table {
            Some(table) => table,
            None => self.metadata.build()?,
        };

        let service = PersistService::with_driver(self.config, self.packages, driver);
        let interceptor = TransactionalInterceptor::new(service.clone(), table);
        Ok(PersistBindings {
            service,
            interceptor,
        })
    }
}

fn mixed_metadata() -> PersistError {
    log::error!("Transaction metadata given both as a prebuilt table and as registrations");
    PersistError::new(
        "Transaction metadata given both as a prebuilt table and as registrations",
        ErrorKind::ConfigurationError,
    )
}

/// The objects a host application wires in: the service, its unit-of-work and
/// lifecycle views, and the interceptor.
#[derive(Clone)]
pub struct PersistBindings {
    service: PersistService,
    interceptor: TransactionalInterceptor,
}

impl PersistBindings {
    pub fn service(&self) -> &PersistService {
        &self.service
    }

    pub fn interceptor(&self) -> &TransactionalInterceptor {
        &self.interceptor
    }

    pub fn unit_of_work(&self) -> Arc<dyn UnitOfWork> {
        Arc::new(self.service.clone())
    }

    pub fn lifecycle(&self) -> Arc<dyn PersistLifecycle> {
        Arc::new(self.service.clone())
    }
}
