//! Connection configuration for the graph client.

use crate::common::{DRIVER_PROPERTY, PASSWORD_PROPERTY, URI_PROPERTY, USERNAME_PROPERTY};
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};

/// Connection settings handed to the driver when the session factory is built.
///
/// Values are opaque to the persistence core: nothing here is validated beyond
/// reading it, the driver decides what it needs.
///
/// # Examples
///
/// ```rust
/// use graphpersist::PersistConfig;
/// use std::collections::HashMap;
///
/// let mut properties = HashMap::new();
/// properties.insert("neo4j.ogm.driver".to_string(), "memory".to_string());
/// properties.insert("neo4j.ogm.url".to_string(), "bolt://localhost:7687".to_string());
///
/// let config = PersistConfig::from_properties(&properties);
/// assert_eq!(config.driver(), Some("memory"));
/// assert_eq!(config.uri(), Some("bolt://localhost:7687"));
/// assert_eq!(config.username(), None);
/// ```
#[derive(Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PersistConfig {
    driver: Option<String>,
    uri: Option<String>,
    username: Option<String>,
    password: Option<String>,
}

impl PersistConfig {
    /// Creates an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the `neo4j.ogm.*` connection keys from a properties map.
    ///
    /// Unknown keys are ignored and missing keys stay unset.
    pub fn from_properties(properties: &HashMap<String, String>) -> Self {
        PersistConfig {
            driver: properties.get(DRIVER_PROPERTY).cloned(),
            uri: properties.get(URI_PROPERTY).cloned(),
            username: properties.get(USERNAME_PROPERTY).cloned(),
            password: properties.get(PASSWORD_PROPERTY).cloned(),
        }
    }

    /// Writes the configured values back as `neo4j.ogm.*` properties.
    pub fn to_properties(&self) -> HashMap<String, String> {
        let mut properties = HashMap::new();
        let entries = [
            (DRIVER_PROPERTY, &self.driver),
            (URI_PROPERTY, &self.uri),
            (USERNAME_PROPERTY, &self.username),
            (PASSWORD_PROPERTY, &self.password),
        ];
        for (key, value) in entries {
            if let Some(value) = value {
                properties.insert(key.to_string(), value.clone());
            }
        }
        properties
    }

    pub fn with_driver(mut self, driver: &str) -> Self {
        self.driver = Some(driver.to_string());
        self
    }

    pub fn with_uri(mut self, uri: &str) -> Self {
        self.uri = Some(uri.to_string());
        self
    }

    pub fn with_credentials(mut self, username: &str, password: &str) -> Self {
        self.username = Some(username.to_string());
        self.password = Some(password.to_string());
        self
    }

    /// Driver identifier, e.g. `memory` or a bolt driver name.
    pub fn driver(&self) -> Option<&str> {
        self.driver.as_deref()
    }

    /// Connection URI of the graph server.
    pub fn uri(&self) -> Option<&str> {
        self.uri.as_deref()
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// Fills unset values from `other`.
    pub fn merge(mut self, other: &PersistConfig) -> Self {
        if self.driver.is_none() {
            self.driver = other.driver.clone();
        }
        if self.uri.is_none() {
            self.uri = other.uri.clone();
        }
        if self.username.is_none() {
            self.username = other.username.clone();
        }
        if self.password.is_none() {
            self.password = other.password.clone();
        }
        self
    }
}

impl Debug for PersistConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistConfig")
            .field("driver", &self.driver)
            .field("uri", &self.uri)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn properties() -> HashMap<String, String> {
        let mut properties = HashMap::new();
        properties.insert(DRIVER_PROPERTY.to_string(), "bolt".to_string());
        properties.insert(URI_PROPERTY.to_string(), "bolt://db:7687".to_string());
        properties.insert(USERNAME_PROPERTY.to_string(), "neo4j".to_string());
        properties.insert(PASSWORD_PROPERTY.to_string(), "secret".to_string());
        properties
    }

    #[test]
    fn test_from_properties_reads_all_keys() {
        let config = PersistConfig::from_properties(&properties());
        assert_eq!(config.driver(), Some("bolt"));
        assert_eq!(config.uri(), Some("bolt://db:7687"));
        assert_eq!(config.username(), Some("neo4j"));
        assert_eq!(config.password(), Some("secret"));
    }

    #[test]
    fn test_from_empty_properties() {
        let config = PersistConfig::from_properties(&HashMap::new());
        assert_eq!(config, PersistConfig::new());
    }

    #[test]
    fn test_to_properties_skips_unset() {
        let config = PersistConfig::new().with_uri("bolt://db:7687");
        let properties = config.to_properties();
        assert_eq!(properties.len(), 1);
        assert_eq!(properties.get(URI_PROPERTY).map(String::as_str), Some("bolt://db:7687"));
    }

    #[test]
    fn test_properties_survive_a_trip() {
        let config = PersistConfig::from_properties(&properties());
        assert_eq!(PersistConfig::from_properties(&config.to_properties()), config);
    }

    #[test]
    fn test_merge_keeps_explicit_values() {
        let explicit = PersistConfig::new().with_driver("memory");
        let merged = explicit.merge(&PersistConfig::from_properties(&properties()));
        assert_eq!(merged.driver(), Some("memory"));
        assert_eq!(merged.uri(), Some("bolt://db:7687"));
        assert_eq!(merged.username(), Some("neo4j"));
    }

    #[test]
    fn test_debug_hides_password() {
        let config = PersistConfig::new().with_credentials("neo4j", "secret");
        let formatted = format!("{:?}", config);
        assert!(formatted.contains("neo4j"));
        assert!(!formatted.contains("secret"));
    }
}
