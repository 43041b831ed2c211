// connection property keys
pub const DRIVER_PROPERTY: &str = "neo4j.ogm.driver";
pub const URI_PROPERTY: &str = "neo4j.ogm.url";
pub const USERNAME_PROPERTY: &str = "neo4j.ogm.username";
pub const PASSWORD_PROPERTY: &str = "neo4j.ogm.password";

pub const CONNECTION_PROPERTIES: [&str; 4] = [
    DRIVER_PROPERTY,
    URI_PROPERTY,
    USERNAME_PROPERTY,
    PASSWORD_PROPERTY,
];

// driver constants
pub const MEMORY_DRIVER: &str = "memory";
