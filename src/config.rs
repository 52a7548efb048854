//! Configuration management for NimbusData.
//!
//! The connection descriptor is read once from the process environment
//! (optionally seeded from a `.env` file) and shared read-only afterwards.

use std::fmt;

/// Environment variable holding the driver identifier.
pub const ENV_DRIVER: &str = "SQL_DRIVER";
/// Environment variable holding the server address.
pub const ENV_SERVER: &str = "SQL_SERVER";
/// Environment variable holding the database name.
pub const ENV_DATABASE: &str = "SQL_DATABASE";
/// Environment variable holding the user name.
pub const ENV_USERNAME: &str = "SQL_USERNAME";
/// Environment variable holding the password.
pub const ENV_PASSWORD: &str = "SQL_PASSWORD";

/// How to reach and authenticate to the store.
///
/// All fields are opaque strings; nothing is validated here. A missing or
/// malformed field makes the connection attempt fail on its own.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    driver: Option<String>,
    server: Option<String>,
    database: Option<String>,
    username: Option<String>,
    password: Option<String>,
}

impl ConnectionDescriptor {
    /// Creates a descriptor for the given driver with no other fields set.
    pub fn new(driver: impl Into<String>) -> Self {
        Self {
            driver: Some(driver.into()),
            ..Self::default()
        }
    }

    /// Sets the server address.
    pub fn with_server(mut self, server: impl Into<String>) -> Self {
        self.server = Some(server.into());
        self
    }

    /// Sets the database name (or file path for file-based stores).
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Sets the credentials.
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Builds the descriptor from `SQL_DRIVER`, `SQL_SERVER`, `SQL_DATABASE`,
    /// `SQL_USERNAME` and `SQL_PASSWORD`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the descriptor from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            driver: lookup(ENV_DRIVER),
            server: lookup(ENV_SERVER),
            database: lookup(ENV_DATABASE),
            username: lookup(ENV_USERNAME),
            password: lookup(ENV_PASSWORD),
        }
    }

    pub fn driver(&self) -> Option<&str> {
        self.driver.as_deref()
    }

    pub fn server(&self) -> Option<&str> {
        self.server.as_deref()
    }

    pub fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// Returns a display-safe string (no credentials) for logs.
    pub fn display_string(&self) -> String {
        let driver = self.driver.as_deref().unwrap_or("unknown");
        let database = self.database.as_deref().unwrap_or("unknown");
        match self.server.as_deref() {
            Some(server) => format!("{driver}: {database} @ {server}"),
            None => format!("{driver}: {database}"),
        }
    }
}

impl fmt::Debug for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionDescriptor")
            .field("driver", &self.driver)
            .field("server", &self.server)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
