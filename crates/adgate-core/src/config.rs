//! Configuration for Adgate

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdgateConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub directory: DirectoryConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl AdgateConfig {
    pub fn from_file(path: &str) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::ConfigRead(format!("{}: {}", path, e)))?;

        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> crate::Result<Self> {
        toml::from_str(content).map_err(|e| crate::Error::ConfigParse(e.to_string()))
    }

    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Override fields from `ADGATE_*` environment variables
    pub fn apply_env(&mut self) {
        if let Ok(addr) = std::env::var("ADGATE_BIND_ADDRESS") {
            self.server.bind_address = addr;
        }
        if let Ok(port) = std::env::var("ADGATE_PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }

        if let Ok(secret) = std::env::var("ADGATE_SECRET") {
            self.auth.secret = secret;
        }
        if let Ok(algorithm) = std::env::var("ADGATE_HMAC_ALGORITHM") {
            self.auth.algorithm = algorithm;
        }
        if let Ok(header) = std::env::var("ADGATE_HMAC_HEADER") {
            self.auth.header = header;
        }
        if let Ok(identifier) = std::env::var("ADGATE_HMAC_IDENTIFIER") {
            self.auth.identifier = identifier;
        }
        if let Ok(interval) = std::env::var("ADGATE_HMAC_MAX_INTERVAL") {
            if let Ok(secs) = interval.parse() {
                self.auth.max_interval_secs = secs;
            }
        }

        if let Ok(backend) = std::env::var("ADGATE_DIRECTORY_BACKEND") {
            match backend.as_str() {
                "memory" => self.directory.backend = DirectoryBackend::Memory,
                "ldap" => self.directory.backend = DirectoryBackend::Ldap,
                _ => {}
            }
        }
        if let Ok(url) = std::env::var("ADGATE_LDAP_URL") {
            self.directory.url = url;
        }
        if let Ok(dn) = std::env::var("ADGATE_LDAP_BIND_DN") {
            self.directory.bind_dn = dn;
        }
        if let Ok(password) = std::env::var("ADGATE_LDAP_BIND_PASSWORD") {
            self.directory.bind_password = password;
        }
        if let Ok(base) = std::env::var("ADGATE_LDAP_BASE_DN") {
            self.directory.base_dn = base;
        }
        if let Ok(domain) = std::env::var("ADGATE_LDAP_DOMAIN") {
            self.directory.domain = domain;
        }

        if let Ok(level) = std::env::var("ADGATE_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("ADGATE_LOG_FORMAT") {
            self.logging.format = format;
        }
        if std::env::var("ADGATE_METRICS_ENABLED").map(|v| v == "true").unwrap_or(false) {
            self.metrics.enabled = true;
        }
    }

    pub fn validate(&self) -> crate::Result<()> {
        self.auth.validate()?;
        self.directory.validate()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    /// Largest request body buffered for signature checks
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: crate::DEFAULT_PORT,
            max_body_bytes: crate::DEFAULT_MAX_BODY_BYTES,
        }
    }
}

/// Signed-request verification settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Shared HMAC secret
    pub secret: String,
    /// Hash algorithm name (md5, sha1, sha256, sha384, sha512)
    pub algorithm: String,
    /// Header carrying the signature
    pub header: String,
    /// Prefix expected at the start of the header value
    pub identifier: String,
    /// Maximum distance between the signed timestamp and now
    pub max_interval_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            algorithm: "sha512".to_string(),
            header: "authorization".to_string(),
            identifier: "APP".to_string(),
            max_interval_secs: crate::DEFAULT_MAX_INTERVAL_SECS,
        }
    }
}

impl AuthConfig {
    pub fn validate(&self) -> crate::Result<()> {
        if self.secret.is_empty() {
            return Err(crate::Error::InvalidConfig(
                "auth.secret must be set".into(),
            ));
        }

        if !matches!(
            self.algorithm.to_ascii_lowercase().as_str(),
            "md5" | "sha1" | "sha256" | "sha384" | "sha512"
        ) {
            return Err(crate::Error::InvalidConfig(format!(
                "Unsupported HMAC algorithm: {}",
                self.algorithm
            )));
        }

        if self.header.is_empty() {
            return Err(crate::Error::InvalidConfig(
                "auth.header must not be empty".into(),
            ));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DirectoryBackend {
    /// Active Directory over LDAP
    #[default]
    Ldap,
    /// In-process directory for development
    Memory,
}

/// Directory backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    pub backend: DirectoryBackend,

    /// LDAP server URL (ldap:// or ldaps://)
    pub url: String,

    /// Service account used for all directory operations
    /// Example: "CN=svc-adgate,CN=Users,DC=example,DC=com"
    pub bind_dn: String,

    pub bind_password: String,

    /// Search base and default parent for new entries
    /// Example: "DC=example,DC=com"
    pub base_dn: String,

    /// UPN suffix for new users
    /// Example: "example.com"
    pub domain: String,

    /// Use STARTTLS for connection upgrade
    pub start_tls: bool,

    /// Connection timeout in seconds
    pub timeout_seconds: u64,

    /// Container for users created without a location, relative to base_dn
    pub users_container: String,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            backend: DirectoryBackend::default(),
            url: "ldap://localhost:389".to_string(),
            bind_dn: String::new(),
            bind_password: String::new(),
            base_dn: String::new(),
            domain: String::new(),
            start_tls: false,
            timeout_seconds: 10,
            users_container: "CN=Users".to_string(),
        }
    }
}

impl DirectoryConfig {
    pub fn validate(&self) -> crate::Result<()> {
        if self.backend == DirectoryBackend::Memory {
            return Ok(());
        }

        if !self.url.starts_with("ldap://") && !self.url.starts_with("ldaps://") {
            return Err(crate::Error::InvalidConfig(
                "directory.url must start with ldap:// or ldaps://".into(),
            ));
        }

        if self.bind_dn.is_empty() {
            return Err(crate::Error::InvalidConfig(
                "directory.bind_dn is required".into(),
            ));
        }

        if self.base_dn.is_empty() {
            return Err(crate::Error::InvalidConfig(
                "directory.base_dn is required".into(),
            ));
        }

        Ok(())
    }

    /// Whether the connection is encrypted, which AD requires for password writes
    pub fn is_secure(&self) -> bool {
        self.url.starts_with("ldaps://") || self.start_tls
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Serve Prometheus metrics at /metrics
    pub enabled: bool,
}
