//! Directory backends for Adgate
//!
//! - [`LdapDirectory`]: Microsoft Active Directory over LDAP/LDAPS
//! - [`MemoryDirectory`]: in-process directory for development and tests

pub mod dn;
pub mod ldap;
pub mod memory;

use adgate_core::config::{DirectoryBackend, DirectoryConfig};
use adgate_core::Directory;
use std::sync::Arc;

pub use ldap::LdapDirectory;
pub use memory::MemoryDirectory;

/// Build the backend selected in the configuration
pub fn from_config(config: &DirectoryConfig) -> Arc<dyn Directory> {
    match config.backend {
        DirectoryBackend::Ldap => Arc::new(LdapDirectory::new(config.clone())),
        DirectoryBackend::Memory => {
            let base_dn = if config.base_dn.is_empty() {
                memory::DEFAULT_BASE_DN
            } else {
                config.base_dn.as_str()
            };
            Arc::new(MemoryDirectory::new(base_dn))
        }
    }
}
