//! Active Directory over LDAP
//!
//! Every operation opens a connection, binds with the service account and
//! unbinds when done. Password writes need an encrypted connection (LDAPS or
//! STARTTLS), which AD enforces for `unicodePwd`.

mod account;
mod client;

pub use account::*;
pub use client::LdapDirectory;
