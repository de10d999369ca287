//! Directory trait
//!
//! Defines the operations the HTTP layer delegates to. Implementations exist
//! for Active Directory over LDAP and for an in-process directory.

use async_trait::async_trait;

use crate::error::DirectoryResult;
use crate::query::QueryOptions;
use crate::types::{AllEntries, Entry, NewGroup, NewOu, NewUser, UserUpdate};

/// Users, groups and organizational units, addressed by name
#[async_trait]
pub trait Directory: Send + Sync {
    // User operations
    async fn list_users(&self, query: &QueryOptions) -> DirectoryResult<Vec<Entry>>;
    async fn add_user(&self, user: NewUser) -> DirectoryResult<Entry>;
    async fn get_user(&self, user: &str, query: &QueryOptions) -> DirectoryResult<Entry>;
    async fn user_exists(&self, user: &str) -> DirectoryResult<bool>;
    async fn is_member_of(&self, user: &str, group: &str) -> DirectoryResult<bool>;

    /// Check a user's password; a wrong password is `Ok(false)`, not an error
    async fn authenticate(&self, user: &str, password: &str) -> DirectoryResult<bool>;

    async fn update_user(&self, user: &str, update: UserUpdate) -> DirectoryResult<()>;
    async fn set_password(&self, user: &str, password: &str) -> DirectoryResult<()>;
    async fn set_password_never_expires(&self, user: &str) -> DirectoryResult<()>;
    async fn set_password_expires(&self, user: &str) -> DirectoryResult<()>;
    async fn enable_user(&self, user: &str) -> DirectoryResult<()>;
    async fn disable_user(&self, user: &str) -> DirectoryResult<()>;

    /// Move a user under another OU, given as a path ("Sales/EMEA") or DN
    async fn move_user(&self, user: &str, location: &str) -> DirectoryResult<()>;

    async fn unlock_user(&self, user: &str) -> DirectoryResult<()>;
    async fn remove_user(&self, user: &str) -> DirectoryResult<()>;
    async fn add_user_to_group(&self, user: &str, group: &str) -> DirectoryResult<()>;
    async fn remove_user_from_group(&self, user: &str, group: &str) -> DirectoryResult<()>;

    // Group operations
    async fn list_groups(&self, query: &QueryOptions) -> DirectoryResult<Vec<Entry>>;
    async fn add_group(&self, group: NewGroup) -> DirectoryResult<Entry>;
    async fn get_group(&self, group: &str, query: &QueryOptions) -> DirectoryResult<Entry>;
    async fn group_exists(&self, group: &str) -> DirectoryResult<bool>;
    async fn remove_group(&self, group: &str) -> DirectoryResult<()>;

    // Organizational unit operations
    async fn list_ous(&self, query: &QueryOptions) -> DirectoryResult<Vec<Entry>>;
    async fn add_ou(&self, ou: NewOu) -> DirectoryResult<Entry>;
    async fn get_ou(&self, ou: &str, query: &QueryOptions) -> DirectoryResult<Entry>;
    async fn ou_exists(&self, ou: &str) -> DirectoryResult<bool>;
    async fn remove_ou(&self, ou: &str) -> DirectoryResult<()>;

    /// Objects that are neither users, groups nor OUs
    async fn list_other(&self, query: &QueryOptions) -> DirectoryResult<Vec<Entry>>;

    async fn list_all(&self, query: &QueryOptions) -> DirectoryResult<AllEntries> {
        Ok(AllEntries {
            users: self.list_users(query).await?,
            groups: self.list_groups(query).await?,
            ous: self.list_ous(query).await?,
            other: self.list_other(query).await?,
        })
    }

    /// Search the whole directory with a raw LDAP-style filter
    async fn find(&self, filter: &str, query: &QueryOptions) -> DirectoryResult<Vec<Entry>>;
}
