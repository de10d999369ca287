//! LDAP client implementation of [`Directory`]

use crate::dn::{escape_dn_value, is_dn, location_to_dn, split_dn};
use crate::ldap::account::*;
use adgate_core::config::DirectoryConfig;
use adgate_core::types::{entry_dn, entry_from_attrs, first_attr, Entry, NewGroup, NewOu, NewUser, UserUpdate};
use adgate_core::{Directory, DirectoryError, DirectoryResult, QueryOptions};
use async_trait::async_trait;
use ldap3::{ldap_escape, Ldap, LdapConnAsync, LdapConnSettings, LdapError, Mod, Scope, SearchEntry};
use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

const USER_FILTER: &str = "(&(objectCategory=person)(objectClass=user))";
const GROUP_FILTER: &str = "(objectClass=group)";
const OU_FILTER: &str = "(objectClass=organizationalUnit)";
const OTHER_FILTER: &str = "(!(|(&(objectCategory=person)(objectClass=user))(objectClass=group)(objectClass=organizationalUnit)))";

/// LDAP_MATCHING_RULE_IN_CHAIN, resolves nested group membership server-side
const IN_CHAIN: &str = "1.2.840.113556.1.4.1941";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    User,
    Group,
    Ou,
}

impl Kind {
    fn label(self) -> &'static str {
        match self {
            Kind::User => "user",
            Kind::Group => "group",
            Kind::Ou => "organizational unit",
        }
    }

    /// Filter locating a single object by its name
    fn name_filter(self, name: &str) -> String {
        let name = ldap_escape(name);
        match self {
            Kind::User => format!(
                "(&{}(|(sAMAccountName={name})(userPrincipalName={name})))",
                USER_FILTER
            ),
            Kind::Group => format!("(&{}(|(cn={name})(sAMAccountName={name})))", GROUP_FILTER),
            Kind::Ou => format!("(&{}(ou={name}))", OU_FILTER),
        }
    }
}

fn no_attrs() -> Vec<String> {
    vec!["1.1".to_string()]
}

fn all_attrs() -> Vec<String> {
    vec!["*".to_string()]
}

fn attr(name: &str, value: &str) -> (String, HashSet<String>) {
    (name.to_string(), HashSet::from([value.to_string()]))
}

fn attr_set(name: &str, values: &[&str]) -> (String, HashSet<String>) {
    (
        name.to_string(),
        values.iter().map(|v| v.to_string()).collect(),
    )
}

/// Replace an attribute; an empty value clears it
fn replace(name: &str, value: &str) -> Mod<String> {
    let values = if value.is_empty() {
        HashSet::new()
    } else {
        HashSet::from([value.to_string()])
    };
    Mod::Replace(name.to_string(), values)
}

fn ldap_error(e: LdapError) -> DirectoryError {
    match e {
        LdapError::LdapResult { result } => from_result_code(result.rc, &result.text),
        LdapError::FilterParsing => DirectoryError::InvalidInput("Invalid search filter".to_string()),
        other => DirectoryError::Unavailable(other.to_string()),
    }
}

fn to_entry(entry: SearchEntry) -> Entry {
    entry_from_attrs(&entry.dn, entry.attrs)
}

/// Active Directory accessed over LDAP
pub struct LdapDirectory {
    config: DirectoryConfig,
}

impl LdapDirectory {
    pub fn new(config: DirectoryConfig) -> Self {
        Self { config }
    }

    /// Parent DN for new users and groups without a location
    fn default_container(&self) -> String {
        if self.config.users_container.is_empty() {
            self.config.base_dn.clone()
        } else {
            format!("{},{}", self.config.users_container, self.config.base_dn)
        }
    }

    fn parent_dn(&self, location: Option<&str>, default: String) -> String {
        match location.map(str::trim).filter(|l| !l.is_empty()) {
            Some(location) => location_to_dn(location, &self.config.base_dn),
            None => default,
        }
    }

    fn require_secure(&self) -> DirectoryResult<()> {
        if self.config.is_secure() {
            Ok(())
        } else {
            Err(DirectoryError::InvalidInput(
                "Password changes require an encrypted connection (ldaps:// or STARTTLS)".to_string(),
            ))
        }
    }

    /// Open a connection without binding
    async fn open(&self) -> DirectoryResult<Ldap> {
        let settings = LdapConnSettings::new()
            .set_conn_timeout(Duration::from_secs(self.config.timeout_seconds))
            .set_starttls(self.config.start_tls);

        debug!("Connecting to LDAP server: {}", self.config.url);

        let (conn, ldap) = LdapConnAsync::with_settings(settings, &self.config.url)
            .await
            .map_err(|e| DirectoryError::Unavailable(format!("Failed to connect to LDAP server: {}", e)))?;

        ldap3::drive!(conn);
        Ok(ldap)
    }

    /// Open a connection bound as the service account
    async fn connect(&self) -> DirectoryResult<Ldap> {
        let mut ldap = self.open().await?;

        let result = ldap
            .simple_bind(&self.config.bind_dn, &self.config.bind_password)
            .await
            .map_err(|e| DirectoryError::Unavailable(format!("Service bind failed: {}", e)))?;

        if result.rc != 0 {
            let _ = ldap.unbind().await;
            warn!(rc = result.rc, "Service account bind failed");
            return Err(DirectoryError::Unavailable(format!(
                "Service account bind failed with code: {}",
                result.rc
            )));
        }

        Ok(ldap)
    }

    /// Run `op` on a service-bound connection, unbinding afterwards
    async fn with_connection<T, F, Fut>(&self, op: F) -> DirectoryResult<T>
    where
        T: Send,
        F: FnOnce(Ldap) -> Fut + Send,
        Fut: Future<Output = DirectoryResult<T>> + Send,
    {
        let mut ldap = self.connect().await?;
        let result = op(ldap.clone()).await;
        let _ = ldap.unbind().await;
        result
    }

    async fn search(
        &self,
        ldap: &mut Ldap,
        base: &str,
        scope: Scope,
        filter: &str,
        attrs: Vec<String>,
    ) -> DirectoryResult<Vec<Entry>> {
        debug!(base, filter, "LDAP search");

        let (rs, _res) = ldap
            .search(base, scope, filter, attrs)
            .await
            .map_err(ldap_error)?
            .success()
            .map_err(ldap_error)?;

        Ok(rs
            .into_iter()
            .filter(|r| !r.is_ref())
            .map(SearchEntry::construct)
            .map(to_entry)
            .collect())
    }

    async fn find_entry(
        &self,
        ldap: &mut Ldap,
        kind: Kind,
        name: &str,
        attrs: Vec<String>,
    ) -> DirectoryResult<Option<Entry>> {
        // OUs may also be addressed by DN
        if kind == Kind::Ou && is_dn(name) {
            return match self.search(ldap, name, Scope::Base, OU_FILTER, attrs).await {
                Ok(entries) => Ok(entries.into_iter().next()),
                Err(DirectoryError::Status { status: 404, .. }) => Ok(None),
                Err(e) => Err(e),
            };
        }

        let filter = kind.name_filter(name);
        let entries = self
            .search(ldap, &self.config.base_dn, Scope::Subtree, &filter, attrs)
            .await?;
        Ok(entries.into_iter().next())
    }

    async fn find_dn(&self, ldap: &mut Ldap, kind: Kind, name: &str) -> DirectoryResult<Option<String>> {
        Ok(self
            .find_entry(ldap, kind, name, no_attrs())
            .await?
            .and_then(|e| entry_dn(&e).map(String::from)))
    }

    async fn require_dn(&self, ldap: &mut Ldap, kind: Kind, name: &str) -> DirectoryResult<String> {
        self.find_dn(ldap, kind, name)
            .await?
            .ok_or_else(|| DirectoryError::not_found(kind.label(), name))
    }

    async fn modify(&self, ldap: &mut Ldap, dn: &str, mods: Vec<Mod<String>>) -> DirectoryResult<()> {
        ldap.modify(dn, mods)
            .await
            .map_err(ldap_error)?
            .success()
            .map_err(ldap_error)?;
        Ok(())
    }

    async fn write_password(&self, ldap: &mut Ldap, dn: &str, password: &str) -> DirectoryResult<()> {
        self.require_secure()?;
        let encoded = encode_ad_password(password)?;
        let mods = vec![Mod::Replace(b"unicodePwd".to_vec(), HashSet::from([encoded]))];

        ldap.modify(dn, mods)
            .await
            .map_err(ldap_error)?
            .success()
            .map_err(ldap_error)?;
        Ok(())
    }

    async fn read_uac(&self, ldap: &mut Ldap, dn: &str) -> DirectoryResult<u32> {
        let entries = self
            .search(
                ldap,
                dn,
                Scope::Base,
                "(objectClass=*)",
                vec!["userAccountControl".to_string()],
            )
            .await?;

        entries
            .first()
            .and_then(|e| first_attr(e, "userAccountControl"))
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| DirectoryError::Backend(format!("No userAccountControl on {}", dn)))
    }

    async fn set_account_flag(&self, user: &str, flag: u32, set: bool) -> DirectoryResult<()> {
        self.with_connection(move |mut ldap| async move {
            let dn = self.require_dn(&mut ldap, Kind::User, user).await?;
            let current = self.read_uac(&mut ldap, &dn).await?;
            let uac = with_flag(current, flag, set);

            if uac != current {
                self.modify(&mut ldap, &dn, vec![replace("userAccountControl", &uac.to_string())])
                    .await?;
                info!(user, uac, "Updated userAccountControl");
            }
            Ok(())
        })
        .await
    }

    async fn list(&self, class_filter: &str, query: &QueryOptions) -> DirectoryResult<Vec<Entry>> {
        let filter = query.combine_filter(class_filter);

        self.with_connection(move |mut ldap| async move {
            let entries = self
                .search(
                    &mut ldap,
                    &self.config.base_dn,
                    Scope::Subtree,
                    &filter,
                    query.requested_attributes(),
                )
                .await?;
            Ok(query.apply(entries))
        })
        .await
    }

    async fn get(&self, kind: Kind, name: &str, query: &QueryOptions) -> DirectoryResult<Entry> {
        self.with_connection(move |mut ldap| async move {
            self.find_entry(&mut ldap, kind, name, query.requested_attributes())
                .await?
                .map(|e| query.project(e))
                .ok_or_else(|| DirectoryError::not_found(kind.label(), name))
        })
        .await
    }

    async fn exists(&self, kind: Kind, name: &str) -> DirectoryResult<bool> {
        self.with_connection(move |mut ldap| async move {
            Ok(self.find_dn(&mut ldap, kind, name).await?.is_some())
        })
        .await
    }

    async fn remove(&self, kind: Kind, name: &str) -> DirectoryResult<()> {
        self.with_connection(move |mut ldap| async move {
            let dn = self.require_dn(&mut ldap, kind, name).await?;
            ldap.delete(&dn)
                .await
                .map_err(ldap_error)?
                .success()
                .map_err(ldap_error)?;
            info!(dn = %dn, "Deleted {}", kind.label());
            Ok(())
        })
        .await
    }

    async fn change_membership(&self, user: &str, group: &str, add: bool) -> DirectoryResult<()> {
        self.with_connection(move |mut ldap| async move {
            let user_dn = self.require_dn(&mut ldap, Kind::User, user).await?;
            let group_dn = self.require_dn(&mut ldap, Kind::Group, group).await?;

            let values = HashSet::from([user_dn]);
            let change = if add {
                Mod::Add("member".to_string(), values)
            } else {
                Mod::Delete("member".to_string(), values)
            };

            let result = ldap.modify(&group_dn, vec![change]).await.map_err(ldap_error)?;
            match result.rc {
                0 => {
                    info!(user, group, add, "Changed group membership");
                    Ok(())
                }
                // attributeOrValueExists / noSuchAttribute: already as requested
                20 if add => Ok(()),
                16 if !add => Ok(()),
                rc => Err(from_result_code(rc, &result.text)),
            }
        })
        .await
    }
}

#[async_trait]
impl Directory for LdapDirectory {
    async fn list_users(&self, query: &QueryOptions) -> DirectoryResult<Vec<Entry>> {
        self.list(USER_FILTER, query).await
    }

    async fn add_user(&self, user: NewUser) -> DirectoryResult<Entry> {
        if user.user_name.trim().is_empty() {
            return Err(DirectoryError::InvalidInput("userName is required".to_string()));
        }
        if user.initial_password().is_some() {
            self.require_secure()?;
        }

        self.with_connection(move |mut ldap| async move {
            if self.find_dn(&mut ldap, Kind::User, &user.user_name).await?.is_some() {
                return Err(DirectoryError::already_exists("user", &user.user_name));
            }

            let parent = self.parent_dn(user.location.as_deref(), self.default_container());
            let cn = user.common_name();
            let dn = format!("CN={},{}", escape_dn_value(&cn), parent);

            // created disabled; AD refuses enabling an account before its password is set
            let mut attrs = vec![
                attr_set("objectClass", &["top", "person", "organizationalPerson", "user"]),
                attr("cn", &cn),
                attr("displayName", &cn),
                attr("sAMAccountName", &user.user_name),
                attr("userAccountControl", &new_account_uac(false, true).to_string()),
            ];
            if !self.config.domain.is_empty() {
                attrs.push(attr(
                    "userPrincipalName",
                    &format!("{}@{}", user.user_name, self.config.domain),
                ));
            }
            for (name, value) in [
                ("givenName", &user.first_name),
                ("sn", &user.last_name),
                ("mail", &user.email),
                ("title", &user.title),
                ("telephoneNumber", &user.phone),
                ("description", &user.description),
            ] {
                if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                    attrs.push(attr(name, value));
                }
            }

            ldap.add(&dn, attrs)
                .await
                .map_err(ldap_error)?
                .success()
                .map_err(ldap_error)?;
            info!(dn = %dn, "Created user");

            let password = user.initial_password();
            if let Some(password) = password {
                if let Err(e) = self.write_password(&mut ldap, &dn, password).await {
                    warn!(dn = %dn, error = %e, "Setting initial password failed, removing user");
                    let _ = ldap.delete(&dn).await;
                    return Err(e);
                }
            }

            let enabled = user.enabled.unwrap_or(password.is_some());
            let uac = new_account_uac(enabled, user.password_expires.unwrap_or(true));
            if uac != new_account_uac(false, true) {
                self.modify(&mut ldap, &dn, vec![replace("userAccountControl", &uac.to_string())])
                    .await?;
            }

            self.find_entry(&mut ldap, Kind::User, &user.user_name, all_attrs())
                .await?
                .ok_or_else(|| DirectoryError::not_found("user", &user.user_name))
        })
        .await
    }

    async fn get_user(&self, user: &str, query: &QueryOptions) -> DirectoryResult<Entry> {
        self.get(Kind::User, user, query).await
    }

    async fn user_exists(&self, user: &str) -> DirectoryResult<bool> {
        self.exists(Kind::User, user).await
    }

    async fn is_member_of(&self, user: &str, group: &str) -> DirectoryResult<bool> {
        self.with_connection(move |mut ldap| async move {
            let user_dn = self.require_dn(&mut ldap, Kind::User, user).await?;
            let group_dn = self.require_dn(&mut ldap, Kind::Group, group).await?;

            let filter = format!(
                "(&{}(memberOf:{}:={}))",
                USER_FILTER,
                IN_CHAIN,
                ldap_escape(&group_dn)
            );
            let found = self
                .search(&mut ldap, &user_dn, Scope::Base, &filter, no_attrs())
                .await?;
            Ok(!found.is_empty())
        })
        .await
    }

    async fn authenticate(&self, user: &str, password: &str) -> DirectoryResult<bool> {
        if password.is_empty() {
            return Ok(false);
        }

        let dn = self
            .with_connection(move |mut ldap| async move {
                self.find_dn(&mut ldap, Kind::User, user).await
            })
            .await?;

        let dn = match dn {
            Some(dn) => dn,
            None => {
                debug!(user, "Authentication for unknown user");
                return Ok(false);
            }
        };

        let mut ldap = self.open().await?;
        let result = ldap
            .simple_bind(&dn, password)
            .await
            .map_err(|e| DirectoryError::Unavailable(format!("User bind failed: {}", e)))?;
        let _ = ldap.unbind().await;

        match result.rc {
            0 => Ok(true),
            // invalidCredentials, also covers disabled, locked and expired accounts
            49 => {
                debug!(user, "Invalid credentials");
                Ok(false)
            }
            rc => Err(from_result_code(rc, &result.text)),
        }
    }

    async fn update_user(&self, user: &str, update: UserUpdate) -> DirectoryResult<()> {
        self.with_connection(move |mut ldap| async move {
            let dn = self.require_dn(&mut ldap, Kind::User, user).await?;

            let mut mods: Vec<Mod<String>> = update
                .attribute_changes()
                .into_iter()
                .map(|(name, value)| replace(name, value))
                .collect();

            if update.enabled.is_some() || update.password_expires.is_some() {
                let current = self.read_uac(&mut ldap, &dn).await?;
                let mut uac = current;
                if let Some(enabled) = update.enabled {
                    uac = with_flag(uac, ACCOUNTDISABLE, !enabled);
                }
                if let Some(expires) = update.password_expires {
                    uac = with_flag(uac, DONT_EXPIRE_PASSWORD, !expires);
                }
                if uac != current {
                    mods.push(replace("userAccountControl", &uac.to_string()));
                }
            }

            if mods.is_empty() {
                debug!(user, "Nothing to update");
                return Ok(());
            }

            self.modify(&mut ldap, &dn, mods).await?;
            info!(user, "Updated user");
            Ok(())
        })
        .await
    }

    async fn set_password(&self, user: &str, password: &str) -> DirectoryResult<()> {
        self.require_secure()?;
        encode_ad_password(password)?;

        self.with_connection(move |mut ldap| async move {
            let dn = self.require_dn(&mut ldap, Kind::User, user).await?;
            self.write_password(&mut ldap, &dn, password).await?;
            info!(user, "Password changed");
            Ok(())
        })
        .await
    }

    async fn set_password_never_expires(&self, user: &str) -> DirectoryResult<()> {
        self.set_account_flag(user, DONT_EXPIRE_PASSWORD, true).await
    }

    async fn set_password_expires(&self, user: &str) -> DirectoryResult<()> {
        self.set_account_flag(user, DONT_EXPIRE_PASSWORD, false).await
    }

    async fn enable_user(&self, user: &str) -> DirectoryResult<()> {
        self.set_account_flag(user, ACCOUNTDISABLE, false).await
    }

    async fn disable_user(&self, user: &str) -> DirectoryResult<()> {
        self.set_account_flag(user, ACCOUNTDISABLE, true).await
    }

    async fn move_user(&self, user: &str, location: &str) -> DirectoryResult<()> {
        if location.trim().is_empty() {
            return Err(DirectoryError::InvalidInput("location is required".to_string()));
        }

        self.with_connection(move |mut ldap| async move {
            let dn = self.require_dn(&mut ldap, Kind::User, user).await?;
            let (rdn, _) = split_dn(&dn);
            let target = location_to_dn(location, &self.config.base_dn);

            ldap.modifydn(&dn, rdn, true, Some(target.as_str()))
                .await
                .map_err(ldap_error)?
                .success()
                .map_err(ldap_error)?;
            info!(user, target = %target, "Moved user");
            Ok(())
        })
        .await
    }

    async fn unlock_user(&self, user: &str) -> DirectoryResult<()> {
        self.with_connection(move |mut ldap| async move {
            let dn = self.require_dn(&mut ldap, Kind::User, user).await?;
            self.modify(&mut ldap, &dn, vec![replace("lockoutTime", "0")]).await?;
            info!(user, "Unlocked user");
            Ok(())
        })
        .await
    }

    async fn remove_user(&self, user: &str) -> DirectoryResult<()> {
        self.remove(Kind::User, user).await
    }

    async fn add_user_to_group(&self, user: &str, group: &str) -> DirectoryResult<()> {
        self.change_membership(user, group, true).await
    }

    async fn remove_user_from_group(&self, user: &str, group: &str) -> DirectoryResult<()> {
        self.change_membership(user, group, false).await
    }

    async fn list_groups(&self, query: &QueryOptions) -> DirectoryResult<Vec<Entry>> {
        self.list(GROUP_FILTER, query).await
    }

    async fn add_group(&self, group: NewGroup) -> DirectoryResult<Entry> {
        if group.name.trim().is_empty() {
            return Err(DirectoryError::InvalidInput("name is required".to_string()));
        }

        self.with_connection(move |mut ldap| async move {
            if self.find_dn(&mut ldap, Kind::Group, &group.name).await?.is_some() {
                return Err(DirectoryError::already_exists("group", &group.name));
            }

            let parent = self.parent_dn(group.location.as_deref(), self.default_container());
            let dn = format!("CN={},{}", escape_dn_value(&group.name), parent);

            let mut attrs = vec![
                attr_set("objectClass", &["top", "group"]),
                attr("cn", &group.name),
                attr("sAMAccountName", &group.name),
            ];
            if let Some(description) = group.description.as_deref().filter(|d| !d.is_empty()) {
                attrs.push(attr("description", description));
            }

            ldap.add(&dn, attrs)
                .await
                .map_err(ldap_error)?
                .success()
                .map_err(ldap_error)?;
            info!(dn = %dn, "Created group");

            self.find_entry(&mut ldap, Kind::Group, &group.name, all_attrs())
                .await?
                .ok_or_else(|| DirectoryError::not_found("group", &group.name))
        })
        .await
    }

    async fn get_group(&self, group: &str, query: &QueryOptions) -> DirectoryResult<Entry> {
        self.get(Kind::Group, group, query).await
    }

    async fn group_exists(&self, group: &str) -> DirectoryResult<bool> {
        self.exists(Kind::Group, group).await
    }

    async fn remove_group(&self, group: &str) -> DirectoryResult<()> {
        self.remove(Kind::Group, group).await
    }

    async fn list_ous(&self, query: &QueryOptions) -> DirectoryResult<Vec<Entry>> {
        self.list(OU_FILTER, query).await
    }

    async fn add_ou(&self, ou: NewOu) -> DirectoryResult<Entry> {
        if ou.name.trim().is_empty() {
            return Err(DirectoryError::InvalidInput("name is required".to_string()));
        }

        self.with_connection(move |mut ldap| async move {
            let parent = self.parent_dn(ou.location.as_deref(), self.config.base_dn.clone());
            let dn = format!("OU={},{}", escape_dn_value(&ou.name), parent);

            if self.find_dn(&mut ldap, Kind::Ou, &dn).await?.is_some() {
                return Err(DirectoryError::already_exists("organizational unit", &ou.name));
            }

            let mut attrs = vec![
                attr_set("objectClass", &["top", "organizationalUnit"]),
                attr("ou", &ou.name),
            ];
            if let Some(description) = ou.description.as_deref().filter(|d| !d.is_empty()) {
                attrs.push(attr("description", description));
            }

            ldap.add(&dn, attrs)
                .await
                .map_err(ldap_error)?
                .success()
                .map_err(ldap_error)?;
            info!(dn = %dn, "Created organizational unit");

            self.find_entry(&mut ldap, Kind::Ou, &dn, all_attrs())
                .await?
                .ok_or_else(|| DirectoryError::not_found("organizational unit", &ou.name))
        })
        .await
    }

    async fn get_ou(&self, ou: &str, query: &QueryOptions) -> DirectoryResult<Entry> {
        self.get(Kind::Ou, ou, query).await
    }

    async fn ou_exists(&self, ou: &str) -> DirectoryResult<bool> {
        self.exists(Kind::Ou, ou).await
    }

    async fn remove_ou(&self, ou: &str) -> DirectoryResult<()> {
        self.remove(Kind::Ou, ou).await
    }

    async fn list_other(&self, query: &QueryOptions) -> DirectoryResult<Vec<Entry>> {
        self.list(OTHER_FILTER, query).await
    }

    async fn find(&self, filter: &str, query: &QueryOptions) -> DirectoryResult<Vec<Entry>> {
        let filter = filter.trim();
        if filter.is_empty() {
            return Err(DirectoryError::InvalidInput("Search filter is required".to_string()));
        }

        let filter = if filter.starts_with('(') {
            filter.to_string()
        } else {
            format!("({})", filter)
        };
        self.list(&filter, query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directory() -> LdapDirectory {
        LdapDirectory::new(DirectoryConfig {
            url: "ldap://dc.example.com:389".to_string(),
            base_dn: "DC=example,DC=com".to_string(),
            ..Default::default()
        })
    }

    #[test]
    fn test_name_filters() {
        assert_eq!(
            Kind::User.name_filter("jdoe"),
            "(&(&(objectCategory=person)(objectClass=user))(|(sAMAccountName=jdoe)(userPrincipalName=jdoe)))"
        );
        assert_eq!(
            Kind::Group.name_filter("ops*"),
            "(&(objectClass=group)(|(cn=ops\\2a)(sAMAccountName=ops\\2a)))"
        );
        assert_eq!(
            Kind::Ou.name_filter("a(b)"),
            "(&(objectClass=organizationalUnit)(ou=a\\28b\\29))"
        );
    }

    #[test]
    fn test_parent_dn() {
        let directory = directory();
        assert_eq!(directory.default_container(), "CN=Users,DC=example,DC=com");
        assert_eq!(
            directory.parent_dn(Some("Sales"), directory.default_container()),
            "OU=Sales,DC=example,DC=com"
        );
        assert_eq!(
            directory.parent_dn(Some("  "), directory.default_container()),
            "CN=Users,DC=example,DC=com"
        );
    }

    #[test]
    fn test_password_requires_encryption() {
        assert!(directory().require_secure().is_err());

        let secure = LdapDirectory::new(DirectoryConfig {
            url: "ldaps://dc.example.com:636".to_string(),
            ..Default::default()
        });
        assert!(secure.require_secure().is_ok());
    }

    #[test]
    fn test_replace_empty_clears() {
        match replace("title", "") {
            Mod::Replace(name, values) => {
                assert_eq!(name, "title");
                assert!(values.is_empty());
            }
            _ => panic!("expected replace"),
        }
    }

    #[tokio::test]
    async fn test_unreachable_server_is_unavailable() {
        let directory = LdapDirectory::new(DirectoryConfig {
            url: "ldap://127.0.0.1:1".to_string(),
            base_dn: "DC=example,DC=com".to_string(),
            timeout_seconds: 1,
            ..Default::default()
        });

        let err = directory.user_exists("jdoe").await.unwrap_err();
        assert!(matches!(err, DirectoryError::Unavailable(_)));
        assert_eq!(err.status_hint(), None);
    }
}
