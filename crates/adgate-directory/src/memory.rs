//! In-process directory
//!
//! Mirrors the observable behavior of the LDAP backend closely enough to run
//! the gateway without a domain controller.

use crate::dn::{dn_eq, escape_dn_value, is_descendant, is_dn, location_to_dn, split_dn};
use crate::ldap::{new_account_uac, with_flag, ACCOUNTDISABLE, DONT_EXPIRE_PASSWORD};
use adgate_core::types::{entry_from_attrs, Entry, NewGroup, NewOu, NewUser, UserUpdate};
use adgate_core::query::is_attribute_name;
use adgate_core::{Directory, DirectoryError, DirectoryResult, QueryOptions};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

pub const DEFAULT_BASE_DN: &str = "DC=adgate,DC=local";

const USERS_CONTAINER: &str = "CN=Users";

#[derive(Debug, Clone)]
struct UserRecord {
    dn: String,
    user_name: String,
    cn: String,
    first_name: Option<String>,
    last_name: Option<String>,
    display_name: Option<String>,
    email: Option<String>,
    title: Option<String>,
    phone: Option<String>,
    description: Option<String>,
    password: Option<String>,
    uac: u32,
    locked: bool,
}

#[derive(Debug, Clone)]
struct GroupRecord {
    dn: String,
    name: String,
    description: Option<String>,
    /// Lowercased user names
    members: BTreeSet<String>,
}

#[derive(Debug, Clone)]
struct OuRecord {
    dn: String,
    name: String,
    description: Option<String>,
}

#[derive(Debug, Default)]
struct State {
    users: BTreeMap<String, UserRecord>,
    groups: BTreeMap<String, GroupRecord>,
    /// Keyed by lowercased DN
    ous: BTreeMap<String, OuRecord>,
}

fn key(name: &str) -> String {
    name.to_lowercase()
}

fn push(attrs: &mut Vec<(String, Vec<String>)>, name: &str, value: Option<&String>) {
    if let Some(value) = value.filter(|v| !v.is_empty()) {
        attrs.push((name.to_string(), vec![value.clone()]));
    }
}

fn classes(names: &[&str]) -> (String, Vec<String>) {
    (
        "objectClass".to_string(),
        names.iter().map(|n| n.to_string()).collect(),
    )
}

impl State {
    fn user_entry(&self, user: &UserRecord) -> Entry {
        let user_key = key(&user.user_name);
        let member_of: Vec<String> = self
            .groups
            .values()
            .filter(|g| g.members.contains(&user_key))
            .map(|g| g.dn.clone())
            .collect();

        let mut attrs = vec![
            classes(&["top", "person", "organizationalPerson", "user"]),
            ("cn".to_string(), vec![user.cn.clone()]),
            ("sAMAccountName".to_string(), vec![user.user_name.clone()]),
            ("userAccountControl".to_string(), vec![user.uac.to_string()]),
            (
                "lockoutTime".to_string(),
                vec![if user.locked { "1" } else { "0" }.to_string()],
            ),
            ("memberOf".to_string(), member_of),
        ];
        push(&mut attrs, "givenName", user.first_name.as_ref());
        push(&mut attrs, "sn", user.last_name.as_ref());
        push(&mut attrs, "displayName", user.display_name.as_ref());
        push(&mut attrs, "mail", user.email.as_ref());
        push(&mut attrs, "title", user.title.as_ref());
        push(&mut attrs, "telephoneNumber", user.phone.as_ref());
        push(&mut attrs, "description", user.description.as_ref());

        entry_from_attrs(&user.dn, attrs)
    }

    fn group_entry(&self, group: &GroupRecord) -> Entry {
        let members: Vec<String> = group
            .members
            .iter()
            .filter_map(|m| self.users.get(m))
            .map(|u| u.dn.clone())
            .collect();

        let mut attrs = vec![
            classes(&["top", "group"]),
            ("cn".to_string(), vec![group.name.clone()]),
            ("sAMAccountName".to_string(), vec![group.name.clone()]),
            ("member".to_string(), members),
        ];
        push(&mut attrs, "description", group.description.as_ref());

        entry_from_attrs(&group.dn, attrs)
    }

    fn ou_entry(&self, ou: &OuRecord) -> Entry {
        let mut attrs = vec![
            classes(&["top", "organizationalUnit"]),
            ("ou".to_string(), vec![ou.name.clone()]),
        ];
        push(&mut attrs, "description", ou.description.as_ref());

        entry_from_attrs(&ou.dn, attrs)
    }

    fn find_ou(&self, name: &str) -> Option<&OuRecord> {
        if is_dn(name) {
            return self.ous.values().find(|ou| dn_eq(&ou.dn, name));
        }
        self.ous.values().find(|ou| ou.name.eq_ignore_ascii_case(name))
    }

    fn user_mut(&mut self, user: &str) -> DirectoryResult<&mut UserRecord> {
        self.users
            .get_mut(&key(user))
            .ok_or_else(|| DirectoryError::not_found("user", user))
    }

    fn all_entries(&self) -> Vec<Entry> {
        let users = self.users.values().map(|u| self.user_entry(u));
        let groups = self.groups.values().map(|g| self.group_entry(g));
        let ous = self.ous.values().map(|o| self.ou_entry(o));
        users.chain(groups).chain(ous).collect()
    }
}

/// Directory held in memory
pub struct MemoryDirectory {
    base_dn: String,
    state: RwLock<State>,
}

impl Default for MemoryDirectory {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_DN)
    }
}

impl MemoryDirectory {
    pub fn new(base_dn: impl Into<String>) -> Self {
        Self {
            base_dn: base_dn.into(),
            state: RwLock::new(State::default()),
        }
    }

    pub fn base_dn(&self) -> &str {
        &self.base_dn
    }

    /// Mark an account as locked out, as repeated failed logons would
    pub fn lock_user(&self, user: &str) -> DirectoryResult<()> {
        self.state.write().user_mut(user)?.locked = true;
        Ok(())
    }

    /// Resolve a location to an existing parent DN
    fn resolve_parent(&self, state: &State, location: Option<&str>, default: String) -> DirectoryResult<String> {
        let location = match location.map(str::trim).filter(|l| !l.is_empty()) {
            Some(location) => location,
            None => return Ok(default),
        };

        let dn = location_to_dn(location, &self.base_dn);
        if dn_eq(&dn, &self.base_dn) || state.ous.contains_key(&key(&dn)) {
            Ok(dn)
        } else {
            Err(DirectoryError::not_found("organizational unit", location))
        }
    }

    fn users_container(&self) -> String {
        format!("{},{}", USERS_CONTAINER, self.base_dn)
    }

    fn list<F>(&self, query: &QueryOptions, select: F) -> Vec<Entry>
    where
        F: Fn(&State) -> Vec<Entry>,
    {
        let state = self.state.read();
        let entries: Vec<Entry> = select(&state)
            .into_iter()
            .filter(|e| query.matches_filters(e))
            .collect();
        query.apply(entries)
    }

    fn update_uac(&self, user: &str, flag: u32, set: bool) -> DirectoryResult<()> {
        let mut state = self.state.write();
        let record = state.user_mut(user)?;
        record.uac = with_flag(record.uac, flag, set);
        debug!(user, uac = record.uac, "Updated userAccountControl");
        Ok(())
    }
}

/// Parse a single `(attr=value)` assertion
fn parse_simple_filter(filter: &str) -> DirectoryResult<(String, String)> {
    let trimmed = filter.trim();
    let inner = trimmed
        .strip_prefix('(')
        .and_then(|f| f.strip_suffix(')'))
        .unwrap_or(trimmed);

    if inner.contains(['(', ')', '&', '|', '!']) {
        return Err(DirectoryError::InvalidInput(format!(
            "Unsupported filter: {}",
            filter
        )));
    }

    let invalid = || DirectoryError::InvalidInput(format!("Invalid search filter: {}", filter));

    let (attr, value) = inner.split_once('=').ok_or_else(invalid)?;
    let (attr, value) = (attr.trim(), value.trim());

    // >=, <= and ~= leave the operator character on the attribute
    if attr.ends_with(['<', '>', '~']) {
        return Err(DirectoryError::InvalidInput(format!(
            "Unsupported filter: {}",
            filter
        )));
    }
    if !is_attribute_name(attr) || value.is_empty() {
        return Err(invalid());
    }

    Ok((attr.to_string(), value.to_string()))
}

#[async_trait]
impl Directory for MemoryDirectory {
    async fn list_users(&self, query: &QueryOptions) -> DirectoryResult<Vec<Entry>> {
        Ok(self.list(query, |state| {
            state.users.values().map(|u| state.user_entry(u)).collect()
        }))
    }

    async fn add_user(&self, user: NewUser) -> DirectoryResult<Entry> {
        if user.user_name.trim().is_empty() {
            return Err(DirectoryError::InvalidInput("userName is required".to_string()));
        }

        let mut state = self.state.write();
        let user_key = key(&user.user_name);
        if state.users.contains_key(&user_key) {
            return Err(DirectoryError::already_exists("user", &user.user_name));
        }

        let parent = self.resolve_parent(&state, user.location.as_deref(), self.users_container())?;
        let cn = user.common_name();
        let password = user.initial_password().map(String::from);
        let enabled = user.enabled.unwrap_or(password.is_some());

        let dn = format!("CN={},{}", escape_dn_value(&cn), parent);
        if state.users.values().any(|u| dn_eq(&u.dn, &dn)) {
            return Err(DirectoryError::already_exists("entry", &dn));
        }

        let record = UserRecord {
            dn,
            user_name: user.user_name.clone(),
            display_name: Some(cn.clone()),
            cn,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            title: user.title,
            phone: user.phone,
            description: user.description,
            password,
            uac: new_account_uac(enabled, user.password_expires.unwrap_or(true)),
            locked: false,
        };

        info!(dn = %record.dn, "Created user");
        let entry = state.user_entry(&record);
        state.users.insert(user_key, record);
        Ok(entry)
    }

    async fn get_user(&self, user: &str, query: &QueryOptions) -> DirectoryResult<Entry> {
        let state = self.state.read();
        state
            .users
            .get(&key(user))
            .map(|u| query.project(state.user_entry(u)))
            .ok_or_else(|| DirectoryError::not_found("user", user))
    }

    async fn user_exists(&self, user: &str) -> DirectoryResult<bool> {
        Ok(self.state.read().users.contains_key(&key(user)))
    }

    async fn is_member_of(&self, user: &str, group: &str) -> DirectoryResult<bool> {
        let state = self.state.read();
        if !state.users.contains_key(&key(user)) {
            return Err(DirectoryError::not_found("user", user));
        }
        let group = state
            .groups
            .get(&key(group))
            .ok_or_else(|| DirectoryError::not_found("group", group))?;

        Ok(group.members.contains(&key(user)))
    }

    async fn authenticate(&self, user: &str, password: &str) -> DirectoryResult<bool> {
        if password.is_empty() {
            return Ok(false);
        }

        let state = self.state.read();
        let ok = state.users.get(&key(user)).is_some_and(|u| {
            u.password.as_deref() == Some(password) && u.uac & ACCOUNTDISABLE == 0 && !u.locked
        });
        Ok(ok)
    }

    async fn update_user(&self, user: &str, update: UserUpdate) -> DirectoryResult<()> {
        let mut state = self.state.write();
        let record = state.user_mut(user)?;

        let set = |field: &mut Option<String>, value: Option<String>| {
            if let Some(value) = value {
                *field = Some(value).filter(|v| !v.is_empty());
            }
        };
        set(&mut record.first_name, update.first_name);
        set(&mut record.last_name, update.last_name);
        set(&mut record.display_name, update.display_name);
        set(&mut record.email, update.email);
        set(&mut record.title, update.title);
        set(&mut record.phone, update.phone);
        set(&mut record.description, update.description);

        if let Some(enabled) = update.enabled {
            record.uac = with_flag(record.uac, ACCOUNTDISABLE, !enabled);
        }
        if let Some(expires) = update.password_expires {
            record.uac = with_flag(record.uac, DONT_EXPIRE_PASSWORD, !expires);
        }

        info!(user, "Updated user");
        Ok(())
    }

    async fn set_password(&self, user: &str, password: &str) -> DirectoryResult<()> {
        if password.is_empty() {
            return Err(DirectoryError::InvalidInput(
                "Password cannot be empty".to_string(),
            ));
        }

        self.state.write().user_mut(user)?.password = Some(password.to_string());
        info!(user, "Password changed");
        Ok(())
    }

    async fn set_password_never_expires(&self, user: &str) -> DirectoryResult<()> {
        self.update_uac(user, DONT_EXPIRE_PASSWORD, true)
    }

    async fn set_password_expires(&self, user: &str) -> DirectoryResult<()> {
        self.update_uac(user, DONT_EXPIRE_PASSWORD, false)
    }

    async fn enable_user(&self, user: &str) -> DirectoryResult<()> {
        self.update_uac(user, ACCOUNTDISABLE, false)
    }

    async fn disable_user(&self, user: &str) -> DirectoryResult<()> {
        self.update_uac(user, ACCOUNTDISABLE, true)
    }

    async fn move_user(&self, user: &str, location: &str) -> DirectoryResult<()> {
        if location.trim().is_empty() {
            return Err(DirectoryError::InvalidInput("location is required".to_string()));
        }

        let mut state = self.state.write();
        let target = self.resolve_parent(&state, Some(location), self.base_dn.clone())?;
        let record = state.user_mut(user)?;
        let (rdn, _) = split_dn(&record.dn);
        record.dn = format!("{},{}", rdn, target);

        info!(user, target = %target, "Moved user");
        Ok(())
    }

    async fn unlock_user(&self, user: &str) -> DirectoryResult<()> {
        self.state.write().user_mut(user)?.locked = false;
        info!(user, "Unlocked user");
        Ok(())
    }

    async fn remove_user(&self, user: &str) -> DirectoryResult<()> {
        let mut state = self.state.write();
        let user_key = key(user);
        if state.users.remove(&user_key).is_none() {
            return Err(DirectoryError::not_found("user", user));
        }
        for group in state.groups.values_mut() {
            group.members.remove(&user_key);
        }

        info!(user, "Deleted user");
        Ok(())
    }

    async fn add_user_to_group(&self, user: &str, group: &str) -> DirectoryResult<()> {
        let mut state = self.state.write();
        if !state.users.contains_key(&key(user)) {
            return Err(DirectoryError::not_found("user", user));
        }
        let record = state
            .groups
            .get_mut(&key(group))
            .ok_or_else(|| DirectoryError::not_found("group", group))?;

        record.members.insert(key(user));
        Ok(())
    }

    async fn remove_user_from_group(&self, user: &str, group: &str) -> DirectoryResult<()> {
        let mut state = self.state.write();
        if !state.users.contains_key(&key(user)) {
            return Err(DirectoryError::not_found("user", user));
        }
        let record = state
            .groups
            .get_mut(&key(group))
            .ok_or_else(|| DirectoryError::not_found("group", group))?;

        record.members.remove(&key(user));
        Ok(())
    }

    async fn list_groups(&self, query: &QueryOptions) -> DirectoryResult<Vec<Entry>> {
        Ok(self.list(query, |state| {
            state.groups.values().map(|g| state.group_entry(g)).collect()
        }))
    }

    async fn add_group(&self, group: NewGroup) -> DirectoryResult<Entry> {
        if group.name.trim().is_empty() {
            return Err(DirectoryError::InvalidInput("name is required".to_string()));
        }

        let mut state = self.state.write();
        let group_key = key(&group.name);
        if state.groups.contains_key(&group_key) {
            return Err(DirectoryError::already_exists("group", &group.name));
        }

        let parent = self.resolve_parent(&state, group.location.as_deref(), self.users_container())?;
        let record = GroupRecord {
            dn: format!("CN={},{}", escape_dn_value(&group.name), parent),
            name: group.name,
            description: group.description,
            members: BTreeSet::new(),
        };

        info!(dn = %record.dn, "Created group");
        let entry = state.group_entry(&record);
        state.groups.insert(group_key, record);
        Ok(entry)
    }

    async fn get_group(&self, group: &str, query: &QueryOptions) -> DirectoryResult<Entry> {
        let state = self.state.read();
        state
            .groups
            .get(&key(group))
            .map(|g| query.project(state.group_entry(g)))
            .ok_or_else(|| DirectoryError::not_found("group", group))
    }

    async fn group_exists(&self, group: &str) -> DirectoryResult<bool> {
        Ok(self.state.read().groups.contains_key(&key(group)))
    }

    async fn remove_group(&self, group: &str) -> DirectoryResult<()> {
        if self.state.write().groups.remove(&key(group)).is_none() {
            return Err(DirectoryError::not_found("group", group));
        }
        info!(group, "Deleted group");
        Ok(())
    }

    async fn list_ous(&self, query: &QueryOptions) -> DirectoryResult<Vec<Entry>> {
        Ok(self.list(query, |state| {
            state.ous.values().map(|o| state.ou_entry(o)).collect()
        }))
    }

    async fn add_ou(&self, ou: NewOu) -> DirectoryResult<Entry> {
        if ou.name.trim().is_empty() {
            return Err(DirectoryError::InvalidInput("name is required".to_string()));
        }

        let mut state = self.state.write();
        let parent = self.resolve_parent(&state, ou.location.as_deref(), self.base_dn.clone())?;
        let dn = format!("OU={},{}", escape_dn_value(&ou.name), parent);
        let ou_key = key(&dn);
        if state.ous.contains_key(&ou_key) {
            return Err(DirectoryError::already_exists("organizational unit", &ou.name));
        }

        let record = OuRecord {
            dn,
            name: ou.name,
            description: ou.description,
        };

        info!(dn = %record.dn, "Created organizational unit");
        let entry = state.ou_entry(&record);
        state.ous.insert(ou_key, record);
        Ok(entry)
    }

    async fn get_ou(&self, ou: &str, query: &QueryOptions) -> DirectoryResult<Entry> {
        let state = self.state.read();
        state
            .find_ou(ou)
            .map(|o| query.project(state.ou_entry(o)))
            .ok_or_else(|| DirectoryError::not_found("organizational unit", ou))
    }

    async fn ou_exists(&self, ou: &str) -> DirectoryResult<bool> {
        Ok(self.state.read().find_ou(ou).is_some())
    }

    async fn remove_ou(&self, ou: &str) -> DirectoryResult<()> {
        let mut state = self.state.write();
        let dn = state
            .find_ou(ou)
            .map(|o| o.dn.clone())
            .ok_or_else(|| DirectoryError::not_found("organizational unit", ou))?;

        let occupied = state.users.values().any(|u| is_descendant(&u.dn, &dn))
            || state.groups.values().any(|g| is_descendant(&g.dn, &dn))
            || state.ous.values().any(|o| is_descendant(&o.dn, &dn));
        if occupied {
            return Err(DirectoryError::with_status(
                409,
                format!("organizational unit '{}' is not empty", ou),
            ));
        }

        state.ous.remove(&key(&dn));
        info!(dn = %dn, "Deleted organizational unit");
        Ok(())
    }

    async fn list_other(&self, query: &QueryOptions) -> DirectoryResult<Vec<Entry>> {
        Ok(query.apply(Vec::new()))
    }

    async fn find(&self, filter: &str, query: &QueryOptions) -> DirectoryResult<Vec<Entry>> {
        let assertion = QueryOptions {
            filters: vec![parse_simple_filter(filter)?],
            ..QueryOptions::default()
        };
        Ok(self.list(query, |state| {
            state
                .all_entries()
                .into_iter()
                .filter(|e| assertion.matches_filters(e))
                .collect()
        }))
    }
}
