use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

/// Canonical (uppercase) role identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Role(String);

impl Role {
    pub fn new(name: &str) -> Self {
        Role(name.trim().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Role {
    fn from(value: &str) -> Self {
        Role::new(value)
    }
}

pub type RoleSet = BTreeSet<Role>;

/// Maps group names to roles and holds the platform administrator roles.
#[derive(Debug, Clone)]
pub struct RoleResolver {
    admin_roles: RoleSet,
}

impl RoleResolver {
    pub fn new<I, S>(admin_roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            admin_roles: normalize(admin_roles),
        }
    }

    pub fn admin_roles(&self) -> &RoleSet {
        &self.admin_roles
    }
}

/// Uppercases every group name. An empty input yields an empty set, which callers
/// read as "no restriction".
pub fn normalize<I, S>(groups: I) -> RoleSet
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    groups
        .into_iter()
        .map(|g| Role::new(g.as_ref()))
        .filter(|r| !r.0.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_uppercases_and_dedupes() {
        let roles = normalize(["analyst", "Analyst", "ops"]);
        let names: Vec<&str> = roles.iter().map(Role::as_str).collect();
        assert_eq!(names, vec!["ANALYST", "OPS"]);
    }

    #[test]
    fn normalize_empty_is_empty() {
        assert!(normalize(Vec::<String>::new()).is_empty());
        assert!(normalize(["  "]).is_empty());
    }

    #[test]
    fn admin_roles_are_normalized() {
        let resolver = RoleResolver::new(["admin", "Ops"]);
        assert!(resolver.admin_roles().contains(&Role::from("ADMIN")));
        assert!(resolver.admin_roles().contains(&Role::from("ops")));
    }
}
