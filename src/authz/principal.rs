use super::roles::{normalize, Role, RoleSet};

/// Principal represents the authenticated caller with their resolved roles
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub username: String,
    pub roles: RoleSet,
}

impl Principal {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            roles: RoleSet::new(),
        }
    }

    /// Group names are normalized to roles on the way in.
    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.roles = normalize(groups);
        self
    }

    pub fn has_role(&self, role: &Role) -> bool {
        self.roles.contains(role)
    }

    pub fn has_any_role(&self, roles: &RoleSet) -> bool {
        roles.iter().any(|r| self.has_role(r))
    }
}
