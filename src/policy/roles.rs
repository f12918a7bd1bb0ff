//! Role policy: pure predicates over a user's role.
//!
//! These helpers are shared by the server guard and the client. On the client
//! they only drive presentation; the server re-checks every privileged call.

use crate::models::role::Role;
use crate::models::user::PublicUser;

/// Roles allowed on admin endpoints
pub const ADMIN_ROLES: &[Role] = &[Role::Admin, Role::SuperAdmin];

/// Roles allowed to change other users' roles
pub const SUPER_ADMIN_ROLES: &[Role] = &[Role::SuperAdmin];

/// Anything that carries a role
pub trait HasRole {
    fn role(&self) -> Role;
}

impl HasRole for Role {
    fn role(&self) -> Role {
        *self
    }
}

impl HasRole for PublicUser {
    fn role(&self) -> Role {
        self.role
    }
}

impl HasRole for crate::models::user::User {
    fn role(&self) -> Role {
        self.role
    }
}

pub fn has_role<U: HasRole>(user: Option<&U>, role: Role) -> bool {
    user.map(|u| u.role() == role).unwrap_or(false)
}

pub fn has_any_role<U: HasRole>(user: Option<&U>, roles: &[Role]) -> bool {
    user.map(|u| roles.contains(&u.role())).unwrap_or(false)
}

pub fn is_admin<U: HasRole>(user: Option<&U>) -> bool {
    has_any_role(user, ADMIN_ROLES)
}

pub fn is_super_admin<U: HasRole>(user: Option<&U>) -> bool {
    has_role(user, Role::SuperAdmin)
}

pub fn is_client<U: HasRole>(user: Option<&U>) -> bool {
    has_role(user, Role::Client)
}

/// Human-readable label for any role value, including malformed ones
pub fn display_name(raw: &str) -> &'static str {
    match Role::parse(raw) {
        Some(role) => role_label(role),
        None => "Unknown",
    }
}

pub fn role_label(role: Role) -> &'static str {
    match role {
        Role::Client => "Client",
        Role::Admin => "Admin",
        Role::SuperAdmin => "Administrator",
    }
}

/// A role that may be chosen in the role-change UI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssignableRole {
    pub role: Role,
    pub label: &'static str,
}

/// Exactly `client` and `admin`. `super_admin` is never an assignment target.
pub fn assignable_roles() -> [AssignableRole; 2] {
    [
        AssignableRole {
            role: Role::Client,
            label: role_label(Role::Client),
        },
        AssignableRole {
            role: Role::Admin,
            label: role_label(Role::Admin),
        },
    ]
}

pub fn is_assignable(role: Role) -> bool {
    assignable_roles().iter().any(|r| r.role == role)
}

/// Whether the role-change control should be offered for `target`
pub fn can_change_role<A: HasRole, T: HasRole>(actor: Option<&A>, target: &T) -> bool {
    is_super_admin(actor) && target.role() != Role::SuperAdmin
}
