//! Client-side route guard.
//!
//! Decides what a page shows for a given session snapshot. This only shapes
//! navigation; every privileged request is checked again by the server.

use crate::client::session::SessionState;
use crate::models::role::Role;
use crate::policy::roles::{has_any_role, ADMIN_ROLES};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPhase {
    Loading,
    Unauthenticated,
    Authenticated,
}

impl AuthPhase {
    pub fn of(snapshot: &SessionState) -> Self {
        if snapshot.loading {
            AuthPhase::Loading
        } else if snapshot.is_authenticated {
            AuthPhase::Authenticated
        } else {
            AuthPhase::Unauthenticated
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// Neutral waiting view; never the protected content
    Wait,
    RedirectToLogin,
    AccessDenied,
    Render,
    RedirectHome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteRequirement {
    Public,
    /// Login and register pages, shown only to signed-out visitors
    AuthPage,
    Authenticated,
    Roles(&'static [Role]),
}

pub fn protected_route(snapshot: &SessionState, allowed: Option<&[Role]>) -> GuardDecision {
    match AuthPhase::of(snapshot) {
        AuthPhase::Loading => GuardDecision::Wait,
        AuthPhase::Unauthenticated => GuardDecision::RedirectToLogin,
        AuthPhase::Authenticated => match allowed {
            Some(roles) if !has_any_role(snapshot.user.as_ref(), roles) => {
                GuardDecision::AccessDenied
            }
            _ => GuardDecision::Render,
        },
    }
}

pub fn auth_page(snapshot: &SessionState) -> GuardDecision {
    match AuthPhase::of(snapshot) {
        AuthPhase::Loading => GuardDecision::Wait,
        AuthPhase::Authenticated => GuardDecision::RedirectHome,
        AuthPhase::Unauthenticated => GuardDecision::Render,
    }
}

/// The storefront's route table. None for paths it does not know.
pub fn route_requirement(path: &str) -> Option<RouteRequirement> {
    let segments: Vec<&str> = path.trim_end_matches('/').split('/').skip(1).collect();

    match segments.as_slice() {
        [] | [""] | ["products"] => Some(RouteRequirement::Public),
        ["products", id] if !id.is_empty() => Some(RouteRequirement::Public),
        ["auth", "login"] | ["auth", "register"] => Some(RouteRequirement::AuthPage),
        ["profile"] => Some(RouteRequirement::Authenticated),
        ["admin", "dashboard"] | ["admin", "users"] => Some(RouteRequirement::Roles(ADMIN_ROLES)),
        _ => None,
    }
}

/// Decision for `path`, or None when the route is unknown
pub fn decide(snapshot: &SessionState, path: &str) -> Option<GuardDecision> {
    let decision = match route_requirement(path)? {
        RouteRequirement::Public => GuardDecision::Render,
        RouteRequirement::AuthPage => auth_page(snapshot),
        RouteRequirement::Authenticated => protected_route(snapshot, None),
        RouteRequirement::Roles(roles) => protected_route(snapshot, Some(roles)),
    };
    Some(decision)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::PublicUser;

    fn user(role: Role) -> PublicUser {
        PublicUser {
            id: uuid::Uuid::new_v4(),
            username: "someone".to_string(),
            email: "someone@x.com".to_string(),
            role,
            bio: None,
            social_links: Default::default(),
            avatar_url: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    fn loading() -> SessionState {
        SessionState {
            token: None,
            user: None,
            is_authenticated: false,
            loading: true,
            error: None,
        }
    }

    fn signed_out() -> SessionState {
        SessionState {
            loading: false,
            ..loading()
        }
    }

    fn signed_in(role: Role) -> SessionState {
        SessionState {
            token: Some("tok".to_string()),
            user: Some(user(role)),
            is_authenticated: true,
            loading: false,
            error: None,
        }
    }

    #[test]
    fn test_loading_never_renders_protected_view() {
        assert_eq!(protected_route(&loading(), None), GuardDecision::Wait);
        assert_eq!(protected_route(&loading(), Some(ADMIN_ROLES)), GuardDecision::Wait);
        assert_eq!(auth_page(&loading()), GuardDecision::Wait);
    }

    #[test]
    fn test_protected_route_decisions() {
        assert_eq!(protected_route(&signed_out(), None), GuardDecision::RedirectToLogin);
        assert_eq!(
            protected_route(&signed_out(), Some(ADMIN_ROLES)),
            GuardDecision::RedirectToLogin
        );
        assert_eq!(protected_route(&signed_in(Role::Client), None), GuardDecision::Render);
        assert_eq!(
            protected_route(&signed_in(Role::Client), Some(ADMIN_ROLES)),
            GuardDecision::AccessDenied
        );
        assert_eq!(
            protected_route(&signed_in(Role::Admin), Some(ADMIN_ROLES)),
            GuardDecision::Render
        );
        assert_eq!(
            protected_route(&signed_in(Role::SuperAdmin), Some(ADMIN_ROLES)),
            GuardDecision::Render
        );
    }

    #[test]
    fn test_auth_page_redirects_signed_in() {
        assert_eq!(auth_page(&signed_in(Role::Client)), GuardDecision::RedirectHome);
        assert_eq!(auth_page(&signed_out()), GuardDecision::Render);
    }

    #[test]
    fn test_route_table() {
        assert_eq!(route_requirement("/"), Some(RouteRequirement::Public));
        assert_eq!(route_requirement("/products"), Some(RouteRequirement::Public));
        assert_eq!(route_requirement("/products/42"), Some(RouteRequirement::Public));
        assert_eq!(route_requirement("/auth/login"), Some(RouteRequirement::AuthPage));
        assert_eq!(route_requirement("/auth/register"), Some(RouteRequirement::AuthPage));
        assert_eq!(route_requirement("/profile"), Some(RouteRequirement::Authenticated));
        assert_eq!(
            route_requirement("/admin/users/"),
            Some(RouteRequirement::Roles(ADMIN_ROLES))
        );
        assert_eq!(route_requirement("/admin"), None);
        assert_eq!(route_requirement("/checkout"), None);
    }

    #[test]
    fn test_decide() {
        assert_eq!(decide(&signed_out(), "/"), Some(GuardDecision::Render));
        assert_eq!(decide(&signed_out(), "/profile"), Some(GuardDecision::RedirectToLogin));
        assert_eq!(
            decide(&signed_in(Role::Client), "/admin/dashboard"),
            Some(GuardDecision::AccessDenied)
        );
        assert_eq!(decide(&signed_in(Role::Admin), "/auth/login"), Some(GuardDecision::RedirectHome));
        assert_eq!(decide(&signed_in(Role::Admin), "/nowhere"), None);
    }
}
