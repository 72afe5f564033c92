//! Role and permission evaluation
//!
//! Two distinct semantics coexist deliberately:
//!
//! - [`has_any_role`] is an exact-membership check, used for menu filtering.
//! - [`can_access`] is a hierarchy check (Admin level 3 > Clinician 2 >
//!   Patient 1), used for generic permission gates, so an Admin satisfies a
//!   Clinician-only gate even when not listed.
//!
//! Which one menu filtering uses is an explicit, named policy
//! ([`MenuVisibilityPolicy`]) rather than an implicit choice.

use crate::models::{Role, User};
use crate::navigation::NavigationItem;

/// Numeric privilege level for a role. Unknown/absent users rank 0.
pub fn role_level(role: Role) -> u8 {
    match role {
        Role::Admin => 3,
        Role::Clinician => 2,
        Role::Patient => 1,
    }
}

/// Exact role match
pub fn has_role(user: Option<&User>, role: Role) -> bool {
    user.map(|u| u.role == role).unwrap_or(false)
}

/// Exact membership: the user's role appears in `roles`
pub fn has_any_role(user: Option<&User>, roles: &[Role]) -> bool {
    user.map(|u| roles.contains(&u.role)).unwrap_or(false)
}

/// Hierarchical access check.
///
/// Empty `required_roles` means a public feature: always allowed. Otherwise
/// the user's level must meet or exceed the weakest required role's level.
/// Malformed input (absent user) is treated as "no access".
pub fn can_access(user: Option<&User>, required_roles: &[Role]) -> bool {
    if required_roles.is_empty() {
        return true;
    }
    let user_level = user.map(|u| role_level(u.role)).unwrap_or(0);
    let min_required = required_roles
        .iter()
        .map(|r| role_level(*r))
        .min()
        .unwrap_or(u8::MAX);
    user_level >= min_required
}

/// Human-readable role name for the dashboard
pub fn role_display_name(role: Role) -> &'static str {
    match role {
        Role::Patient => "Patient/User",
        Role::Clinician => "Healthcare Provider",
        Role::Admin => "Administrator",
    }
}

/// Which semantics navigation filtering applies.
///
/// `ExactMembership` is the observed dashboard behavior: an Admin does not
/// see Clinician-only entries unless Admin is listed. `Hierarchy` routes
/// the same filter through [`can_access`] instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MenuVisibilityPolicy {
    #[default]
    ExactMembership,
    Hierarchy,
}

/// Prune a navigation list to what `user` may see.
///
/// Order-preserving and non-destructive. An absent user yields an empty
/// list: navigation is locked down, never defaulted open.
pub fn filter_navigation(
    items: &[NavigationItem],
    user: Option<&User>,
    policy: MenuVisibilityPolicy,
) -> Vec<NavigationItem> {
    if user.is_none() {
        return Vec::new();
    }
    items
        .iter()
        .filter(|item| {
            if item.required_roles.is_empty() {
                return true;
            }
            match policy {
                MenuVisibilityPolicy::ExactMembership => has_any_role(user, item.required_roles),
                MenuVisibilityPolicy::Hierarchy => can_access(user, item.required_roles),
            }
        })
        .cloned()
        .collect()
}

/// Named action checks used by the dashboard's feature gates
pub struct Permissions;

impl Permissions {
    pub fn can_upload_files(user: Option<&User>) -> bool {
        has_any_role(user, &[Role::Patient, Role::Clinician, Role::Admin])
    }

    pub fn can_view_own_files(user: Option<&User>) -> bool {
        has_any_role(user, &[Role::Patient, Role::Clinician, Role::Admin])
    }

    pub fn can_view_all_files(user: Option<&User>) -> bool {
        has_any_role(user, &[Role::Admin])
    }

    pub fn can_delete_files(user: Option<&User>) -> bool {
        has_any_role(user, &[Role::Patient, Role::Clinician, Role::Admin])
    }

    pub fn can_run_analysis(user: Option<&User>) -> bool {
        has_any_role(user, &[Role::Patient, Role::Clinician, Role::Admin])
    }

    pub fn can_view_all_analyses(user: Option<&User>) -> bool {
        has_any_role(user, &[Role::Clinician, Role::Admin])
    }

    pub fn can_view_patient_data(user: Option<&User>) -> bool {
        has_any_role(user, &[Role::Clinician, Role::Admin])
    }

    pub fn can_generate_reports(user: Option<&User>) -> bool {
        has_any_role(user, &[Role::Clinician, Role::Admin])
    }

    pub fn can_manage_users(user: Option<&User>) -> bool {
        has_role(user, Role::Admin)
    }

    pub fn can_view_system_logs(user: Option<&User>) -> bool {
        has_role(user, Role::Admin)
    }
}
