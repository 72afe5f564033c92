//! Static navigation data for the dashboard sidebar
//!
//! Filtered per-user at render time by [`crate::access::filter_navigation`];
//! never persisted.

use crate::models::Role;

/// One sidebar entry with the roles allowed to see it.
///
/// An empty `required_roles` slice marks the entry as visible to every
/// authenticated user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationItem {
    pub label: &'static str,
    pub route: &'static str,
    pub required_roles: &'static [Role],
}

/// The dashboard menu. Entries keep the sidebar's display order.
pub static NAV_ITEMS: &[NavigationItem] = &[
    NavigationItem {
        label: "Dashboard",
        route: "/dashboard",
        required_roles: &[],
    },
    NavigationItem {
        label: "Upload File",
        route: "/upload",
        required_roles: &[Role::Patient, Role::Clinician, Role::Admin],
    },
    NavigationItem {
        label: "My Files",
        route: "/files",
        required_roles: &[Role::Patient, Role::Clinician, Role::Admin],
    },
    NavigationItem {
        label: "Sequence Analysis",
        route: "/analysis",
        required_roles: &[Role::Patient, Role::Clinician, Role::Admin],
    },
    NavigationItem {
        label: "Variant Analysis",
        route: "/variants",
        required_roles: &[Role::Patient, Role::Clinician, Role::Admin],
    },
    NavigationItem {
        label: "Reports",
        route: "/reports",
        required_roles: &[Role::Clinician, Role::Admin],
    },
    NavigationItem {
        label: "Reference Database",
        route: "/reference-database",
        required_roles: &[Role::Clinician, Role::Admin],
    },
    NavigationItem {
        label: "User Management",
        route: "/admin/users",
        required_roles: &[Role::Admin],
    },
    NavigationItem {
        label: "Settings",
        route: "/settings",
        required_roles: &[],
    },
];
