//! Roles, capability tags and the operation policy
//!
//! Every role check in the engine goes through [`can`]. Services never compare
//! roles directly.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Account roles, ordered by privilege
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[repr(u8)]
pub enum Role {
    /// Members of the public; submit reports and follow their own cases
    #[default]
    Citizen = 0,
    /// Field staff working cases
    Officer = 1,
    /// Full control including hard deletes and role changes
    Admin = 2,
}

impl Role {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_uppercase().as_str() {
            "CITIZEN" => Some(Role::Citizen),
            "OFFICER" => Some(Role::Officer),
            "ADMIN" => Some(Role::Admin),
            _ => None,
        }
    }

    pub fn is_staff(&self) -> bool {
        *self >= Role::Officer
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Citizen => write!(f, "CITIZEN"),
            Role::Officer => write!(f, "OFFICER"),
            Role::Admin => write!(f, "ADMIN"),
        }
    }
}

/// Capability tags granted to staff profiles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Capability {
    ViewIncidents,
    ManageIncidents,
    ViewCases,
    ManageCases,
    ViewResources,
    ManageResources,
    ViewAnalytics,
    ManageAlerts,
}

/// Operations the engine accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    SubmitReport,
    ReadOwnReports,
    ReadAllReports,
    ReviewReport,
    DeleteReport,

    CreateCase,
    ReadOwnCases,
    ReadAllCases,
    UpdateCase,
    AssignCase,
    TransitionCase,
    DeleteCase,
    ViewCaseStats,

    ReadLedger,
    AppendLedger,

    ManageOwnNotifications,
    DeleteAnyNotification,

    ViewStaff,
    ManageStaff,
    ViewUsers,
    ChangeUserRole,
}

impl Operation {
    /// Lowest role that may perform the operation
    pub fn required_role(&self) -> Role {
        use Operation::*;
        match self {
            SubmitReport | ReadOwnReports | ReadOwnCases | ManageOwnNotifications => Role::Citizen,

            ReadAllReports | ReviewReport | CreateCase | ReadAllCases | UpdateCase
            | AssignCase | TransitionCase | ViewCaseStats | ReadLedger | AppendLedger
            | ViewStaff => Role::Officer,

            DeleteReport | DeleteCase | DeleteAnyNotification | ManageStaff | ViewUsers
            | ChangeUserRole => Role::Admin,
        }
    }

    /// Capability an officer must additionally hold. Admins are never gated.
    pub fn required_capability(&self) -> Option<Capability> {
        match self {
            Operation::ViewCaseStats => Some(Capability::ViewAnalytics),
            _ => None,
        }
    }

    pub fn description(&self) -> &'static str {
        use Operation::*;
        match self {
            SubmitReport => "submit a threat report",
            ReadOwnReports => "read own reports",
            ReadAllReports => "read all reports",
            ReviewReport => "review a threat report",
            DeleteReport => "delete a threat report",
            CreateCase => "open a case",
            ReadOwnCases => "read own cases",
            ReadAllCases => "read all cases",
            UpdateCase => "update a case",
            AssignCase => "assign a case",
            TransitionCase => "change case status",
            DeleteCase => "delete a case",
            ViewCaseStats => "view case statistics",
            ReadLedger => "read an investigation",
            AppendLedger => "append to an investigation",
            ManageOwnNotifications => "manage own notifications",
            DeleteAnyNotification => "delete another user's notification",
            ViewStaff => "view staff",
            ManageStaff => "manage staff",
            ViewUsers => "view users",
            ChangeUserRole => "change user roles",
        }
    }
}

/// Check whether an actor with `role` and `capabilities` may perform `operation`
pub fn can(role: Role, capabilities: &BTreeSet<Capability>, operation: Operation) -> bool {
    if role < operation.required_role() {
        return false;
    }
    if role == Role::Admin {
        return true;
    }
    match operation.required_capability() {
        Some(cap) => capabilities.contains(&cap),
        None => true,
    }
}

/// Access to an entity that may belong to the actor.
///
/// Allowed when `any` is permitted outright, or when the actor owns the
/// entity and `own` is permitted.
pub fn can_access_owned(
    role: Role,
    capabilities: &BTreeSet<Capability>,
    any: Operation,
    own: Operation,
    is_owner: bool,
) -> bool {
    can(role, capabilities, any) || (is_owner && can(role, capabilities, own))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn none() -> BTreeSet<Capability> {
        BTreeSet::new()
    }

    #[test]
    fn test_citizen_operations() {
        assert!(can(Role::Citizen, &none(), Operation::SubmitReport));
        assert!(can(Role::Citizen, &none(), Operation::ReadOwnCases));
        assert!(can(Role::Citizen, &none(), Operation::ManageOwnNotifications));
        assert!(!can(Role::Citizen, &none(), Operation::TransitionCase));
        assert!(!can(Role::Citizen, &none(), Operation::ReadAllCases));
        assert!(!can(Role::Citizen, &none(), Operation::AppendLedger));
    }

    #[test]
    fn test_officer_cannot_delete_or_change_roles() {
        assert!(can(Role::Officer, &none(), Operation::TransitionCase));
        assert!(can(Role::Officer, &none(), Operation::ReviewReport));
        assert!(!can(Role::Officer, &none(), Operation::DeleteReport));
        assert!(!can(Role::Officer, &none(), Operation::DeleteCase));
        assert!(!can(Role::Officer, &none(), Operation::ChangeUserRole));
        assert!(!can(Role::Officer, &none(), Operation::ManageStaff));
    }

    #[test]
    fn test_capability_gated_for_officers_only() {
        assert!(!can(Role::Officer, &none(), Operation::ViewCaseStats));
        let caps: BTreeSet<_> = [Capability::ViewAnalytics].into_iter().collect();
        assert!(can(Role::Officer, &caps, Operation::ViewCaseStats));
        assert!(can(Role::Admin, &none(), Operation::ViewCaseStats));
        assert!(!can(Role::Citizen, &caps, Operation::ViewCaseStats));
    }

    #[test]
    fn test_admin_can_do_everything() {
        use Operation::*;
        for op in [
            SubmitReport, DeleteReport, DeleteCase, ChangeUserRole, ManageStaff, ViewUsers,
            DeleteAnyNotification, ViewCaseStats,
        ] {
            assert!(can(Role::Admin, &none(), op), "{:?}", op);
        }
    }

    #[test]
    fn test_owned_access() {
        let caps = none();
        assert!(can_access_owned(
            Role::Citizen,
            &caps,
            Operation::ReadAllCases,
            Operation::ReadOwnCases,
            true
        ));
        assert!(!can_access_owned(
            Role::Citizen,
            &caps,
            Operation::ReadAllCases,
            Operation::ReadOwnCases,
            false
        ));
        assert!(can_access_owned(
            Role::Officer,
            &caps,
            Operation::ReadAllCases,
            Operation::ReadOwnCases,
            false
        ));
    }

    #[test]
    fn test_role_ordering() {
        assert!(Role::Admin > Role::Officer);
        assert!(Role::Officer > Role::Citizen);
        assert_eq!(Role::parse("officer"), Some(Role::Officer));
        assert_eq!(Role::parse("ranger"), None);
    }
}
