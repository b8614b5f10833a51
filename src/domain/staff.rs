//! User accounts and staff profiles

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::auth::{Capability, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Department {
    Patrol,
    Investigation,
    Administration,
    WildlifeRescue,
    Analytics,
}

impl Department {
    pub fn as_str(&self) -> &'static str {
        match self {
            Department::Patrol => "PATROL",
            Department::Investigation => "INVESTIGATION",
            Department::Administration => "ADMINISTRATION",
            Department::WildlifeRescue => "WILDLIFE_RESCUE",
            Department::Analytics => "ANALYTICS",
        }
    }
}

impl fmt::Display for Department {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An account known to the engine, mirrored from session claims
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAccount {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Staff profile attached to an officer or admin account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffMember {
    pub id: String,
    pub user_id: String,
    pub department: Department,
    #[serde(default)]
    pub permissions: BTreeSet<Capability>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StaffMember {
    pub fn has(&self, capability: Capability) -> bool {
        self.permissions.contains(&capability)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStaffMember {
    pub user_id: String,
    pub department: Department,
    #[serde(default)]
    pub permissions: BTreeSet<Capability>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StaffPatch {
    #[serde(default)]
    pub department: Option<Department>,
    #[serde(default)]
    pub permissions: Option<BTreeSet<Capability>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_staff_permissions_parse_from_tags() {
        let input: NewStaffMember = serde_json::from_value(serde_json::json!({
            "userId": "u7",
            "department": "WILDLIFE_RESCUE",
            "permissions": ["VIEW_CASES", "MANAGE_ALERTS", "VIEW_CASES"]
        }))
        .unwrap();
        assert_eq!(input.department, Department::WildlifeRescue);
        assert_eq!(input.permissions.len(), 2);
        assert!(input.permissions.contains(&Capability::ManageAlerts));
    }

    #[test]
    fn test_unknown_capability_rejected() {
        let res: Result<NewStaffMember, _> = serde_json::from_value(serde_json::json!({
            "userId": "u7",
            "department": "PATROL",
            "permissions": ["LAUNCH_MISSILES"]
        }));
        assert!(res.is_err());
    }
}
