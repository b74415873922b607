//! Static action tables for privilege-escalation classification.
//!
//! Scores are fixed tiers, not ratios. Keyword matching on permission
//! payloads is a case-sensitive substring check, so `storage.admin`
//! matches but `Admin` does not.

use crate::record::DetectionType;

/// Role and account lifecycle actions. Highest tier.
const ROLE_ACTIONS: &[&str] = &["create_role", "delete_role", "create_user", "delete_user"];

/// Permission grant actions, scored by permission payload keywords.
const GRANT_ACTIONS: &[&str] = &["grant_permission", "update_permissions"];

/// Group membership edits. Lowest tier.
const GROUP_ACTIONS: &[&str] = &["add_group_member", "remove_group_member"];

pub const ROLE_MANAGEMENT_SCORE: f64 = 5.0;
pub const ADMIN_PRIVILEGE_SCORE: f64 = 3.5;
pub const WRITE_PERMISSION_SCORE: f64 = 2.5;
pub const GROUP_MEMBERSHIP_SCORE: f64 = 1.5;

/// True when the action belongs to any escalation table and is worth
/// carrying through aggregation.
pub fn is_escalation_action(action: &str) -> bool {
    ROLE_ACTIONS.contains(&action)
        || GRANT_ACTIONS.contains(&action)
        || GROUP_ACTIONS.contains(&action)
}

/// Classify one escalation event. Checked top tier first; a grant whose
/// permission carries none of the keywords classifies as nothing.
pub fn classify_escalation(
    action: &str,
    permission: Option<&str>,
) -> Option<(DetectionType, f64)> {
    if ROLE_ACTIONS.contains(&action) {
        return Some((DetectionType::RoleManagement, ROLE_MANAGEMENT_SCORE));
    }
    if GRANT_ACTIONS.contains(&action) {
        let permission = permission?;
        if permission.contains("admin") || permission.contains("owner") {
            return Some((DetectionType::AdminPrivilege, ADMIN_PRIVILEGE_SCORE));
        }
        if permission.contains("write") || permission.contains("modify") {
            return Some((DetectionType::WritePermission, WRITE_PERMISSION_SCORE));
        }
        return None;
    }
    if GROUP_ACTIONS.contains(&action) {
        return Some((DetectionType::GroupMembership, GROUP_MEMBERSHIP_SCORE));
    }
    None
}
