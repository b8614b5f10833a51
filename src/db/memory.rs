//! In-memory store
//!
//! Backs every store trait with `DashMap`s. Per-entity atomicity comes from
//! holding the shard lock (`get_mut` / `entry`) across check and write.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;

use super::{CaseStore, DirectoryStore, NotificationStore, ReportStore};
use crate::auth::Role;
use crate::domain::{
    now, Case, CaseFilter, CaseStatus, LedgerEntry, Notification, ReportFilter, ReportStatus,
    StaffMember, ThreatReport, UserAccount,
};
use crate::types::{Result, WildwatchError};

/// Process-local storage for all entities
#[derive(Default)]
pub struct MemoryStore {
    reports: DashMap<String, ThreatReport>,
    cases: DashMap<String, Case>,
    notifications: DashMap<String, Notification>,
    users: DashMap<String, UserAccount>,
    staff: DashMap<String, StaffMember>,
    /// user id -> staff id
    staff_by_user: DashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReportStore for MemoryStore {
    async fn insert_report(&self, report: &ThreatReport) -> Result<()> {
        match self.reports.entry(report.report_id.clone()) {
            Entry::Occupied(_) => Err(WildwatchError::Internal(format!(
                "duplicate report id {}",
                report.report_id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(report.clone());
                Ok(())
            }
        }
    }

    async fn get_report(&self, report_id: &str) -> Result<Option<ThreatReport>> {
        Ok(self.reports.get(report_id).map(|r| r.clone()))
    }

    async fn list_reports(&self, filter: &ReportFilter) -> Result<Vec<ThreatReport>> {
        let mut out: Vec<ThreatReport> = self
            .reports
            .iter()
            .filter(|r| filter.matches(r.value()))
            .map(|r| r.value().clone())
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    async fn commit_review(&self, reviewed: &ThreatReport) -> Result<bool> {
        let Some(mut stored) = self.reports.get_mut(&reviewed.report_id) else {
            return Err(WildwatchError::not_found("report", &reviewed.report_id));
        };
        if stored.status != ReportStatus::Pending {
            return Ok(false);
        }
        *stored = reviewed.clone();
        Ok(true)
    }

    async fn delete_report(&self, report_id: &str) -> Result<bool> {
        Ok(self.reports.remove(report_id).is_some())
    }
}

#[async_trait]
impl CaseStore for MemoryStore {
    async fn insert_case(&self, case: &Case) -> Result<()> {
        match self.cases.entry(case.case_id.clone()) {
            Entry::Occupied(_) => Err(WildwatchError::Internal(format!(
                "duplicate case id {}",
                case.case_id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(case.clone());
                Ok(())
            }
        }
    }

    async fn get_case(&self, case_id: &str) -> Result<Option<Case>> {
        Ok(self.cases.get(case_id).map(|c| c.clone()))
    }

    async fn list_cases(&self, filter: &CaseFilter) -> Result<Vec<Case>> {
        Ok(self
            .cases
            .iter()
            .filter(|c| filter.matches(c.value()))
            .map(|c| c.value().clone())
            .collect())
    }

    async fn commit_case(&self, next: &Case, expected_version: u64) -> Result<()> {
        let Some(mut stored) = self.cases.get_mut(&next.case_id) else {
            return Err(WildwatchError::not_found("case", &next.case_id));
        };
        if stored.version != expected_version {
            debug!(
                case_id = %next.case_id,
                expected = expected_version,
                actual = stored.version,
                "Case commit lost the race"
            );
            return Err(WildwatchError::ConcurrentModification(format!(
                "case {} was modified concurrently",
                next.case_id
            )));
        }
        let ledger = std::mem::take(&mut stored.investigation);
        *stored = next.clone();
        stored.investigation = ledger;
        stored.version = expected_version + 1;
        Ok(())
    }

    async fn append_ledger(&self, case_id: &str, entry: &LedgerEntry) -> Result<()> {
        let Some(mut stored) = self.cases.get_mut(case_id) else {
            return Err(WildwatchError::not_found("case", case_id));
        };
        if stored.status == CaseStatus::Closed {
            return Err(WildwatchError::InvalidState(format!(
                "case {} is closed",
                case_id
            )));
        }
        let at = now();
        stored.investigation.push(entry.clone().recorded_at(at));
        stored.updated_at = at;
        Ok(())
    }

    async fn delete_case(&self, case_id: &str) -> Result<bool> {
        Ok(self.cases.remove(case_id).is_some())
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn insert_notification(&self, notification: &Notification) -> Result<()> {
        self.notifications
            .insert(notification.id.clone(), notification.clone());
        Ok(())
    }

    async fn get_notification(&self, id: &str) -> Result<Option<Notification>> {
        Ok(self.notifications.get(id).map(|n| n.clone()))
    }

    async fn list_notifications(
        &self,
        recipient_id: &str,
        unread_only: bool,
    ) -> Result<Vec<Notification>> {
        let mut out: Vec<Notification> = self
            .notifications
            .iter()
            .filter(|n| n.recipient_id == recipient_id && (!unread_only || !n.read))
            .map(|n| n.value().clone())
            .collect();
        out.sort_by(|a, b| b.sent_at.cmp(&a.sent_at));
        Ok(out)
    }

    async fn mark_read(&self, id: &str) -> Result<bool> {
        match self.notifications.get_mut(id) {
            Some(mut n) => {
                let was_unread = !n.read;
                n.read = true;
                Ok(was_unread)
            }
            None => Err(WildwatchError::not_found("notification", id)),
        }
    }

    async fn mark_all_read(&self, recipient_id: &str) -> Result<u64> {
        let mut flipped = 0;
        for mut n in self.notifications.iter_mut() {
            if n.recipient_id == recipient_id && !n.read {
                n.read = true;
                flipped += 1;
            }
        }
        Ok(flipped)
    }

    async fn delete_notification(&self, id: &str) -> Result<bool> {
        Ok(self.notifications.remove(id).is_some())
    }
}

#[async_trait]
impl DirectoryStore for MemoryStore {
    async fn upsert_user(&self, user: &UserAccount) -> Result<UserAccount> {
        let mut stored = self
            .users
            .entry(user.id.clone())
            .or_insert_with(|| user.clone());
        if stored.name != user.name || stored.email != user.email {
            stored.name = user.name.clone();
            stored.email = user.email.clone();
            stored.updated_at = now();
        }
        Ok(stored.clone())
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<UserAccount>> {
        Ok(self.users.get(user_id).map(|u| u.clone()))
    }

    async fn list_users(&self) -> Result<Vec<UserAccount>> {
        let mut out: Vec<UserAccount> = self.users.iter().map(|u| u.value().clone()).collect();
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(out)
    }

    async fn set_user_role(&self, user_id: &str, role: Role) -> Result<Option<UserAccount>> {
        Ok(self.users.get_mut(user_id).map(|mut u| {
            u.role = role;
            u.updated_at = now();
            u.clone()
        }))
    }

    async fn insert_staff(&self, staff: &StaffMember) -> Result<()> {
        match self.staff_by_user.entry(staff.user_id.clone()) {
            Entry::Occupied(_) => Err(WildwatchError::Validation(format!(
                "user {} already has a staff profile",
                staff.user_id
            ))),
            Entry::Vacant(slot) => {
                self.staff.insert(staff.id.clone(), staff.clone());
                slot.insert(staff.id.clone());
                Ok(())
            }
        }
    }

    async fn get_staff(&self, staff_id: &str) -> Result<Option<StaffMember>> {
        Ok(self.staff.get(staff_id).map(|s| s.clone()))
    }

    async fn get_staff_by_user(&self, user_id: &str) -> Result<Option<StaffMember>> {
        let Some(staff_id) = self.staff_by_user.get(user_id).map(|id| id.clone()) else {
            return Ok(None);
        };
        Ok(self.staff.get(&staff_id).map(|s| s.clone()))
    }

    async fn list_staff(&self) -> Result<Vec<StaffMember>> {
        let mut out: Vec<StaffMember> = self.staff.iter().map(|s| s.value().clone()).collect();
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(out)
    }

    async fn update_staff(&self, staff: &StaffMember) -> Result<bool> {
        match self.staff.get_mut(&staff.id) {
            Some(mut stored) => {
                stored.department = staff.department;
                stored.permissions = staff.permissions.clone();
                stored.updated_at = staff.updated_at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_staff(&self, staff_id: &str) -> Result<bool> {
        match self.staff.remove(staff_id) {
            Some((_, staff)) => {
                self.staff_by_user.remove(&staff.user_id);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
