//! Persistence for reports, cases, notifications and the staff directory
//!
//! Two backends implement the same traits: an in-process [`memory::MemoryStore`]
//! and [`mongo::MongoStore`]. Services only see the trait objects in [`Stores`].
//!
//! Case writes come in two shapes that never contend with each other:
//! - header commits (`commit_case`), a compare-and-swap on `version`
//! - ledger appends (`append_ledger`), atomic pushes refused once CLOSED

pub mod memory;
pub mod mongo;

use async_trait::async_trait;
use std::sync::Arc;

use crate::auth::Role;
use crate::domain::{
    Case, CaseFilter, LedgerEntry, Notification, ReportFilter, StaffMember, ThreatReport,
    UserAccount,
};
use crate::types::Result;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn insert_report(&self, report: &ThreatReport) -> Result<()>;

    async fn get_report(&self, report_id: &str) -> Result<Option<ThreatReport>>;

    /// Matching reports, newest first
    async fn list_reports(&self, filter: &ReportFilter) -> Result<Vec<ThreatReport>>;

    /// Store a reviewed report if the stored one is still PENDING.
    /// Returns false when someone else reviewed it first.
    async fn commit_review(&self, reviewed: &ThreatReport) -> Result<bool>;

    async fn delete_report(&self, report_id: &str) -> Result<bool>;
}

#[async_trait]
pub trait CaseStore: Send + Sync {
    async fn insert_case(&self, case: &Case) -> Result<()>;

    async fn get_case(&self, case_id: &str) -> Result<Option<Case>>;

    /// Matching cases in no particular order
    async fn list_cases(&self, filter: &CaseFilter) -> Result<Vec<Case>>;

    /// Replace the case header if the stored version equals `expected_version`.
    ///
    /// The embedded ledger is never written by a commit. Fails with
    /// `ConcurrentModification` on a version mismatch and `NotFound` when
    /// the case is gone.
    async fn commit_case(&self, next: &Case, expected_version: u64) -> Result<()>;

    /// Append one ledger entry, timed at commit. `InvalidState` once the case is CLOSED.
    async fn append_ledger(&self, case_id: &str, entry: &LedgerEntry) -> Result<()>;

    async fn delete_case(&self, case_id: &str) -> Result<bool>;
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn insert_notification(&self, notification: &Notification) -> Result<()>;

    async fn get_notification(&self, id: &str) -> Result<Option<Notification>>;

    /// Notifications for one recipient, newest first
    async fn list_notifications(
        &self,
        recipient_id: &str,
        unread_only: bool,
    ) -> Result<Vec<Notification>>;

    /// Flip `read`; returns whether it was unread before
    async fn mark_read(&self, id: &str) -> Result<bool>;

    /// Flip every unread notification of the recipient; returns how many
    async fn mark_all_read(&self, recipient_id: &str) -> Result<u64>;

    async fn delete_notification(&self, id: &str) -> Result<bool>;
}

#[async_trait]
pub trait DirectoryStore: Send + Sync {
    /// Insert the account if unknown, otherwise refresh name and email.
    /// The stored role is never overwritten here.
    async fn upsert_user(&self, user: &UserAccount) -> Result<UserAccount>;

    async fn get_user(&self, user_id: &str) -> Result<Option<UserAccount>>;

    async fn list_users(&self) -> Result<Vec<UserAccount>>;

    async fn set_user_role(&self, user_id: &str, role: Role) -> Result<Option<UserAccount>>;

    /// `Validation` if the account already has a staff profile
    async fn insert_staff(&self, staff: &StaffMember) -> Result<()>;

    async fn get_staff(&self, staff_id: &str) -> Result<Option<StaffMember>>;

    async fn get_staff_by_user(&self, user_id: &str) -> Result<Option<StaffMember>>;

    async fn list_staff(&self) -> Result<Vec<StaffMember>>;

    async fn update_staff(&self, staff: &StaffMember) -> Result<bool>;

    async fn delete_staff(&self, staff_id: &str) -> Result<bool>;

    /// Backend liveness for readiness probes
    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

/// The store handles shared by every service
#[derive(Clone)]
pub struct Stores {
    pub reports: Arc<dyn ReportStore>,
    pub cases: Arc<dyn CaseStore>,
    pub notifications: Arc<dyn NotificationStore>,
    pub directory: Arc<dyn DirectoryStore>,
    pub backend: &'static str,
}

impl Stores {
    pub fn memory() -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            reports: store.clone(),
            cases: store.clone(),
            notifications: store.clone(),
            directory: store,
            backend: "memory",
        }
    }

    pub async fn mongo(uri: &str, db_name: &str) -> Result<Self> {
        let store = Arc::new(MongoStore::connect(uri, db_name).await?);
        Ok(Self {
            reports: store.clone(),
            cases: store.clone(),
            notifications: store.clone(),
            directory: store,
            backend: "mongo",
        })
    }
}
