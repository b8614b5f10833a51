//! MongoDB store
//!
//! One collection per entity. Cases embed their investigation ledger; ledger
//! appends are `$push` updates guarded by `status != CLOSED`, and header
//! commits are `$set` updates guarded by `version`. Neither touches the
//! other's fields.
//!
//! Timestamps are stored as RFC 3339 strings, so ordering happens after the
//! fetch rather than in the query.

use async_trait::async_trait;
use bson::{doc, Bson, Document};
use futures::TryStreamExt;
use mongodb::{
    error::{ErrorKind, WriteFailure},
    options::{IndexOptions, ReturnDocument},
    Client, Collection, Database, IndexModel,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info};

use super::{CaseStore, DirectoryStore, NotificationStore, ReportStore};
use crate::auth::Role;
use crate::domain::{
    now, Case, CaseFilter, CaseStatus, LedgerEntry, Notification, ReportFilter, ReportStatus,
    StaffMember, ThreatReport, UserAccount,
};
use crate::types::{Result, WildwatchError};

const REPORTS: &str = "reports";
const CASES: &str = "cases";
const NOTIFICATIONS: &str = "notifications";
const USERS: &str = "users";
const STAFF: &str = "staff";

/// Store backed by a MongoDB database
#[derive(Clone)]
pub struct MongoStore {
    db: Database,
    reports: Collection<ThreatReport>,
    cases: Collection<Case>,
    notifications: Collection<Notification>,
    users: Collection<UserAccount>,
    staff: Collection<StaffMember>,
}

impl MongoStore {
    /// Connect, verify with a ping and ensure indexes
    pub async fn connect(uri: &str, db_name: &str) -> Result<Self> {
        info!("Connecting to MongoDB at {}", uri);

        // Use serverSelectionTimeoutMS to avoid hanging on unreachable MongoDB
        let timeout_uri = if uri.contains('?') {
            format!("{}&serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        } else {
            format!("{}?serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        };

        let client = Client::with_uri_str(&timeout_uri).await.map_err(|e| {
            WildwatchError::DependencyUnavailable(format!("Failed to connect to MongoDB: {}", e))
        })?;
        let db = client.database(db_name);

        db.run_command(doc! { "ping": 1 }).await.map_err(|e| {
            WildwatchError::DependencyUnavailable(format!("MongoDB ping failed: {}", e))
        })?;

        let store = Self {
            reports: db.collection(REPORTS),
            cases: db.collection(CASES),
            notifications: db.collection(NOTIFICATIONS),
            users: db.collection(USERS),
            staff: db.collection(STAFF),
            db,
        };
        store.apply_indexes().await?;

        info!("Connected to MongoDB database '{}'", db_name);
        Ok(store)
    }

    async fn apply_indexes(&self) -> Result<()> {
        unique_index(&self.reports, "reportId").await?;
        unique_index(&self.cases, "caseId").await?;
        unique_index(&self.notifications, "id").await?;
        unique_index(&self.users, "id").await?;
        unique_index(&self.staff, "id").await?;
        unique_index(&self.staff, "userId").await?;

        self.notifications
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "recipientId": 1, "read": 1 })
                    .build(),
            )
            .await?;
        self.cases
            .create_index(IndexModel::builder().keys(doc! { "status": 1 }).build())
            .await?;
        Ok(())
    }

    async fn case_exists(&self, case_id: &str) -> Result<bool> {
        Ok(self
            .cases
            .count_documents(doc! { "caseId": case_id })
            .await?
            > 0)
    }
}

async fn unique_index<T: Send + Sync>(coll: &Collection<T>, field: &str) -> Result<()> {
    let mut keys = Document::new();
    keys.insert(field, 1);
    let model = IndexModel::builder()
        .keys(keys)
        .options(IndexOptions::builder().unique(true).build())
        .build();
    coll.create_index(model).await?;
    Ok(())
}

async fn find_all<T>(coll: &Collection<T>, filter: Document) -> Result<Vec<T>>
where
    T: DeserializeOwned + Unpin + Send + Sync,
{
    let cursor = coll.find(filter).await?;
    Ok(cursor.try_collect().await?)
}

fn to_bson<T: Serialize>(value: &T) -> Result<Bson> {
    Ok(bson::to_bson(value)?)
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(we)) if we.code == 11000
    )
}

#[async_trait]
impl ReportStore for MongoStore {
    async fn insert_report(&self, report: &ThreatReport) -> Result<()> {
        self.reports.insert_one(report).await?;
        Ok(())
    }

    async fn get_report(&self, report_id: &str) -> Result<Option<ThreatReport>> {
        Ok(self.reports.find_one(doc! { "reportId": report_id }).await?)
    }

    async fn list_reports(&self, filter: &ReportFilter) -> Result<Vec<ThreatReport>> {
        let mut query = Document::new();
        if let Some(status) = filter.status {
            query.insert("status", status.as_str());
        }
        if let Some(ref submitter) = filter.submitted_by {
            query.insert("submittedBy", submitter.as_str());
        }
        let mut out = find_all(&self.reports, query).await?;
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    async fn commit_review(&self, reviewed: &ThreatReport) -> Result<bool> {
        let result = self
            .reports
            .replace_one(
                doc! {
                    "reportId": reviewed.report_id.as_str(),
                    "status": ReportStatus::Pending.as_str(),
                },
                reviewed,
            )
            .await?;
        if result.matched_count > 0 {
            return Ok(true);
        }
        match self.get_report(&reviewed.report_id).await? {
            Some(_) => Ok(false),
            None => Err(WildwatchError::not_found("report", &reviewed.report_id)),
        }
    }

    async fn delete_report(&self, report_id: &str) -> Result<bool> {
        let result = self
            .reports
            .delete_one(doc! { "reportId": report_id })
            .await?;
        Ok(result.deleted_count > 0)
    }
}

#[async_trait]
impl CaseStore for MongoStore {
    async fn insert_case(&self, case: &Case) -> Result<()> {
        self.cases.insert_one(case).await?;
        Ok(())
    }

    async fn get_case(&self, case_id: &str) -> Result<Option<Case>> {
        Ok(self.cases.find_one(doc! { "caseId": case_id }).await?)
    }

    async fn list_cases(&self, filter: &CaseFilter) -> Result<Vec<Case>> {
        let mut query = Document::new();
        if let Some(status) = filter.status {
            query.insert("status", status.as_str());
        }
        if let Some(priority) = filter.priority {
            query.insert("priority", priority.as_str());
        }
        if let Some(threat) = filter.threat_type {
            query.insert("threatType", threat.as_str());
        }
        if let Some(ref reporter) = filter.reported_by {
            query.insert("reportedBy", reporter.as_str());
        }
        if let Some(ref report_id) = filter.source_report_id {
            query.insert("sourceReportId", report_id.as_str());
        }
        // Free-text search is applied here rather than with a text index
        let mut out = find_all(&self.cases, query).await?;
        out.retain(|c| filter.matches(c));
        Ok(out)
    }

    async fn commit_case(&self, next: &Case, expected_version: u64) -> Result<()> {
        let mut header = bson::to_document(next)?;
        header.remove("investigation");
        header.remove("_id");
        header.insert("version", (expected_version + 1) as i64);

        let result = self
            .cases
            .update_one(
                doc! { "caseId": next.case_id.as_str(), "version": expected_version as i64 },
                doc! { "$set": header },
            )
            .await?;
        if result.matched_count > 0 {
            return Ok(());
        }
        if self.case_exists(&next.case_id).await? {
            debug!(case_id = %next.case_id, expected = expected_version, "Case commit lost the race");
            Err(WildwatchError::ConcurrentModification(format!(
                "case {} was modified concurrently",
                next.case_id
            )))
        } else {
            Err(WildwatchError::not_found("case", &next.case_id))
        }
    }

    async fn append_ledger(&self, case_id: &str, entry: &LedgerEntry) -> Result<()> {
        let at = now();
        let entry = entry.clone().recorded_at(at);
        let value = match &entry {
            LedgerEntry::Finding(f) => to_bson(f)?,
            LedgerEntry::Action(a) => to_bson(a)?,
            LedgerEntry::Evidence(e) => to_bson(e)?,
        };
        let mut push = Document::new();
        push.insert(format!("investigation.{}", entry.field()), value);
        let result = self
            .cases
            .update_one(
                doc! { "caseId": case_id, "status": { "$ne": CaseStatus::Closed.as_str() } },
                doc! {
                    "$push": push,
                    "$set": { "updatedAt": at.to_rfc3339() },
                },
            )
            .await?;
        if result.matched_count > 0 {
            return Ok(());
        }
        if self.case_exists(case_id).await? {
            Err(WildwatchError::InvalidState(format!(
                "case {} is closed",
                case_id
            )))
        } else {
            Err(WildwatchError::not_found("case", case_id))
        }
    }

    async fn delete_case(&self, case_id: &str) -> Result<bool> {
        let result = self.cases.delete_one(doc! { "caseId": case_id }).await?;
        Ok(result.deleted_count > 0)
    }
}

#[async_trait]
impl NotificationStore for MongoStore {
    async fn insert_notification(&self, notification: &Notification) -> Result<()> {
        self.notifications.insert_one(notification).await?;
        Ok(())
    }

    async fn get_notification(&self, id: &str) -> Result<Option<Notification>> {
        Ok(self.notifications.find_one(doc! { "id": id }).await?)
    }

    async fn list_notifications(
        &self,
        recipient_id: &str,
        unread_only: bool,
    ) -> Result<Vec<Notification>> {
        let mut query = doc! { "recipientId": recipient_id };
        if unread_only {
            query.insert("read", false);
        }
        let mut out = find_all(&self.notifications, query).await?;
        out.sort_by(|a, b| b.sent_at.cmp(&a.sent_at));
        Ok(out)
    }

    async fn mark_read(&self, id: &str) -> Result<bool> {
        let result = self
            .notifications
            .update_one(doc! { "id": id }, doc! { "$set": { "read": true } })
            .await?;
        if result.matched_count == 0 {
            return Err(WildwatchError::not_found("notification", id));
        }
        Ok(result.modified_count > 0)
    }

    async fn mark_all_read(&self, recipient_id: &str) -> Result<u64> {
        let result = self
            .notifications
            .update_many(
                doc! { "recipientId": recipient_id, "read": false },
                doc! { "$set": { "read": true } },
            )
            .await?;
        Ok(result.modified_count)
    }

    async fn delete_notification(&self, id: &str) -> Result<bool> {
        let result = self.notifications.delete_one(doc! { "id": id }).await?;
        Ok(result.deleted_count > 0)
    }
}

#[async_trait]
impl DirectoryStore for MongoStore {
    async fn upsert_user(&self, user: &UserAccount) -> Result<UserAccount> {
        let stamp = now().to_rfc3339();
        let stored = self
            .users
            .find_one_and_update(
                doc! { "id": user.id.as_str() },
                doc! {
                    "$set": {
                        "name": user.name.as_str(),
                        "email": user.email.clone(),
                        "updatedAt": stamp.as_str(),
                    },
                    "$setOnInsert": {
                        "id": user.id.as_str(),
                        "role": to_bson(&user.role)?,
                        "createdAt": user.created_at.to_rfc3339(),
                    },
                },
            )
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await?;
        stored.ok_or_else(|| {
            WildwatchError::Internal(format!("upsert of user {} returned nothing", user.id))
        })
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<UserAccount>> {
        Ok(self.users.find_one(doc! { "id": user_id }).await?)
    }

    async fn list_users(&self) -> Result<Vec<UserAccount>> {
        let mut out = find_all(&self.users, Document::new()).await?;
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(out)
    }

    async fn set_user_role(&self, user_id: &str, role: Role) -> Result<Option<UserAccount>> {
        Ok(self
            .users
            .find_one_and_update(
                doc! { "id": user_id },
                doc! { "$set": { "role": to_bson(&role)?, "updatedAt": now().to_rfc3339() } },
            )
            .return_document(ReturnDocument::After)
            .await?)
    }

    async fn insert_staff(&self, staff: &StaffMember) -> Result<()> {
        match self.staff.insert_one(staff).await {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_key(&e) => Err(WildwatchError::Validation(format!(
                "user {} already has a staff profile",
                staff.user_id
            ))),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_staff(&self, staff_id: &str) -> Result<Option<StaffMember>> {
        Ok(self.staff.find_one(doc! { "id": staff_id }).await?)
    }

    async fn get_staff_by_user(&self, user_id: &str) -> Result<Option<StaffMember>> {
        Ok(self.staff.find_one(doc! { "userId": user_id }).await?)
    }

    async fn list_staff(&self) -> Result<Vec<StaffMember>> {
        let mut out = find_all(&self.staff, Document::new()).await?;
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(out)
    }

    async fn update_staff(&self, staff: &StaffMember) -> Result<bool> {
        let result = self
            .staff
            .update_one(
                doc! { "id": staff.id.as_str() },
                doc! {
                    "$set": {
                        "department": to_bson(&staff.department)?,
                        "permissions": to_bson(&staff.permissions)?,
                        "updatedAt": staff.updated_at.to_rfc3339(),
                    }
                },
            )
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn delete_staff(&self, staff_id: &str) -> Result<bool> {
        let result = self.staff.delete_one(doc! { "id": staff_id }).await?;
        Ok(result.deleted_count > 0)
    }

    async fn ping(&self) -> Result<()> {
        self.db.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }
}
