//! Shared fixtures for engine integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use wildwatch::auth::{Actor, Capability, Role};
use wildwatch::db::{DirectoryStore, MemoryStore, Stores};
use wildwatch::domain::{
    Case, Department, Location, NewCase, NewReport, NewStaffMember, ReporterInput, StaffMember,
    ThreatReport, ThreatType, UserAccount,
};
use wildwatch::logging::AuditLogger;
use wildwatch::services::{Engine, MediaResolver, MemoryMediaCatalog};
use wildwatch::{Result, WildwatchError};

pub struct Fixture {
    pub engine: Engine,
    pub media: Arc<MemoryMediaCatalog>,
    pub admin: Actor,
}

impl Fixture {
    pub async fn new() -> Self {
        let media = Arc::new(MemoryMediaCatalog::new());
        let engine = Engine::in_memory(Arc::clone(&media));
        Self::with_engine(engine, media).await
    }

    /// Fixture whose staff listing fails once `directory.fail_staff_listing` is set
    pub async fn with_flaky_directory() -> (Self, Arc<FlakyDirectory>) {
        let memory = Arc::new(MemoryStore::new());
        let directory = Arc::new(FlakyDirectory::new(Arc::clone(&memory)));
        let stores = Stores {
            reports: memory.clone(),
            cases: memory.clone(),
            notifications: memory,
            directory: directory.clone(),
            backend: "memory",
        };
        let media = Arc::new(MemoryMediaCatalog::new());
        let engine = Engine::new(stores, media.clone(), AuditLogger::new("test"));
        (Self::with_engine(engine, media).await, directory)
    }

    /// Fixture whose media checks take `delay` before answering
    pub async fn with_slow_media(delay: Duration) -> Self {
        let media = Arc::new(MemoryMediaCatalog::new());
        let slow = Arc::new(SlowMedia {
            inner: Arc::clone(&media),
            delay,
        });
        let engine = Engine::new(Stores::memory(), slow, AuditLogger::new("test"));
        Self::with_engine(engine, media).await
    }

    async fn with_engine(engine: Engine, media: Arc<MemoryMediaCatalog>) -> Self {
        engine
            .directory
            .register("admin", "Park Admin", Some("admin@example.org"), Role::Admin)
            .await
            .unwrap();
        let admin = engine.directory.actor_for("admin").await.unwrap();
        Self {
            engine,
            media,
            admin,
        }
    }

    pub async fn citizen(&self, id: &str) -> Actor {
        self.engine
            .directory
            .register(id, id, None, Role::Citizen)
            .await
            .unwrap();
        self.engine.directory.actor_for(id).await.unwrap()
    }

    /// An officer account with a staff profile holding `permissions`
    pub async fn officer(&self, id: &str, permissions: &[Capability]) -> Actor {
        self.engine
            .directory
            .register(id, id, None, Role::Citizen)
            .await
            .unwrap();
        self.engine
            .directory
            .create_staff(
                &self.admin,
                NewStaffMember {
                    user_id: id.to_string(),
                    department: Department::Patrol,
                    permissions: permissions.iter().copied().collect::<BTreeSet<_>>(),
                },
            )
            .await
            .unwrap();
        self.engine.directory.actor_for(id).await.unwrap()
    }

    pub async fn submit_report(&self, citizen: &Actor, threat: ThreatType) -> ThreatReport {
        self.engine
            .reports
            .submit(citizen, report_input(threat))
            .await
            .unwrap()
    }

    /// Submit, validate and open a case from the report
    pub async fn open_case(&self, citizen: &Actor, threat: ThreatType) -> Case {
        let report = self.submit_report(citizen, threat).await;
        self.engine
            .reports
            .review(
                &self.admin,
                &report.report_id,
                wildwatch::domain::ReviewDecision::Validate,
            )
            .await
            .unwrap();
        self.engine
            .cases
            .create(
                &self.admin,
                NewCase {
                    source_report_id: Some(report.report_id),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
    }
}

pub fn report_input(threat: ThreatType) -> NewReport {
    NewReport {
        threat_type: Some(threat),
        description: Some("Three men with rifles near the eastern waterhole".into()),
        date_time: Some("2026-03-14T05:40".into()),
        urgency_level: None,
        location: Some(Location {
            lat: -2.33,
            lng: 34.83,
            address: Some("Eastern waterhole".into()),
        }),
        reporter_info: Some(ReporterInput {
            name: Some("Neema".into()),
            email: Some("neema@example.org".into()),
            phone: None,
            is_anonymous: false,
        }),
        media: vec![],
    }
}

/// Directory backed by memory whose staff listing can be made to fail
pub struct FlakyDirectory {
    inner: Arc<MemoryStore>,
    pub fail_staff_listing: AtomicBool,
}

impl FlakyDirectory {
    fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            fail_staff_listing: AtomicBool::new(false),
        }
    }

    pub fn break_staff_listing(&self) {
        self.fail_staff_listing.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl DirectoryStore for FlakyDirectory {
    async fn upsert_user(&self, user: &UserAccount) -> Result<UserAccount> {
        self.inner.upsert_user(user).await
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<UserAccount>> {
        self.inner.get_user(user_id).await
    }

    async fn list_users(&self) -> Result<Vec<UserAccount>> {
        self.inner.list_users().await
    }

    async fn set_user_role(&self, user_id: &str, role: Role) -> Result<Option<UserAccount>> {
        self.inner.set_user_role(user_id, role).await
    }

    async fn insert_staff(&self, staff: &StaffMember) -> Result<()> {
        self.inner.insert_staff(staff).await
    }

    async fn get_staff(&self, staff_id: &str) -> Result<Option<StaffMember>> {
        self.inner.get_staff(staff_id).await
    }

    async fn get_staff_by_user(&self, user_id: &str) -> Result<Option<StaffMember>> {
        self.inner.get_staff_by_user(user_id).await
    }

    async fn list_staff(&self) -> Result<Vec<StaffMember>> {
        if self.fail_staff_listing.load(Ordering::SeqCst) {
            return Err(WildwatchError::DependencyUnavailable(
                "database: connection reset".into(),
            ));
        }
        self.inner.list_staff().await
    }

    async fn update_staff(&self, staff: &StaffMember) -> Result<bool> {
        self.inner.update_staff(staff).await
    }

    async fn delete_staff(&self, staff_id: &str) -> Result<bool> {
        self.inner.delete_staff(staff_id).await
    }
}

/// Media catalog that answers only after a delay
struct SlowMedia {
    inner: Arc<MemoryMediaCatalog>,
    delay: Duration,
}

#[async_trait]
impl MediaResolver for SlowMedia {
    async fn resolve(&self, url: &str) -> Result<bool> {
        tokio::time::sleep(self.delay).await;
        self.inner.resolve(url).await
    }
}
