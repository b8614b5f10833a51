//! Services layer for Wildwatch
//!
//! Business logic between the HTTP routes and the stores. Every mutating
//! operation takes the calling [`Actor`](crate::auth::Actor) and consults the
//! access policy before touching storage.
//!
//! ## Services
//!
//! - **ReportIntake**: report submission, review and deletion
//! - **CaseLifecycle**: case state machine, assignment and updates
//! - **InvestigationLedger**: append-only findings, actions and evidence
//! - **NotificationDispatcher**: lifecycle notifications and read state
//! - **Directory**: accounts, staff profiles and actor resolution
//! - **MediaResolver**: confirms evidence URLs against media storage

pub mod directory;
pub mod dispatcher;
pub mod intake;
pub mod ledger;
pub mod lifecycle;
pub mod media;

use std::sync::Arc;

pub use directory::Directory;
pub use dispatcher::NotificationDispatcher;
pub use intake::{DeletedReport, ReportIntake};
pub use ledger::InvestigationLedger;
pub use lifecycle::{generate_case_id, AssignRequest, CaseLifecycle, CasePage};
pub use media::{HttpMediaResolver, HttpMediaResolverConfig, MediaResolver, MemoryMediaCatalog};

use crate::db::Stores;
use crate::logging::AuditLogger;

/// All engine components wired to one set of stores
#[derive(Clone)]
pub struct Engine {
    pub reports: ReportIntake,
    pub cases: CaseLifecycle,
    pub ledger: InvestigationLedger,
    pub notifications: NotificationDispatcher,
    pub directory: Directory,
    stores: Stores,
}

impl Engine {
    pub fn new(stores: Stores, media: Arc<dyn MediaResolver>, audit: AuditLogger) -> Self {
        let directory = Directory::new(stores.clone(), audit.clone());
        let notifications = NotificationDispatcher::new(stores.clone(), directory.clone());
        Self {
            reports: ReportIntake::new(stores.clone(), audit.clone()),
            cases: CaseLifecycle::new(
                stores.clone(),
                directory.clone(),
                notifications.clone(),
                audit.clone(),
            ),
            ledger: InvestigationLedger::new(stores.clone(), media, audit),
            notifications,
            directory,
            stores,
        }
    }

    /// In-memory engine with the given media catalog and no audit file
    pub fn in_memory(media: Arc<MemoryMediaCatalog>) -> Self {
        Self::new(Stores::memory(), media, AuditLogger::new("local"))
    }

    pub fn stores(&self) -> &Stores {
        &self.stores
    }
}
