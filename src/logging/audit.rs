//! Lifecycle audit log
//!
//! Writes one JSON object per line for every committed lifecycle change.
//! Without `init_file` the logger is a no-op.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::auth::{Actor, Role};
use crate::domain::CaseStatus;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    ReportSubmitted,
    ReportReviewed,
    ReportDeleted,
    CaseCreated,
    CaseUpdated,
    CaseAssigned,
    CaseTransitioned,
    CaseDeleted,
    LedgerAppended,
    RoleChanged,
    StaffChanged,
}

/// One audit record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub timestamp: DateTime<Utc>,
    pub event_type: AuditEventType,
    /// Node that committed the change
    pub node_id: String,
    pub actor_id: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_status: Option<CaseStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_status: Option<CaseStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl AuditEvent {
    pub fn new(event_type: AuditEventType, actor: &Actor) -> Self {
        Self {
            timestamp: Utc::now(),
            event_type,
            node_id: String::new(),
            actor_id: actor.id.clone(),
            role: actor.role,
            report_id: None,
            case_id: None,
            from_status: None,
            to_status: None,
            metadata: None,
        }
    }

    pub fn with_report(mut self, report_id: &str) -> Self {
        self.report_id = Some(report_id.to_string());
        self
    }

    pub fn with_case(mut self, case_id: &str) -> Self {
        self.case_id = Some(case_id.to_string());
        self
    }

    pub fn with_transition(mut self, from: CaseStatus, to: CaseStatus) -> Self {
        self.from_status = Some(from);
        self.to_status = Some(to);
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn to_jsonl(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Audit logger that appends events to a JSONL file
#[derive(Clone)]
pub struct AuditLogger {
    inner: Arc<Mutex<AuditLoggerInner>>,
    node_id: String,
}

struct AuditLoggerInner {
    writer: Option<BufWriter<File>>,
    path: Option<PathBuf>,
}

impl AuditLogger {
    pub fn new(node_id: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(AuditLoggerInner {
                writer: None,
                path: None,
            })),
            node_id: node_id.into(),
        }
    }

    /// Initialize file logging to the specified path
    pub async fn init_file(&self, path: PathBuf) -> std::io::Result<()> {
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        let writer = BufWriter::new(file);

        let mut inner = self.inner.lock().await;
        inner.writer = Some(writer);
        inner.path = Some(path.clone());

        info!("Audit logging initialized to {}", path.display());
        Ok(())
    }

    pub async fn is_enabled(&self) -> bool {
        self.inner.lock().await.writer.is_some()
    }

    pub async fn log(&self, mut event: AuditEvent) {
        event.node_id = self.node_id.clone();
        let jsonl = match event.to_jsonl() {
            Ok(line) => line,
            Err(e) => {
                error!("Failed to serialize audit event: {}", e);
                return;
            }
        };

        let mut inner = self.inner.lock().await;

        if let Some(ref mut writer) = inner.writer {
            if let Err(e) = writeln!(writer, "{}", jsonl) {
                error!("Failed to write audit event: {}", e);
            }
            if let Err(e) = writer.flush() {
                error!("Failed to flush audit log: {}", e);
            }
        }
    }
}
