//! Investigation ledger appends and reads

use std::sync::Arc;
use tracing::info;

use super::media::MediaResolver;
use crate::auth::{Actor, Operation};
use crate::db::Stores;
use crate::domain::{
    now, ActionInput, EvidenceInput, FindingInput, Investigation, LedgerAppend, LedgerInput,
};
use crate::logging::{AuditEvent, AuditEventType, AuditLogger};
use crate::types::{Result, WildwatchError};

#[derive(Clone)]
pub struct InvestigationLedger {
    stores: Stores,
    media: Arc<dyn MediaResolver>,
    audit: AuditLogger,
}

impl InvestigationLedger {
    pub fn new(stores: Stores, media: Arc<dyn MediaResolver>, audit: AuditLogger) -> Self {
        Self {
            stores,
            media,
            audit,
        }
    }

    pub async fn add_finding(&self, actor: &Actor, case_id: &str, input: FindingInput) -> Result<()> {
        self.append(actor, case_id, LedgerAppend::Finding(input)).await
    }

    pub async fn add_action(&self, actor: &Actor, case_id: &str, input: ActionInput) -> Result<()> {
        self.append(actor, case_id, LedgerAppend::Action(input)).await
    }

    pub async fn add_evidence(&self, actor: &Actor, case_id: &str, input: EvidenceInput) -> Result<()> {
        self.append(actor, case_id, LedgerAppend::Evidence(input)).await
    }

    /// Append from a `PUT /cases/{id}/investigation` body
    pub async fn append_input(&self, actor: &Actor, case_id: &str, input: LedgerInput) -> Result<()> {
        self.append(actor, case_id, input.into_append()?).await
    }

    /// Validate, confirm media, then append one entry.
    ///
    /// The closed check here is advisory; the store refuses the append
    /// atomically if the case closed in the meantime. The entry time is
    /// the store's commit time, so times follow ledger order.
    pub async fn append(&self, actor: &Actor, case_id: &str, append: LedgerAppend) -> Result<()> {
        actor.require(Operation::AppendLedger)?;
        let case = self
            .stores
            .cases
            .get_case(case_id)
            .await?
            .ok_or_else(|| WildwatchError::not_found("case", case_id))?;
        if case.status.is_terminal() {
            return Err(WildwatchError::InvalidState(format!(
                "case {} is closed; its investigation is read-only",
                case_id
            )));
        }

        let kind = append.kind();
        if let Some(url) = append.media_url().filter(|url| !url.is_empty()) {
            if !self.media.resolve(url).await? {
                return Err(WildwatchError::Validation(format!(
                    "evidence url {} does not refer to stored media",
                    url
                )));
            }
        }
        let entry = append.stamp(&actor.id, now())?;

        self.stores.cases.append_ledger(case_id, &entry).await?;

        info!(case_id = %case_id, kind = kind, by = %actor.id, "Investigation entry appended");
        self.audit
            .log(
                AuditEvent::new(AuditEventType::LedgerAppended, actor)
                    .with_case(case_id)
                    .with_metadata(serde_json::json!({ "kind": kind })),
            )
            .await;
        Ok(())
    }

    /// All three sequences in insertion order
    pub async fn get(&self, actor: &Actor, case_id: &str) -> Result<Investigation> {
        let case = self
            .stores
            .cases
            .get_case(case_id)
            .await?
            .ok_or_else(|| WildwatchError::not_found("case", case_id))?;
        actor.require_owned(
            Operation::ReadLedger,
            Operation::ReadOwnCases,
            case.reported_by.as_deref(),
        )?;
        Ok(case.investigation)
    }
}
