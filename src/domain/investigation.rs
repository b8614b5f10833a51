//! Investigation ledger embedded in each case
//!
//! Three append-only sequences. Nothing in the crate exposes an edit or
//! delete for individual entries; insertion order is the audit order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::non_blank;
use crate::types::{Result, WildwatchError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    #[serde(rename = "type")]
    pub finding_type: String,
    pub description: String,
    pub added_by: String,
    pub added_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionTaken {
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    pub taken_by: String,
    pub taken_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EvidenceType {
    Photo,
    Video,
    Document,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evidence {
    pub evidence_type: EvidenceType,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub uploaded_by: String,
    pub uploaded_at: DateTime<Utc>,
}

/// The ledger as stored on a case
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Investigation {
    #[serde(default)]
    pub findings: Vec<Finding>,
    #[serde(default)]
    pub actions: Vec<ActionTaken>,
    #[serde(default)]
    pub evidence: Vec<Evidence>,
}

impl Investigation {
    /// Append a stamped entry to its sequence
    pub fn push(&mut self, entry: LedgerEntry) {
        match entry {
            LedgerEntry::Finding(f) => self.findings.push(f),
            LedgerEntry::Action(a) => self.actions.push(a),
            LedgerEntry::Evidence(e) => self.evidence.push(e),
        }
    }

    pub fn len(&self) -> usize {
        self.findings.len() + self.actions.len() + self.evidence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindingInput {
    #[serde(default, rename = "type")]
    pub finding_type: Option<String>,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionInput {
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub result: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceInput {
    pub evidence_type: EvidenceType,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Body of `PUT /cases/{id}/investigation`; exactly one key must be present
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LedgerInput {
    #[serde(default)]
    pub findings: Option<FindingInput>,
    #[serde(default)]
    pub actions: Option<ActionInput>,
    #[serde(default)]
    pub evidence: Option<EvidenceInput>,
}

impl LedgerInput {
    pub fn into_append(self) -> Result<LedgerAppend> {
        match (self.findings, self.actions, self.evidence) {
            (Some(f), None, None) => Ok(LedgerAppend::Finding(f)),
            (None, Some(a), None) => Ok(LedgerAppend::Action(a)),
            (None, None, Some(e)) => Ok(LedgerAppend::Evidence(e)),
            (None, None, None) => Err(WildwatchError::Validation(
                "one of findings, actions or evidence is required".into(),
            )),
            _ => Err(WildwatchError::Validation(
                "only one of findings, actions or evidence may be appended per request".into(),
            )),
        }
    }
}

/// A validated-shape append request, not yet stamped
#[derive(Debug, Clone)]
pub enum LedgerAppend {
    Finding(FindingInput),
    Action(ActionInput),
    Evidence(EvidenceInput),
}

impl LedgerAppend {
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerAppend::Finding(_) => "finding",
            LedgerAppend::Action(_) => "action",
            LedgerAppend::Evidence(_) => "evidence",
        }
    }

    /// Evidence URL that must be confirmed by media storage before appending
    pub fn media_url(&self) -> Option<&str> {
        match self {
            LedgerAppend::Evidence(e) => Some(e.url.trim()),
            _ => None,
        }
    }

    /// Validate content and stamp with the acting staff member and time
    pub fn stamp(self, actor_id: &str, at: DateTime<Utc>) -> Result<LedgerEntry> {
        match self {
            LedgerAppend::Finding(input) => {
                let description = non_blank(Some(input.description)).ok_or_else(|| {
                    WildwatchError::Validation("finding description is required".into())
                })?;
                Ok(LedgerEntry::Finding(Finding {
                    finding_type: non_blank(input.finding_type).unwrap_or_else(|| "NOTE".into()),
                    description,
                    added_by: actor_id.to_string(),
                    added_at: at,
                }))
            }
            LedgerAppend::Action(input) => {
                let action = non_blank(Some(input.action)).ok_or_else(|| {
                    WildwatchError::Validation("action is required".into())
                })?;
                Ok(LedgerEntry::Action(ActionTaken {
                    action,
                    result: non_blank(input.result),
                    taken_by: actor_id.to_string(),
                    taken_at: at,
                }))
            }
            LedgerAppend::Evidence(input) => {
                let url = non_blank(Some(input.url)).ok_or_else(|| {
                    WildwatchError::Validation("evidence url is required".into())
                })?;
                Ok(LedgerEntry::Evidence(Evidence {
                    evidence_type: input.evidence_type,
                    url,
                    description: non_blank(input.description),
                    uploaded_by: actor_id.to_string(),
                    uploaded_at: at,
                }))
            }
        }
    }
}

/// A stamped entry ready to append
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerEntry {
    Finding(Finding),
    Action(ActionTaken),
    Evidence(Evidence),
}

impl LedgerEntry {
    /// Name of the embedded array this entry belongs to
    pub fn field(&self) -> &'static str {
        match self {
            LedgerEntry::Finding(_) => "findings",
            LedgerEntry::Action(_) => "actions",
            LedgerEntry::Evidence(_) => "evidence",
        }
    }

    /// Replace the entry time with the moment the store commits it
    pub fn recorded_at(mut self, at: DateTime<Utc>) -> Self {
        match &mut self {
            LedgerEntry::Finding(f) => f.added_at = at,
            LedgerEntry::Action(a) => a.taken_at = at,
            LedgerEntry::Evidence(e) => e.uploaded_at = at,
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::now;

    #[test]
    fn test_exactly_one_section() {
        let empty = LedgerInput::default();
        assert!(empty.into_append().is_err());

        let both: LedgerInput = serde_json::from_value(serde_json::json!({
            "findings": {"description": "tracks"},
            "actions": {"action": "patrol"}
        }))
        .unwrap();
        assert!(both.into_append().is_err());

        let one: LedgerInput = serde_json::from_value(serde_json::json!({
            "evidence": {"evidenceType": "PHOTO", "url": "https://media/1.jpg"}
        }))
        .unwrap();
        let append = one.into_append().unwrap();
        assert_eq!(append.kind(), "evidence");
        assert_eq!(append.media_url(), Some("https://media/1.jpg"));
    }

    #[test]
    fn test_finding_defaults_to_note() {
        let entry = LedgerAppend::Finding(FindingInput {
            finding_type: None,
            description: "saw truck tracks".into(),
        })
        .stamp("officer-1", now())
        .unwrap();
        match entry {
            LedgerEntry::Finding(f) => {
                assert_eq!(f.finding_type, "NOTE");
                assert_eq!(f.added_by, "officer-1");
            }
            other => panic!("unexpected entry {:?}", other),
        }
    }

    #[test]
    fn test_blank_content_rejected() {
        let finding = LedgerAppend::Finding(FindingInput {
            finding_type: Some("OBSERVATION".into()),
            description: "  ".into(),
        });
        assert!(matches!(
            finding.stamp("o", now()),
            Err(WildwatchError::Validation(_))
        ));
        let action = LedgerAppend::Action(ActionInput::default());
        assert!(action.stamp("o", now()).is_err());
    }

    #[test]
    fn test_push_keeps_insertion_order() {
        let mut ledger = Investigation::default();
        for i in 0..5 {
            let entry = LedgerAppend::Finding(FindingInput {
                finding_type: None,
                description: format!("finding {}", i),
            })
            .stamp("o", now())
            .unwrap();
            ledger.push(entry);
        }
        let descriptions: Vec<_> = ledger.findings.iter().map(|f| f.description.as_str()).collect();
        assert_eq!(
            descriptions,
            vec!["finding 0", "finding 1", "finding 2", "finding 3", "finding 4"]
        );
        assert_eq!(ledger.len(), 5);
    }
}
