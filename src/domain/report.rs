//! Threat reports submitted by citizens

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::case::Priority;
use super::non_blank;
use crate::types::{Result, WildwatchError};

/// Kind of wildlife threat being reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ThreatType {
    Poaching,
    ForestFire,
    InjuredAnimal,
    IllegalLogging,
    HumanWildlifeConflict,
    Other,
}

impl ThreatType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThreatType::Poaching => "POACHING",
            ThreatType::ForestFire => "FOREST_FIRE",
            ThreatType::InjuredAnimal => "INJURED_ANIMAL",
            ThreatType::IllegalLogging => "ILLEGAL_LOGGING",
            ThreatType::HumanWildlifeConflict => "HUMAN_WILDLIFE_CONFLICT",
            ThreatType::Other => "OTHER",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_uppercase().as_str() {
            "POACHING" => Some(ThreatType::Poaching),
            "FOREST_FIRE" => Some(ThreatType::ForestFire),
            "INJURED_ANIMAL" => Some(ThreatType::InjuredAnimal),
            "ILLEGAL_LOGGING" => Some(ThreatType::IllegalLogging),
            "HUMAN_WILDLIFE_CONFLICT" => Some(ThreatType::HumanWildlifeConflict),
            "OTHER" => Some(ThreatType::Other),
            _ => None,
        }
    }
}

impl fmt::Display for ThreatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Urgency shares the priority scale used by cases
pub type UrgencyLevel = Priority;

/// Geographic location of an observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl Location {
    pub fn validate(&self) -> Result<()> {
        if !self.lat.is_finite() || !(-90.0..=90.0).contains(&self.lat) {
            return Err(WildwatchError::Validation(format!(
                "location.lat {} is out of range",
                self.lat
            )));
        }
        if !self.lng.is_finite() || !(-180.0..=180.0).contains(&self.lng) {
            return Err(WildwatchError::Validation(format!(
                "location.lng {} is out of range",
                self.lng
            )));
        }
        Ok(())
    }
}

/// Who reported the threat.
///
/// Anonymous reporters carry no contact fields at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Reporter {
    Identified {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        email: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        phone: Option<String>,
    },
    Anonymous,
}

impl Reporter {
    pub fn is_anonymous(&self) -> bool {
        matches!(self, Reporter::Anonymous)
    }
}

/// Reporter details as submitted by the client form
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReporterInput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub is_anonymous: bool,
}

impl ReporterInput {
    /// Convert the form shape into the tagged reporter.
    ///
    /// Contact fields sent alongside `isAnonymous=true` are discarded.
    pub fn into_reporter(self) -> Result<Reporter> {
        if self.is_anonymous {
            return Ok(Reporter::Anonymous);
        }
        match non_blank(self.name) {
            Some(name) => Ok(Reporter::Identified {
                name,
                email: non_blank(self.email),
                phone: non_blank(self.phone),
            }),
            None => Err(WildwatchError::Validation(
                "reporterInfo.name is required unless the report is anonymous".into(),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MediaType {
    Image,
    Video,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    pub url: String,
    pub media_type: MediaType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportStatus {
    Pending,
    Validated,
    Rejected,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Pending => "PENDING",
            ReportStatus::Validated => "VALIDATED",
            ReportStatus::Rejected => "REJECTED",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_uppercase().as_str() {
            "PENDING" => Some(ReportStatus::Pending),
            "VALIDATED" => Some(ReportStatus::Validated),
            "REJECTED" => Some(ReportStatus::Rejected),
            _ => None,
        }
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Officer decision on a pending report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewDecision {
    Validate,
    Reject,
}

impl ReviewDecision {
    pub fn target_status(&self) -> ReportStatus {
        match self {
            ReviewDecision::Validate => ReportStatus::Validated,
            ReviewDecision::Reject => ReportStatus::Rejected,
        }
    }
}

/// A stored threat report
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreatReport {
    pub report_id: String,
    pub threat_type: ThreatType,
    pub description: String,
    pub date_time: DateTime<Utc>,
    pub urgency_level: UrgencyLevel,
    pub location: Location,
    pub reporter: Reporter,
    /// Account that submitted the report. Never set for anonymous reports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_by: Option<String>,
    #[serde(default)]
    pub media: Vec<MediaItem>,
    pub status: ReportStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewed_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Report submission body
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReport {
    #[serde(default)]
    pub threat_type: Option<ThreatType>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub date_time: Option<String>,
    #[serde(default)]
    pub urgency_level: Option<UrgencyLevel>,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default)]
    pub reporter_info: Option<ReporterInput>,
    #[serde(default)]
    pub media: Vec<MediaItem>,
}

/// Filter for report listings
#[derive(Debug, Clone, Default)]
pub struct ReportFilter {
    pub status: Option<ReportStatus>,
    pub submitted_by: Option<String>,
}

impl ReportFilter {
    pub fn matches(&self, report: &ThreatReport) -> bool {
        if let Some(status) = self.status {
            if report.status != status {
                return false;
            }
        }
        if let Some(ref submitter) = self.submitted_by {
            if report.submitted_by.as_deref() != Some(submitter.as_str()) {
                return false;
            }
        }
        true
    }
}
