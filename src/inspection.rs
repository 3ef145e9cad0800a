//! Hourly inspection checklist kept alongside the production forms.

use chrono::{Local, NaiveDate};
use log::info;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

pub const HOURS: usize = 24;

pub const CHECKPOINTS: [&str; 4] = [
    "Security Check",
    "Equipment Status",
    "Safety Compliance",
    "General Condition",
];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InspectionError {
    #[error("hour {0} does not exist (0-23)")]
    NoSuchHour(usize),
    #[error("checkpoint {0} does not exist (1-4)")]
    NoSuchCheckpoint(usize),
    #[error("'{0}' is not a check status (pass, fail, na)")]
    InvalidStatus(String),
    #[error("missing required header fields: {}", .0.join(", "))]
    MissingHeaderFields(Vec<&'static str>),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Pass,
    Fail,
    #[default]
    Na,
}

impl FromStr for CheckStatus {
    type Err = InspectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pass" => Ok(CheckStatus::Pass),
            "fail" => Ok(CheckStatus::Fail),
            "na" | "n/a" | "" => Ok(CheckStatus::Na),
            _ => Err(InspectionError::InvalidStatus(s.to_string())),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectionEntry {
    pub hour: String,
    pub checkpoint1: CheckStatus,
    pub checkpoint2: CheckStatus,
    pub checkpoint3: CheckStatus,
    pub checkpoint4: CheckStatus,
    pub comments: String,
    pub inspector_initials: String,
}

impl InspectionEntry {
    fn for_hour(hour: usize) -> Self {
        InspectionEntry {
            hour: format!("{:02}:00", hour),
            checkpoint1: CheckStatus::Na,
            checkpoint2: CheckStatus::Na,
            checkpoint3: CheckStatus::Na,
            checkpoint4: CheckStatus::Na,
            comments: String::new(),
            inspector_initials: String::new(),
        }
    }

    pub fn checks(&self) -> [CheckStatus; 4] {
        [
            self.checkpoint1,
            self.checkpoint2,
            self.checkpoint3,
            self.checkpoint4,
        ]
    }

    fn count(&self, status: CheckStatus) -> usize {
        self.checks().iter().filter(|c| **c == status).count()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectionSummary {
    pub completed_hours: usize,
    pub passed_checks: usize,
    pub failed_checks: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectionForm {
    pub facility: String,
    pub date: NaiveDate,
    pub shift: String,
    pub inspector: String,
    pub entries: Vec<InspectionEntry>,
}

impl Default for InspectionForm {
    fn default() -> Self {
        InspectionForm {
            facility: String::new(),
            date: Local::now().date_naive(),
            shift: String::new(),
            inspector: String::new(),
            entries: (0..HOURS).map(InspectionEntry::for_hour).collect(),
        }
    }
}

impl InspectionForm {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry_mut(&mut self, hour: usize) -> Result<&mut InspectionEntry, InspectionError> {
        self.entries
            .get_mut(hour)
            .ok_or(InspectionError::NoSuchHour(hour))
    }

    /// Record a checkpoint result. `checkpoint` is 1-based.
    pub fn set_check(
        &mut self,
        hour: usize,
        checkpoint: usize,
        status: CheckStatus,
    ) -> Result<(), InspectionError> {
        let entry = self.entry_mut(hour)?;
        let slot = match checkpoint {
            1 => &mut entry.checkpoint1,
            2 => &mut entry.checkpoint2,
            3 => &mut entry.checkpoint3,
            4 => &mut entry.checkpoint4,
            other => return Err(InspectionError::NoSuchCheckpoint(other)),
        };
        *slot = status;
        Ok(())
    }

    pub fn set_comments(&mut self, hour: usize, comments: &str) -> Result<(), InspectionError> {
        self.entry_mut(hour)?.comments = comments.to_string();
        Ok(())
    }

    pub fn set_initials(&mut self, hour: usize, initials: &str) -> Result<(), InspectionError> {
        self.entry_mut(hour)?.inspector_initials = initials.trim().to_string();
        Ok(())
    }

    pub fn summary(&self) -> InspectionSummary {
        InspectionSummary {
            completed_hours: self
                .entries
                .iter()
                .filter(|e| e.checks().iter().any(|c| *c != CheckStatus::Na))
                .count(),
            passed_checks: self.entries.iter().map(|e| e.count(CheckStatus::Pass)).sum(),
            failed_checks: self.entries.iter().map(|e| e.count(CheckStatus::Fail)).sum(),
        }
    }

    pub fn validate_header(&self) -> Result<(), InspectionError> {
        let missing: Vec<&'static str> = [
            ("facility", &self.facility),
            ("shift", &self.shift),
            ("inspector", &self.inspector),
        ]
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| *name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(InspectionError::MissingHeaderFields(missing))
        }
    }

    /// Validate and hand back the saved snapshot.
    pub fn save(&self) -> Result<&Self, InspectionError> {
        self.validate_header()?;
        let summary = self.summary();
        info!(
            "inspection form saved: {} on {}, {}/{} hours, {} failed checks",
            self.facility, self.date, summary.completed_hours, HOURS, summary.failed_checks
        );
        Ok(self)
    }

    pub fn reset(&mut self) {
        *self = InspectionForm::default();
    }

    pub fn export_filename(&self) -> String {
        format!(
            "inspection-form-{}-{}.json",
            self.facility,
            self.date.format("%Y-%m-%d")
        )
    }
}
