use crate::measurement::{Measurement, MeasurementError};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

lazy_static! {
    static ref TIME_REGEX: Regex = Regex::new(r"^([01][0-9]|2[0-3]):[0-5][0-9]$").unwrap();
}

pub const VISUAL_OPTIONS: &[&str] = &["-", "Pass", "Fail"];
pub const PRINT_OPTIONS: &[&str] = &["-", "Pass", "Fail"];
pub const DIE_HEAD_OPTIONS: &[&str] = &["-", "Yes", "No"];
pub const SCRAP_CODES: &[&str] = &["A", "B", "C", "D"];

/// Whether a row may still be freely edited.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RowState {
    #[default]
    Open,
    Locked,
}

/// One sampling interval of a production run, raw operator input only.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductionEntry {
    pub start: String,
    pub end: String,

    pub od_average: Measurement,
    pub od_maximum: Measurement,
    pub od_minimum: Measurement,
    pub od_end: Measurement,

    pub wall_minimum: Measurement,
    pub wall_maximum: Measurement,

    pub visual: String,
    pub print: String,

    pub od_at_saw: Measurement,
    pub od_at_vac_tank: Measurement,
    pub melt_press: Measurement,
    pub die_head_clean: String,

    pub unit_start: Measurement,
    pub unit_end: Measurement,
    #[serde(rename = "actualPPH")]
    pub actual_pph: Measurement,
    pub actual_wt_per_ft: Measurement,

    pub accepted_ft: Measurement,
    pub accepted_lbs: Measurement,
    pub scrap_fts: Measurement,
    pub scrap_lbs: Measurement,
    pub scrap_code: String,
    pub regrind_consumed: Measurement,

    pub state: RowState,
}

/// Operator-editable columns of a production row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryField {
    Start,
    End,
    OdAverage,
    OdMaximum,
    OdMinimum,
    OdEnd,
    WallMinimum,
    WallMaximum,
    Visual,
    Print,
    OdAtSaw,
    OdAtVacTank,
    MeltPress,
    DieHeadClean,
    UnitStart,
    UnitEnd,
    ActualPph,
    ActualWtPerFt,
    AcceptedFt,
    AcceptedLbs,
    ScrapFts,
    ScrapLbs,
    ScrapCode,
    RegrindConsumed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    Time,
    Measure,
    Count,
    Choice(&'static [&'static str]),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum FieldError {
    #[error("unknown entry field '{0}'")]
    UnknownField(String),
    #[error("'{0}' is not a time of day (HH:MM)")]
    InvalidTime(String),
    #[error("'{value}' is not one of {allowed:?}")]
    InvalidChoice {
        value: String,
        allowed: &'static [&'static str],
    },
    #[error(transparent)]
    Measurement(#[from] MeasurementError),
}

impl EntryField {
    pub const ALL: [EntryField; 24] = [
        EntryField::Start,
        EntryField::End,
        EntryField::OdAverage,
        EntryField::OdMaximum,
        EntryField::OdMinimum,
        EntryField::OdEnd,
        EntryField::WallMinimum,
        EntryField::WallMaximum,
        EntryField::Visual,
        EntryField::Print,
        EntryField::OdAtSaw,
        EntryField::OdAtVacTank,
        EntryField::MeltPress,
        EntryField::DieHeadClean,
        EntryField::UnitStart,
        EntryField::UnitEnd,
        EntryField::ActualPph,
        EntryField::ActualWtPerFt,
        EntryField::AcceptedFt,
        EntryField::AcceptedLbs,
        EntryField::ScrapFts,
        EntryField::ScrapLbs,
        EntryField::ScrapCode,
        EntryField::RegrindConsumed,
    ];

    /// Fields that must be filled before another row can be started.
    ///
    /// Quality choices (visual, print, die head) are optional.
    pub const REQUIRED: [EntryField; 21] = [
        EntryField::Start,
        EntryField::End,
        EntryField::OdAverage,
        EntryField::OdMaximum,
        EntryField::OdMinimum,
        EntryField::OdEnd,
        EntryField::WallMinimum,
        EntryField::WallMaximum,
        EntryField::OdAtSaw,
        EntryField::OdAtVacTank,
        EntryField::MeltPress,
        EntryField::UnitStart,
        EntryField::UnitEnd,
        EntryField::ActualPph,
        EntryField::ActualWtPerFt,
        EntryField::AcceptedFt,
        EntryField::AcceptedLbs,
        EntryField::ScrapFts,
        EntryField::ScrapLbs,
        EntryField::ScrapCode,
        EntryField::RegrindConsumed,
    ];

    /// Fields that may still be corrected after a row has been locked.
    pub const EDITABLE_WHEN_LOCKED: [EntryField; 7] = [
        EntryField::End,
        EntryField::Visual,
        EntryField::Print,
        EntryField::DieHeadClean,
        EntryField::ScrapFts,
        EntryField::ScrapLbs,
        EntryField::ScrapCode,
    ];

    /// Fields of the first row held back until the target limits are known.
    pub const NEEDS_TARGET_SPECS: [EntryField; 7] = [
        EntryField::Start,
        EntryField::OdAverage,
        EntryField::OdMaximum,
        EntryField::OdMinimum,
        EntryField::OdEnd,
        EntryField::WallMinimum,
        EntryField::WallMaximum,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            EntryField::Start => "start",
            EntryField::End => "end",
            EntryField::OdAverage => "odAverage",
            EntryField::OdMaximum => "odMaximum",
            EntryField::OdMinimum => "odMinimum",
            EntryField::OdEnd => "odEnd",
            EntryField::WallMinimum => "wallMinimum",
            EntryField::WallMaximum => "wallMaximum",
            EntryField::Visual => "visual",
            EntryField::Print => "print",
            EntryField::OdAtSaw => "odAtSaw",
            EntryField::OdAtVacTank => "odAtVacTank",
            EntryField::MeltPress => "meltPress",
            EntryField::DieHeadClean => "dieHeadClean",
            EntryField::UnitStart => "unitStart",
            EntryField::UnitEnd => "unitEnd",
            EntryField::ActualPph => "actualPPH",
            EntryField::ActualWtPerFt => "actualWtPerFt",
            EntryField::AcceptedFt => "acceptedFt",
            EntryField::AcceptedLbs => "acceptedLbs",
            EntryField::ScrapFts => "scrapFts",
            EntryField::ScrapLbs => "scrapLbs",
            EntryField::ScrapCode => "scrapCode",
            EntryField::RegrindConsumed => "regrindConsumed",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, FieldError> {
        EntryField::ALL
            .iter()
            .copied()
            .find(|field| field.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| FieldError::UnknownField(name.to_string()))
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            EntryField::Start | EntryField::End => FieldKind::Time,
            EntryField::UnitStart
            | EntryField::UnitEnd
            | EntryField::AcceptedFt
            | EntryField::ScrapFts => FieldKind::Count,
            EntryField::Visual => FieldKind::Choice(VISUAL_OPTIONS),
            EntryField::Print => FieldKind::Choice(PRINT_OPTIONS),
            EntryField::DieHeadClean => FieldKind::Choice(DIE_HEAD_OPTIONS),
            EntryField::ScrapCode => FieldKind::Choice(SCRAP_CODES),
            _ => FieldKind::Measure,
        }
    }

    pub fn editable_when_locked(&self) -> bool {
        EntryField::EDITABLE_WHEN_LOCKED.contains(self)
    }
}

/// A parsed, type-checked value ready to be stored in a row.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Text(String),
    Number(Measurement),
}

impl FieldValue {
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Text(s) => s.is_empty(),
            FieldValue::Number(m) => !m.is_set(),
        }
    }

    pub fn as_text(&self) -> String {
        match self {
            FieldValue::Text(s) => s.clone(),
            FieldValue::Number(m) => m.to_string(),
        }
    }
}

/// Parse raw operator input for `field`. Blank input always clears the field.
pub fn parse_field(field: EntryField, raw: &str) -> Result<FieldValue, FieldError> {
    let trimmed = raw.trim();
    match field.kind() {
        FieldKind::Time => {
            if trimmed.is_empty() || TIME_REGEX.is_match(trimmed) {
                Ok(FieldValue::Text(trimmed.to_string()))
            } else {
                Err(FieldError::InvalidTime(trimmed.to_string()))
            }
        }
        FieldKind::Measure => {
            if trimmed == crate::measurement::NOT_APPLICABLE {
                return Err(MeasurementError::NotANumber(trimmed.to_string()).into());
            }
            Ok(FieldValue::Number(Measurement::parse(trimmed)?))
        }
        FieldKind::Count => Ok(FieldValue::Number(Measurement::parse_count(trimmed)?)),
        FieldKind::Choice(allowed) => {
            if trimmed.is_empty() {
                return Ok(FieldValue::Text(String::new()));
            }
            allowed
                .iter()
                .find(|option| option.eq_ignore_ascii_case(trimmed))
                .map(|option| FieldValue::Text(option.to_string()))
                .ok_or_else(|| FieldError::InvalidChoice {
                    value: trimmed.to_string(),
                    allowed,
                })
        }
    }
}

impl ProductionEntry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_locked(&self) -> bool {
        self.state == RowState::Locked
    }

    pub fn lock(&mut self) {
        self.state = RowState::Locked;
    }

    pub fn get(&self, field: EntryField) -> FieldValue {
        match field {
            EntryField::Start => FieldValue::Text(self.start.clone()),
            EntryField::End => FieldValue::Text(self.end.clone()),
            EntryField::Visual => FieldValue::Text(self.visual.clone()),
            EntryField::Print => FieldValue::Text(self.print.clone()),
            EntryField::DieHeadClean => FieldValue::Text(self.die_head_clean.clone()),
            EntryField::ScrapCode => FieldValue::Text(self.scrap_code.clone()),
            other => FieldValue::Number(self.measurement(other)),
        }
    }

    /// Store an already-validated value. Mismatched value kinds are ignored.
    pub(crate) fn store(&mut self, field: EntryField, value: FieldValue) {
        match value {
            FieldValue::Text(text) => {
                if let Some(slot) = self.text_slot(field) {
                    *slot = text;
                }
            }
            FieldValue::Number(m) => {
                if let Some(slot) = self.measurement_slot(field) {
                    *slot = m;
                }
            }
        }
    }

    fn text_slot(&mut self, field: EntryField) -> Option<&mut String> {
        match field {
            EntryField::Start => Some(&mut self.start),
            EntryField::End => Some(&mut self.end),
            EntryField::Visual => Some(&mut self.visual),
            EntryField::Print => Some(&mut self.print),
            EntryField::DieHeadClean => Some(&mut self.die_head_clean),
            EntryField::ScrapCode => Some(&mut self.scrap_code),
            _ => None,
        }
    }

    fn measurement_slot(&mut self, field: EntryField) -> Option<&mut Measurement> {
        let slot = match field {
            EntryField::OdAverage => &mut self.od_average,
            EntryField::OdMaximum => &mut self.od_maximum,
            EntryField::OdMinimum => &mut self.od_minimum,
            EntryField::OdEnd => &mut self.od_end,
            EntryField::WallMinimum => &mut self.wall_minimum,
            EntryField::WallMaximum => &mut self.wall_maximum,
            EntryField::OdAtSaw => &mut self.od_at_saw,
            EntryField::OdAtVacTank => &mut self.od_at_vac_tank,
            EntryField::MeltPress => &mut self.melt_press,
            EntryField::UnitStart => &mut self.unit_start,
            EntryField::UnitEnd => &mut self.unit_end,
            EntryField::ActualPph => &mut self.actual_pph,
            EntryField::ActualWtPerFt => &mut self.actual_wt_per_ft,
            EntryField::AcceptedFt => &mut self.accepted_ft,
            EntryField::AcceptedLbs => &mut self.accepted_lbs,
            EntryField::ScrapFts => &mut self.scrap_fts,
            EntryField::ScrapLbs => &mut self.scrap_lbs,
            EntryField::RegrindConsumed => &mut self.regrind_consumed,
            _ => return None,
        };
        Some(slot)
    }

    fn measurement(&self, field: EntryField) -> Measurement {
        match field {
            EntryField::OdAverage => self.od_average,
            EntryField::OdMaximum => self.od_maximum,
            EntryField::OdMinimum => self.od_minimum,
            EntryField::OdEnd => self.od_end,
            EntryField::WallMinimum => self.wall_minimum,
            EntryField::WallMaximum => self.wall_maximum,
            EntryField::OdAtSaw => self.od_at_saw,
            EntryField::OdAtVacTank => self.od_at_vac_tank,
            EntryField::MeltPress => self.melt_press,
            EntryField::UnitStart => self.unit_start,
            EntryField::UnitEnd => self.unit_end,
            EntryField::ActualPph => self.actual_pph,
            EntryField::ActualWtPerFt => self.actual_wt_per_ft,
            EntryField::AcceptedFt => self.accepted_ft,
            EntryField::AcceptedLbs => self.accepted_lbs,
            EntryField::ScrapFts => self.scrap_fts,
            EntryField::ScrapLbs => self.scrap_lbs,
            EntryField::RegrindConsumed => self.regrind_consumed,
            _ => Measurement::Unset,
        }
    }

    /// The operator has begun this interval.
    pub fn is_started(&self) -> bool {
        !self.start.is_empty() || self.od_average.is_set() || self.unit_start.is_set()
    }

    /// Required fields that are still blank, in column order.
    pub fn missing_required(&self) -> Vec<EntryField> {
        EntryField::REQUIRED
            .iter()
            .copied()
            .filter(|field| self.get(*field).is_empty())
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.missing_required().is_empty()
    }

    /// Holds data beyond the start time and unit number carried from the previous row.
    pub fn has_significant_data(&self) -> bool {
        EntryField::ALL
            .iter()
            .filter(|field| !matches!(field, EntryField::Start | EntryField::UnitStart))
            .any(|field| !self.get(*field).is_empty())
    }

    /// Counts toward the tab's "unsaved data" prompt.
    pub fn has_data(&self) -> bool {
        !self.start.is_empty()
            || !self.end.is_empty()
            || self.od_average.is_set()
            || self.unit_start.is_set()
            || !self.visual.is_empty()
            || !self.print.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_names_round_trip() {
        for field in EntryField::ALL {
            assert_eq!(EntryField::from_name(field.name()).unwrap(), field);
        }
        assert_eq!(EntryField::from_name("ACTUALPPH").unwrap(), EntryField::ActualPph);
        assert!(matches!(
            EntryField::from_name("outOfRound"),
            Err(FieldError::UnknownField(_))
        ));
    }

    #[test]
    fn parses_each_field_kind() {
        assert_eq!(
            parse_field(EntryField::Start, "07:30").unwrap(),
            FieldValue::Text("07:30".to_string())
        );
        assert!(matches!(
            parse_field(EntryField::End, "25:00"),
            Err(FieldError::InvalidTime(_))
        ));
        assert_eq!(
            parse_field(EntryField::OdMaximum, "2.010").unwrap(),
            FieldValue::Number(Measurement::Value(2.01))
        );
        assert!(parse_field(EntryField::OdMaximum, "-").is_err());
        assert_eq!(
            parse_field(EntryField::UnitEnd, "120").unwrap(),
            FieldValue::Number(Measurement::Value(120.0))
        );
        assert!(parse_field(EntryField::UnitEnd, "12.5").is_err());
        assert_eq!(
            parse_field(EntryField::Visual, "pass").unwrap(),
            FieldValue::Text("Pass".to_string())
        );
        assert!(matches!(
            parse_field(EntryField::ScrapCode, "E"),
            Err(FieldError::InvalidChoice { .. })
        ));
        assert!(parse_field(EntryField::ScrapCode, "").unwrap().is_empty());
    }

    #[test]
    fn store_and_get() {
        let mut entry = ProductionEntry::new();
        entry.store(EntryField::MeltPress, FieldValue::Number(Measurement::Value(3100.0)));
        entry.store(EntryField::ScrapCode, FieldValue::Text("B".to_string()));
        assert_eq!(entry.melt_press, Measurement::Value(3100.0));
        assert_eq!(entry.scrap_code, "B");
        assert_eq!(
            entry.get(EntryField::MeltPress),
            FieldValue::Number(Measurement::Value(3100.0))
        );

        // a text value aimed at a numeric column is dropped
        entry.store(EntryField::MeltPress, FieldValue::Text("x".to_string()));
        assert_eq!(entry.melt_press, Measurement::Value(3100.0));
    }

    #[test]
    fn started_and_significant_data() {
        let mut entry = ProductionEntry::new();
        assert!(!entry.is_started());
        assert!(!entry.has_significant_data());

        entry.start = "08:00".to_string();
        entry.unit_start = Measurement::Value(11.0);
        assert!(entry.is_started());
        assert!(!entry.has_significant_data());

        entry.visual = "Pass".to_string();
        assert!(entry.has_significant_data());
    }

    #[test]
    fn missing_required_lists_blank_columns() {
        let mut entry = ProductionEntry::new();
        assert_eq!(entry.missing_required().len(), EntryField::REQUIRED.len());
        entry.start = "08:00".to_string();
        entry.visual = "Pass".to_string();
        let missing = entry.missing_required();
        assert!(!missing.contains(&EntryField::Start));
        assert!(missing.contains(&EntryField::End));
        assert!(!entry.is_complete());
    }

    #[test]
    fn serializes_with_form_column_names() {
        let mut entry = ProductionEntry::new();
        entry.actual_pph = Measurement::Value(450.0);
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["actualPPH"], 450.0);
        assert_eq!(json["odAtVacTank"], "");
        assert_eq!(json["state"], "open");
    }
}
