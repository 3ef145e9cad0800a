use crate::measurement::{Measurement, MeasurementError};
use lazy_static::lazy_static;
use log::warn;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

lazy_static! {
    static ref MANUAL_SPEC_REGEX: Regex = Regex::new(r"^\d*\.?\d*$").unwrap();
}

/// Separator between positional values in a scanned spec label.
pub const QR_SEPARATOR: &str = "*^";

/// Target limits for a production run, in the order they appear on a scanned label.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TargetSpecifications {
    pub od_average: Measurement,
    pub od_max: Measurement,
    pub od_min: Measurement,
    pub caliper_maximum: Measurement,
    pub caliper_minimum: Measurement,
    pub out_of_round: Measurement,
    pub ovality: Measurement,
    pub toe_in: Measurement,
    pub wall_min: Measurement,
    pub wall_max: Measurement,
    pub target_min: Measurement,
    pub target_max: Measurement,
    pub eccentricity: Measurement,
    #[serde(rename = "goalPPH")]
    pub goal_pph: Measurement,
    pub theo_wt_per_ft: Measurement,
    pub target_gain: Measurement,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpecField {
    OdAverage,
    OdMax,
    OdMin,
    CaliperMaximum,
    CaliperMinimum,
    OutOfRound,
    Ovality,
    ToeIn,
    WallMin,
    WallMax,
    TargetMin,
    TargetMax,
    Eccentricity,
    GoalPph,
    TheoWtPerFt,
    TargetGain,
}

impl SpecField {
    /// Label order.
    pub const ALL: [SpecField; 16] = [
        SpecField::OdAverage,
        SpecField::OdMax,
        SpecField::OdMin,
        SpecField::CaliperMaximum,
        SpecField::CaliperMinimum,
        SpecField::OutOfRound,
        SpecField::Ovality,
        SpecField::ToeIn,
        SpecField::WallMin,
        SpecField::WallMax,
        SpecField::TargetMin,
        SpecField::TargetMax,
        SpecField::Eccentricity,
        SpecField::GoalPph,
        SpecField::TheoWtPerFt,
        SpecField::TargetGain,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SpecField::OdAverage => "odAverage",
            SpecField::OdMax => "odMax",
            SpecField::OdMin => "odMin",
            SpecField::CaliperMaximum => "caliperMaximum",
            SpecField::CaliperMinimum => "caliperMinimum",
            SpecField::OutOfRound => "outOfRound",
            SpecField::Ovality => "ovality",
            SpecField::ToeIn => "toeIn",
            SpecField::WallMin => "wallMin",
            SpecField::WallMax => "wallMax",
            SpecField::TargetMin => "targetMin",
            SpecField::TargetMax => "targetMax",
            SpecField::Eccentricity => "eccentricity",
            SpecField::GoalPph => "goalPPH",
            SpecField::TheoWtPerFt => "theoWtPerFt",
            SpecField::TargetGain => "targetGain",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        SpecField::ALL
            .iter()
            .copied()
            .find(|field| field.name().eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SpecError {
    #[error("unknown target field '{0}'")]
    UnknownField(String),
    #[error("'{0}' is not a valid target value (use a number, '-' or leave blank)")]
    InvalidInput(String),
    #[error("scanned payload is empty")]
    EmptyPayload,
    #[error("scanned value {position} ('{token}') is not a number")]
    InvalidToken { position: usize, token: String },
}

/// How a measured value compares against its target limits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Verdict {
    Pass,
    Fail,
    Warn,
    Unchecked,
}

/// Entry columns that are colour-coded against the target limits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CheckedField {
    OdAverage,
    OdMaximum,
    OdMinimum,
    OutOfRound,
    Ovality,
    ToeIn,
    WallMinimum,
    WallMaximum,
    Eccentricity,
    Gain,
    Loss,
}

impl TargetSpecifications {
    pub fn get(&self, field: SpecField) -> Measurement {
        match field {
            SpecField::OdAverage => self.od_average,
            SpecField::OdMax => self.od_max,
            SpecField::OdMin => self.od_min,
            SpecField::CaliperMaximum => self.caliper_maximum,
            SpecField::CaliperMinimum => self.caliper_minimum,
            SpecField::OutOfRound => self.out_of_round,
            SpecField::Ovality => self.ovality,
            SpecField::ToeIn => self.toe_in,
            SpecField::WallMin => self.wall_min,
            SpecField::WallMax => self.wall_max,
            SpecField::TargetMin => self.target_min,
            SpecField::TargetMax => self.target_max,
            SpecField::Eccentricity => self.eccentricity,
            SpecField::GoalPph => self.goal_pph,
            SpecField::TheoWtPerFt => self.theo_wt_per_ft,
            SpecField::TargetGain => self.target_gain,
        }
    }

    pub fn set(&mut self, field: SpecField, value: Measurement) {
        let slot = match field {
            SpecField::OdAverage => &mut self.od_average,
            SpecField::OdMax => &mut self.od_max,
            SpecField::OdMin => &mut self.od_min,
            SpecField::CaliperMaximum => &mut self.caliper_maximum,
            SpecField::CaliperMinimum => &mut self.caliper_minimum,
            SpecField::OutOfRound => &mut self.out_of_round,
            SpecField::Ovality => &mut self.ovality,
            SpecField::ToeIn => &mut self.toe_in,
            SpecField::WallMin => &mut self.wall_min,
            SpecField::WallMax => &mut self.wall_max,
            SpecField::TargetMin => &mut self.target_min,
            SpecField::TargetMax => &mut self.target_max,
            SpecField::Eccentricity => &mut self.eccentricity,
            SpecField::GoalPph => &mut self.goal_pph,
            SpecField::TheoWtPerFt => &mut self.theo_wt_per_ft,
            SpecField::TargetGain => &mut self.target_gain,
        };
        *slot = value;
    }

    /// Set a field from what the operator typed in the manual entry dialog.
    ///
    /// Accepts blank, `-`, or an unsigned decimal such as `1.` or `.25`.
    pub fn set_from_input(&mut self, field: SpecField, raw: &str) -> Result<(), SpecError> {
        let value = parse_manual_input(raw)?;
        self.set(field, value);
        Ok(())
    }

    /// Every limit is filled in; `-` counts as filled, a zero does not.
    pub fn is_complete(&self) -> bool {
        SpecField::ALL.iter().all(|field| match self.get(*field) {
            Measurement::Unset => false,
            Measurement::NotApplicable => true,
            Measurement::Value(v) => v != 0.0,
        })
    }

    pub fn has_data(&self) -> bool {
        SpecField::ALL
            .iter()
            .any(|field| match self.get(*field) {
                Measurement::Unset => false,
                Measurement::NotApplicable => true,
                Measurement::Value(v) => v != 0.0,
            })
    }

    /// Parse a `*^`-separated label scan into a full set of limits.
    ///
    /// Positions map onto [`SpecField::ALL`]. Missing trailing positions stay
    /// blank and surplus positions are ignored.
    pub fn from_qr_payload(payload: &str) -> Result<Self, SpecError> {
        if payload.trim().is_empty() {
            return Err(SpecError::EmptyPayload);
        }

        let tokens: Vec<&str> = payload.split(QR_SEPARATOR).collect();
        if tokens.len() > SpecField::ALL.len() {
            warn!(
                "scanned payload has {} values, ignoring {} beyond the {} target fields",
                tokens.len(),
                tokens.len() - SpecField::ALL.len(),
                SpecField::ALL.len()
            );
        }

        let mut specs = TargetSpecifications::default();
        for (position, (field, token)) in SpecField::ALL.iter().zip(tokens.iter()).enumerate() {
            let value = Measurement::parse(token).map_err(|_| SpecError::InvalidToken {
                position: position + 1,
                token: token.trim().to_string(),
            })?;
            specs.set(*field, value);
        }

        Ok(specs)
    }

    /// Colour-code a measured value the way the operator table does.
    pub fn check(&self, field: CheckedField, value: f64) -> Verdict {
        if value == 0.0 {
            return Verdict::Unchecked;
        }

        match field {
            CheckedField::OdAverage => within(value, self.od_min, self.od_max),
            CheckedField::OdMaximum | CheckedField::OdMinimum => {
                within(value, self.caliper_minimum, self.caliper_maximum)
            }
            CheckedField::WallMinimum | CheckedField::WallMaximum => {
                within(value, self.wall_min, self.wall_max)
            }
            CheckedField::OutOfRound => at_most(value, self.out_of_round),
            CheckedField::Ovality => at_most(value, self.ovality),
            CheckedField::ToeIn => at_most(value, self.toe_in),
            CheckedField::Eccentricity => at_most(value, self.eccentricity),
            CheckedField::Gain => at_most(value, self.target_gain),
            CheckedField::Loss => Verdict::Warn,
        }
    }
}

/// Pass/fail choice columns (visual, print).
pub fn check_choice(value: &str) -> Verdict {
    match value {
        "Pass" => Verdict::Pass,
        "Fail" => Verdict::Fail,
        _ => Verdict::Unchecked,
    }
}

fn parse_manual_input(raw: &str) -> Result<Measurement, SpecError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == crate::measurement::NOT_APPLICABLE {
        return Measurement::parse(trimmed).map_err(|_| SpecError::InvalidInput(raw.to_string()));
    }
    if !MANUAL_SPEC_REGEX.is_match(trimmed) {
        return Err(SpecError::InvalidInput(raw.to_string()));
    }
    Measurement::parse(trimmed).map_err(|e: MeasurementError| {
        SpecError::InvalidInput(format!("{} ({})", raw, e))
    })
}

fn within(value: f64, min: Measurement, max: Measurement) -> Verdict {
    match (min.nonzero(), max.nonzero()) {
        (Some(lo), Some(hi)) => {
            if value >= lo && value <= hi {
                Verdict::Pass
            } else {
                Verdict::Fail
            }
        }
        _ => Verdict::Unchecked,
    }
}

fn at_most(value: f64, limit: Measurement) -> Verdict {
    match limit.nonzero() {
        Some(limit) if value <= limit => Verdict::Pass,
        Some(_) => Verdict::Fail,
        None => Verdict::Unchecked,
    }
}
