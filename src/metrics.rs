//! Statistics derived from a production row's raw measurements.
//!
//! Nothing here is stored on the row; every value is recomputed from the
//! operator's input each time it is read.

use crate::entry::ProductionEntry;
use crate::measurement::Measurement;
use crate::specs::{CheckedField, TargetSpecifications, Verdict, check_choice};
use serde::{Deserialize, Serialize};

/// Round half away from zero to `places` decimals.
///
/// Works on the scaled binary value, so a tie that is not exactly
/// representable (e.g. `1.0005`) may round down.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedMetrics {
    pub out_of_round: f64,
    pub ovality: f64,
    pub toe_in: f64,
    pub eccentricity: f64,
    pub gain: f64,
    pub loss: f64,
}

/// Which way the run's weight is deviating from the theoretical weight.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "percent")]
pub enum WeightDeviation {
    Gain(f64),
    Loss(f64),
}

impl WeightDeviation {
    pub fn percent(&self) -> f64 {
        match self {
            WeightDeviation::Gain(p) | WeightDeviation::Loss(p) => *p,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            WeightDeviation::Gain(_) => "Gain",
            WeightDeviation::Loss(_) => "Loss",
        }
    }
}

pub fn out_of_round(od_maximum: Measurement, od_minimum: Measurement) -> Option<f64> {
    let (max, min) = (od_maximum.value()?, od_minimum.value()?);
    Some(round_to(max - min, 3))
}

pub fn ovality(od_maximum: Measurement, od_minimum: Measurement) -> Option<f64> {
    let (max, min) = (od_maximum.value()?, od_minimum.value()?);
    if max + min == 0.0 {
        return None;
    }
    Some(round_to(((max - min) / (max + min)) * 200.0, 3))
}

pub fn toe_in(od_end: Measurement, od_average: Measurement) -> Option<f64> {
    let (end, average) = (od_end.value()?, od_average.value()?);
    if average == 0.0 {
        return None;
    }
    Some(round_to(((end - average) / average) * 100.0, 3))
}

pub fn eccentricity(wall_maximum: Measurement, wall_minimum: Measurement) -> Option<f64> {
    let (max, min) = (wall_maximum.value()?, wall_minimum.value()?);
    if max == 0.0 {
        return None;
    }
    Some(round_to(((max - min) / max) * 100.0, 3))
}

/// Unrounded percent deviation of actual from theoretical weight per foot.
///
/// A lighter-than-theoretical product is a gain (less material used).
pub fn weight_deviation(actual_wt_per_ft: f64, theo_wt_per_ft: f64) -> Option<WeightDeviation> {
    if actual_wt_per_ft == 0.0 || theo_wt_per_ft == 0.0 {
        return None;
    }
    let deviation = ((actual_wt_per_ft - theo_wt_per_ft) / theo_wt_per_ft) * 100.0;
    if deviation < 0.0 {
        Some(WeightDeviation::Gain(deviation.abs()))
    } else {
        Some(WeightDeviation::Loss(deviation.abs()))
    }
}

/// Compute every derived column for one row.
pub fn compute(entry: &ProductionEntry, specs: &TargetSpecifications) -> DerivedMetrics {
    let mut metrics = DerivedMetrics {
        out_of_round: out_of_round(entry.od_maximum, entry.od_minimum).unwrap_or(0.0),
        ovality: ovality(entry.od_maximum, entry.od_minimum).unwrap_or(0.0),
        toe_in: toe_in(entry.od_end, entry.od_average).unwrap_or(0.0),
        eccentricity: eccentricity(entry.wall_maximum, entry.wall_minimum).unwrap_or(0.0),
        gain: 0.0,
        loss: 0.0,
    };

    match weight_deviation(
        entry.actual_wt_per_ft.value_or_zero(),
        specs.theo_wt_per_ft.value_or_zero(),
    ) {
        Some(WeightDeviation::Gain(p)) => metrics.gain = round_to(p, 2),
        Some(WeightDeviation::Loss(p)) => metrics.loss = round_to(p, 2),
        None => {}
    }

    metrics
}

/// Per-column colour coding for one row.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowVerdicts {
    pub od_average: Verdict,
    pub od_maximum: Verdict,
    pub od_minimum: Verdict,
    pub out_of_round: Verdict,
    pub ovality: Verdict,
    pub toe_in: Verdict,
    pub wall_minimum: Verdict,
    pub wall_maximum: Verdict,
    pub eccentricity: Verdict,
    pub visual: Verdict,
    pub print: Verdict,
    pub gain: Verdict,
    pub loss: Verdict,
}

pub fn verdicts(
    entry: &ProductionEntry,
    metrics: &DerivedMetrics,
    specs: &TargetSpecifications,
) -> RowVerdicts {
    let check = |field: CheckedField, value: Measurement| match value.value() {
        Some(v) => specs.check(field, v),
        None => Verdict::Unchecked,
    };

    RowVerdicts {
        od_average: check(CheckedField::OdAverage, entry.od_average),
        od_maximum: check(CheckedField::OdMaximum, entry.od_maximum),
        od_minimum: check(CheckedField::OdMinimum, entry.od_minimum),
        out_of_round: specs.check(CheckedField::OutOfRound, metrics.out_of_round),
        ovality: specs.check(CheckedField::Ovality, metrics.ovality),
        toe_in: specs.check(CheckedField::ToeIn, metrics.toe_in),
        wall_minimum: check(CheckedField::WallMinimum, entry.wall_minimum),
        wall_maximum: check(CheckedField::WallMaximum, entry.wall_maximum),
        eccentricity: specs.check(CheckedField::Eccentricity, metrics.eccentricity),
        visual: check_choice(&entry.visual),
        print: check_choice(&entry.print),
        gain: specs.check(CheckedField::Gain, metrics.gain),
        loss: specs.check(CheckedField::Loss, metrics.loss),
    }
}
