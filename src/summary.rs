//! Totals across every row of a production form.

use crate::form::ProductionForm;
use crate::measurement::Measurement;
use crate::metrics::{WeightDeviation, round_to, weight_deviation};
use serde::Serialize;

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSummary {
    pub total_entries: usize,
    pub completed_entries: usize,
    pub accepted_lbs: f64,
    pub accepted_fts: f64,
    pub scrap_lbs: f64,
    pub scrap_fts: f64,
    pub total_units: u64,
    pub average_wt_per_ft: Option<f64>,
    pub weight_deviation: Option<WeightDeviation>,
}

impl FormSummary {
    pub fn compute(form: &ProductionForm) -> Self {
        let entries = form.entries();
        let mut summary = FormSummary {
            total_entries: entries.len(),
            ..FormSummary::default()
        };

        let mut wt_sum = 0.0;
        let mut wt_count = 0usize;

        for entry in entries {
            if entry.is_started() {
                summary.completed_entries += 1;
            }
            summary.accepted_lbs += entry.accepted_lbs.value_or_zero();
            summary.accepted_fts += entry.accepted_ft.value_or_zero();
            summary.scrap_lbs += entry.scrap_lbs.value_or_zero();
            summary.scrap_fts += entry.scrap_fts.value_or_zero();

            // A blank unit start counts from zero.
            let start = match &entry.unit_start {
                Measurement::Unset => Some(0.0),
                other => other.value(),
            };
            if let (Some(start), Some(end)) = (start, entry.unit_end.value()) {
                if end > 0.0 && start >= 0.0 && end >= start {
                    summary.total_units += (end - start) as u64 + 1;
                }
            }

            if let Some(wt) = entry.actual_wt_per_ft.value().filter(|v| *v > 0.0) {
                wt_sum += wt;
                wt_count += 1;
            }
        }

        if wt_count > 0 {
            let average = wt_sum / wt_count as f64;
            summary.average_wt_per_ft = Some(round_to(average, 3));
            summary.weight_deviation = weight_deviation(
                average,
                form.target_specs.theo_wt_per_ft.value_or_zero(),
            )
            .map(|d| match d {
                WeightDeviation::Gain(p) => WeightDeviation::Gain(round_to(p, 2)),
                WeightDeviation::Loss(p) => WeightDeviation::Loss(round_to(p, 2)),
            });
        }

        summary.accepted_lbs = round_to(summary.accepted_lbs, 2);
        summary.scrap_lbs = round_to(summary.scrap_lbs, 2);
        summary
    }

    /// Share of produced weight that was scrapped, in percent.
    pub fn scrap_rate(&self) -> Option<f64> {
        let produced = self.accepted_lbs + self.scrap_lbs;
        if produced == 0.0 {
            return None;
        }
        Some(round_to(self.scrap_lbs / produced * 100.0, 2))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::EntryField;
    use crate::form::tests::{fill_row, ready_form};
    use crate::measurement::Measurement;

    #[test]
    fn empty_form_summary() {
        let form = ProductionForm::new("form-1");
        let summary = FormSummary::compute(&form);
        assert_eq!(summary.total_entries, 1);
        assert_eq!(summary.completed_entries, 0);
        assert_eq!(summary.total_units, 0);
        assert_eq!(summary.average_wt_per_ft, None);
        assert_eq!(summary.weight_deviation, None);
        assert_eq!(summary.scrap_rate(), None);
    }

    #[test]
    fn totals_over_two_rows() {
        let mut form = ready_form();
        fill_row(&mut form, 0, "06:00", "07:00", (1, 40));
        form.add_entry().unwrap();
        fill_row(&mut form, 1, "07:00", "08:00", (41, 60));
        form.edit_entry(1, EntryField::ActualWtPerFt, "0.96").unwrap();

        let summary = FormSummary::compute(&form);
        assert_eq!(summary.total_entries, 2);
        assert_eq!(summary.completed_entries, 2);
        assert_eq!(summary.accepted_lbs, 2449.0);
        assert_eq!(summary.accepted_fts, 2400.0);
        assert_eq!(summary.scrap_fts, 40.0);
        assert_eq!(summary.scrap_lbs, 42.8);
        assert_eq!(summary.total_units, 60);
        assert_eq!(summary.average_wt_per_ft, Some(0.99));
        assert_eq!(summary.weight_deviation, Some(WeightDeviation::Gain(1.0)));
    }

    #[test]
    fn inverted_unit_range_is_skipped() {
        let mut form = ready_form();
        form.entries_mut()[0].unit_start = Measurement::Value(50.0);
        form.entries_mut()[0].unit_end = Measurement::Value(10.0);
        assert_eq!(FormSummary::compute(&form).total_units, 0);

        form.entries_mut()[0].unit_end = Measurement::Value(50.0);
        assert_eq!(FormSummary::compute(&form).total_units, 1);
    }

    #[test]
    fn blank_unit_start_counts_from_zero() {
        let mut form = ProductionForm::new("form-1");
        form.entries_mut()[0].unit_end = Measurement::Value(10.0);
        assert_eq!(FormSummary::compute(&form).total_units, 11);

        form.entries_mut()[0].unit_start = Measurement::NotApplicable;
        assert_eq!(FormSummary::compute(&form).total_units, 0);
    }

    #[test]
    fn serializes_deviation_with_kind() {
        let mut form = ready_form();
        form.entries_mut()[0].actual_wt_per_ft = Measurement::Value(1.05);
        let json = serde_json::to_value(FormSummary::compute(&form)).unwrap();
        assert_eq!(json["weightDeviation"]["kind"], "loss");
        assert_eq!(json["weightDeviation"]["percent"], 5.0);
        assert_eq!(json["completedEntries"], 0);
    }
}
