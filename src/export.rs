use crate::form::{EntryView, ProductionForm};
use crate::specs::TargetSpecifications;
use crate::summary::FormSummary;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::Serialize;

/// The JSON document written on export and POSTed on submission.
///
/// Entries carry their derived columns, recomputed at the time of export.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportPayload<'a> {
    pub id: &'a str,
    pub form_id: &'a str,
    pub export_date: String,
    pub production_site: &'a str,
    pub date: NaiveDate,
    pub shift: &'a str,
    pub operator_name: &'a str,
    pub production_line: &'a str,
    pub work_order_number: &'a str,
    pub resin_code: &'a str,
    pub color_code: &'a str,
    pub target_specs: &'a TargetSpecifications,
    pub entries: Vec<EntryView<'a>>,
    pub summary: FormSummary,
}

impl<'a> ExportPayload<'a> {
    pub fn new(form: &'a ProductionForm) -> Self {
        Self::at(form, Utc::now())
    }

    pub fn at(form: &'a ProductionForm, now: DateTime<Utc>) -> Self {
        ExportPayload {
            id: &form.id,
            form_id: &form.id,
            export_date: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            production_site: &form.production_site,
            date: form.date,
            shift: &form.shift,
            operator_name: &form.operator_name,
            production_line: &form.production_line,
            work_order_number: &form.work_order_number,
            resin_code: &form.resin_code,
            color_code: &form.color_code,
            target_specs: &form.target_specs,
            entries: form.entry_views(),
            summary: FormSummary::compute(form),
        }
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// `production-form-{id}-{YYYY-MM-DD}`, shared by every export format.
pub fn export_stem(form: &ProductionForm) -> String {
    format!("production-form-{}-{}", form.id, form.date.format("%Y-%m-%d"))
}

pub fn export_filename(form: &ProductionForm) -> String {
    format!("{}.json", export_stem(form))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::tests::{fill_row, ready_form};
    use chrono::TimeZone;

    #[test]
    fn payload_has_form_id_and_derived_fields() {
        let mut form = ready_form();
        fill_row(&mut form, 0, "06:00", "07:00", (1, 40));
        form.add_entry().unwrap();

        let now = Utc.with_ymd_and_hms(2024, 3, 9, 14, 30, 0).unwrap();
        let json = serde_json::to_value(ExportPayload::at(&form, now)).unwrap();

        assert_eq!(json["formId"], "form-1");
        assert_eq!(json["exportDate"], "2024-03-09T14:30:00.000Z");
        assert_eq!(json["targetSpecs"]["goalPPH"], 450.0);

        let entries = json["entries"].as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["odMaximum"], 2.01);
        assert_eq!(entries[0]["outOfRound"], 0.02);
        assert_eq!(entries[0]["ovality"], 1.0);
        assert_eq!(entries[0]["locked"], true);
        assert_eq!(entries[1]["locked"], false);
        assert_eq!(entries[1]["start"], "07:00");
        assert_eq!(json["summary"]["totalUnits"], 40);
    }

    #[test]
    fn filename_uses_id_and_date() {
        let mut form = ProductionForm::new("WO1-A2-abc");
        form.date = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        assert_eq!(export_filename(&form), "production-form-WO1-A2-abc-2024-01-31.json");
    }
}
