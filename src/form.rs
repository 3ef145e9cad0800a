use crate::entry::{EntryField, FieldError, ProductionEntry, RowState, parse_field};
use crate::measurement::Measurement;
use crate::metrics::{self, DerivedMetrics, RowVerdicts};
use crate::specs::{SpecError, TargetSpecifications};
use chrono::{Local, NaiveDate};
use log::{debug, info, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const ID_SUFFIX_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const ID_SUFFIX_LEN: usize = 9;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum FormError {
    #[error("row {0} does not exist")]
    NoSuchRow(usize),
    #[error("row {row} is locked; '{field}' can no longer be changed")]
    RowLocked { row: usize, field: &'static str },
    #[error("row {0} is locked and cannot be removed")]
    LockedRowRemoval(usize),
    #[error("enter the target specifications before filling '{0}' on the first row")]
    TargetSpecsIncomplete(&'static str),
    #[error("complete row {row} before adding a new one (missing: {})", .missing.join(", "))]
    IncompleteRow {
        row: usize,
        missing: Vec<&'static str>,
    },
    #[error("at least one row must remain")]
    LastRemainingRow,
    #[error("row {0} contains data; confirm to remove it")]
    ConfirmationRequired(usize),
    #[error("missing required header fields: {}", .0.join(", "))]
    MissingHeaderFields(Vec<&'static str>),
    #[error("unknown header field '{0}'")]
    UnknownHeaderField(String),
    #[error("'{0}' is not a date (YYYY-MM-DD)")]
    InvalidDate(String),
    #[error("invalid value for '{field}': {source}")]
    InvalidValue {
        field: &'static str,
        #[source]
        source: FieldError,
    },
    #[error(transparent)]
    Spec(#[from] SpecError),
}

/// Header text fields of a production form.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HeaderField {
    ProductionSite,
    Date,
    Shift,
    OperatorName,
    ProductionLine,
    WorkOrderNumber,
    ResinCode,
    ColorCode,
}

impl HeaderField {
    pub const ALL: [HeaderField; 8] = [
        HeaderField::ProductionSite,
        HeaderField::Date,
        HeaderField::Shift,
        HeaderField::OperatorName,
        HeaderField::ProductionLine,
        HeaderField::WorkOrderNumber,
        HeaderField::ResinCode,
        HeaderField::ColorCode,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            HeaderField::ProductionSite => "productionSite",
            HeaderField::Date => "date",
            HeaderField::Shift => "shift",
            HeaderField::OperatorName => "operatorName",
            HeaderField::ProductionLine => "productionLine",
            HeaderField::WorkOrderNumber => "workOrderNumber",
            HeaderField::ResinCode => "resinCode",
            HeaderField::ColorCode => "colorCode",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, FormError> {
        HeaderField::ALL
            .iter()
            .copied()
            .find(|field| field.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| FormError::UnknownHeaderField(name.to_string()))
    }
}

/// One production run: header, target limits and the ordered sample rows.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductionForm {
    pub id: String,
    pub id_suffix: String,
    pub production_site: String,
    pub date: NaiveDate,
    pub shift: String,
    pub operator_name: String,
    pub production_line: String,
    pub work_order_number: String,
    pub resin_code: String,
    pub color_code: String,
    pub target_specs: TargetSpecifications,
    entries: Vec<ProductionEntry>,
}

/// A row together with everything computed from it.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryView<'a> {
    #[serde(flatten)]
    pub entry: &'a ProductionEntry,
    #[serde(flatten)]
    pub metrics: DerivedMetrics,
    pub locked: bool,
    pub verdicts: RowVerdicts,
}

pub fn random_suffix() -> String {
    let mut rng = rand::thread_rng();
    (0..ID_SUFFIX_LEN)
        .map(|_| {
            let idx = rng.gen_range(0..ID_SUFFIX_CHARSET.len());
            ID_SUFFIX_CHARSET[idx] as char
        })
        .collect()
}

impl ProductionForm {
    pub fn new(id: impl Into<String>) -> Self {
        ProductionForm {
            id: id.into(),
            id_suffix: random_suffix(),
            production_site: String::new(),
            date: Local::now().date_naive(),
            shift: String::new(),
            operator_name: String::new(),
            production_line: String::new(),
            work_order_number: String::new(),
            resin_code: String::new(),
            color_code: String::new(),
            target_specs: TargetSpecifications::default(),
            entries: vec![ProductionEntry::new()],
        }
    }

    pub fn entries(&self) -> &[ProductionEntry] {
        &self.entries
    }

    pub fn entry(&self, index: usize) -> Result<&ProductionEntry, FormError> {
        self.entries.get(index).ok_or(FormError::NoSuchRow(index))
    }

    pub fn derived(&self, index: usize) -> Result<DerivedMetrics, FormError> {
        Ok(metrics::compute(self.entry(index)?, &self.target_specs))
    }

    /// Every row with its derived columns and limit checks.
    pub fn entry_views(&self) -> Vec<EntryView<'_>> {
        self.entries
            .iter()
            .map(|entry| {
                let metrics = metrics::compute(entry, &self.target_specs);
                EntryView {
                    entry,
                    metrics,
                    locked: entry.is_locked(),
                    verdicts: metrics::verdicts(entry, &metrics, &self.target_specs),
                }
            })
            .collect()
    }

    pub fn header_value(&self, field: HeaderField) -> String {
        match field {
            HeaderField::ProductionSite => self.production_site.clone(),
            HeaderField::Date => self.date.format("%Y-%m-%d").to_string(),
            HeaderField::Shift => self.shift.clone(),
            HeaderField::OperatorName => self.operator_name.clone(),
            HeaderField::ProductionLine => self.production_line.clone(),
            HeaderField::WorkOrderNumber => self.work_order_number.clone(),
            HeaderField::ResinCode => self.resin_code.clone(),
            HeaderField::ColorCode => self.color_code.clone(),
        }
    }

    /// Update a header field. Changing work order, shift or line re-derives the form id.
    pub fn set_header_field(&mut self, field: HeaderField, value: &str) -> Result<(), FormError> {
        let value = value.trim().to_string();
        match field {
            HeaderField::Date => {
                self.date = NaiveDate::parse_from_str(&value, "%Y-%m-%d")
                    .map_err(|_| FormError::InvalidDate(value.clone()))?;
            }
            HeaderField::ProductionSite => self.production_site = value,
            HeaderField::Shift => self.shift = value,
            HeaderField::OperatorName => self.operator_name = value,
            HeaderField::ProductionLine => self.production_line = value,
            HeaderField::WorkOrderNumber => self.work_order_number = value,
            HeaderField::ResinCode => self.resin_code = value,
            HeaderField::ColorCode => self.color_code = value,
        }

        if matches!(
            field,
            HeaderField::WorkOrderNumber | HeaderField::Shift | HeaderField::ProductionLine
        ) {
            if let Some(name) = self.run_name() {
                self.id = format!("{}-{}", name, self.id_suffix);
                debug!("form id is now {}", self.id);
            }
        }
        Ok(())
    }

    /// `{workOrder}-{shift}{line}` once all three are known.
    pub fn run_name(&self) -> Option<String> {
        if self.work_order_number.is_empty()
            || self.shift.is_empty()
            || self.production_line.is_empty()
        {
            return None;
        }
        Some(format!(
            "{}-{}{}",
            self.work_order_number, self.shift, self.production_line
        ))
    }

    /// Tab caption; `position` is the zero-based tab index.
    pub fn display_name(&self, position: usize) -> String {
        self.run_name()
            .unwrap_or_else(|| format!("Form {}", position + 1))
    }

    pub fn set_target_specs(&mut self, specs: TargetSpecifications) {
        self.target_specs = specs;
    }

    /// Apply a scanned label. A malformed label leaves the current limits untouched.
    pub fn apply_qr_payload(&mut self, payload: &str) -> Result<(), FormError> {
        match TargetSpecifications::from_qr_payload(payload) {
            Ok(specs) => {
                self.target_specs = specs;
                info!("form {}: target specifications loaded from scan", self.id);
                Ok(())
            }
            Err(e) => {
                warn!("form {}: rejected scanned payload: {}", self.id, e);
                Err(e.into())
            }
        }
    }

    /// Header fields that must be filled before the form can be submitted.
    pub fn missing_header_fields(&self) -> Vec<&'static str> {
        [
            (HeaderField::ProductionSite, &self.production_site),
            (HeaderField::Shift, &self.shift),
            (HeaderField::OperatorName, &self.operator_name),
            (HeaderField::ProductionLine, &self.production_line),
        ]
        .iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(field, _)| field.name())
        .collect()
    }

    pub fn validate_header(&self) -> Result<(), FormError> {
        let missing = self.missing_header_fields();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(FormError::MissingHeaderFields(missing))
        }
    }

    /// All header fields, including the optional ones, are filled in.
    pub fn is_header_complete(&self) -> bool {
        self.missing_header_fields().is_empty()
            && !self.work_order_number.is_empty()
            && !self.resin_code.is_empty()
            && !self.color_code.is_empty()
    }

    /// Set one field of row `index` from operator input.
    ///
    /// Starting a row locks the row before it.
    pub fn edit_entry(&mut self, index: usize, field: EntryField, raw: &str) -> Result<(), FormError> {
        let entry = self.entries.get(index).ok_or(FormError::NoSuchRow(index))?;

        if entry.is_locked() && !field.editable_when_locked() {
            return Err(FormError::RowLocked {
                row: index,
                field: field.name(),
            });
        }
        if index == 0
            && EntryField::NEEDS_TARGET_SPECS.contains(&field)
            && !self.target_specs.is_complete()
        {
            return Err(FormError::TargetSpecsIncomplete(field.name()));
        }

        let value = parse_field(field, raw).map_err(|source| FormError::InvalidValue {
            field: field.name(),
            source,
        })?;

        let started = entry.is_started() || !value.is_empty();
        self.entries[index].store(field, value);

        if started && index > 0 && !self.entries[index - 1].is_locked() {
            self.entries[index - 1].lock();
            debug!("form {}: row {} locked, row {} started", self.id, index - 1, index);
        }
        Ok(())
    }

    /// Append a new row chained from the last one.
    ///
    /// The last row must be complete. All existing rows are locked; the new row
    /// starts where the previous one ended.
    pub fn add_entry(&mut self) -> Result<usize, FormError> {
        self.ensure_can_add()?;
        let last = &self.entries[self.entries.len() - 1];

        let mut next = ProductionEntry::new();
        next.start = last.end.clone();
        if let Some(unit_end) = last.unit_end.value().filter(|v| *v > 0.0) {
            next.unit_start = Measurement::Value(unit_end + 1.0);
        }

        for entry in self.entries.iter_mut() {
            entry.lock();
        }
        self.entries.push(next);

        let index = self.entries.len() - 1;
        info!("form {}: added row {}", self.id, index);
        Ok(index)
    }

    /// Remove an open row. Rows holding data need `confirmed`.
    pub fn remove_entry(&mut self, index: usize, confirmed: bool) -> Result<ProductionEntry, FormError> {
        if self.entries.len() <= 1 {
            return Err(FormError::LastRemainingRow);
        }
        let entry = self.entries.get(index).ok_or(FormError::NoSuchRow(index))?;
        if entry.state == RowState::Locked {
            return Err(FormError::LockedRowRemoval(index));
        }
        if entry.has_significant_data() && !confirmed {
            return Err(FormError::ConfirmationRequired(index));
        }

        let removed = self.entries.remove(index);
        info!("form {}: removed row {}", self.id, index);
        Ok(removed)
    }

    /// The last row holds every required field.
    pub fn ensure_can_add(&self) -> Result<(), FormError> {
        let last_index = self.entries.len() - 1;
        let missing = self.entries[last_index].missing_required();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(FormError::IncompleteRow {
                row: last_index,
                missing: missing.iter().map(|f| f.name()).collect(),
            })
        }
    }

    /// The add-row button is enabled.
    pub fn can_add_entry(&self) -> bool {
        self.entries.last().is_some_and(|e| e.is_complete())
    }

    /// The remove-row button is shown.
    pub fn can_remove_last_entry(&self) -> bool {
        self.entries.len() > 1 && self.entries.last().is_some_and(|e| !e.is_locked())
    }

    /// Clear everything except the form identity.
    pub fn reset(&mut self) {
        let id = std::mem::take(&mut self.id);
        let suffix = std::mem::take(&mut self.id_suffix);
        *self = ProductionForm::new(id);
        self.id_suffix = suffix;
        info!("form {}: reset", self.id);
    }

    /// Anything an operator would lose by closing the form.
    pub fn has_data(&self) -> bool {
        let header = [
            &self.production_site,
            &self.operator_name,
            &self.work_order_number,
            &self.resin_code,
            &self.color_code,
            &self.production_line,
        ]
        .iter()
        .any(|value| !value.is_empty());

        header || self.target_specs.has_data() || self.entries.iter().any(|e| e.has_data())
    }

    /// Rebuild from deserialized parts, ensuring at least one row.
    pub(crate) fn ensure_rows(&mut self) {
        if self.entries.is_empty() {
            self.entries.push(ProductionEntry::new());
        }
    }

    #[cfg(test)]
    pub(crate) fn entries_mut(&mut self) -> &mut Vec<ProductionEntry> {
        &mut self.entries
    }
}
