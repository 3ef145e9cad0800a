#![cfg(not(tarpaulin_include))]

use crate::entry::{EntryField, FieldValue};
use crate::form::{EntryView, ProductionForm};
use crate::measurement::Measurement;
use std::error::Error;

const DERIVED_COLUMNS: [&str; 6] = ["outOfRound", "ovality", "toeIn", "eccentricity", "gain", "loss"];

/// A single exported cell.
enum Cell {
    Text(String),
    Number(f64),
    Blank,
}

impl From<FieldValue> for Cell {
    fn from(value: FieldValue) -> Self {
        match value {
            FieldValue::Text(s) if s.is_empty() => Cell::Blank,
            FieldValue::Text(s) => Cell::Text(s),
            FieldValue::Number(Measurement::Value(v)) => Cell::Number(v),
            FieldValue::Number(Measurement::NotApplicable) => Cell::Text("-".to_string()),
            FieldValue::Number(Measurement::Unset) => Cell::Blank,
        }
    }
}

/// Column titles: every entry field, then the derived columns, then the lock flag.
pub fn column_names() -> Vec<&'static str> {
    EntryField::ALL
        .iter()
        .map(|f| f.name())
        .chain(DERIVED_COLUMNS)
        .chain(std::iter::once("locked"))
        .collect()
}

fn row_cells(view: &EntryView<'_>) -> Vec<Cell> {
    let m = &view.metrics;
    EntryField::ALL
        .iter()
        .map(|f| Cell::from(view.entry.get(*f)))
        .chain(
            [m.out_of_round, m.ovality, m.toe_in, m.eccentricity, m.gain, m.loss]
                .into_iter()
                .map(Cell::Number),
        )
        .chain(std::iter::once(Cell::Text(
            if view.locked { "yes" } else { "no" }.to_string(),
        )))
        .collect()
}

fn escape_csv(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') || value.contains('\r') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Convert a form's rows to CSV
///
/// One header row of column names, then one line per entry with the
/// derived columns recomputed. Blank fields are left empty.
///
/// # Arguments
/// * `form` - The production form to export
///
/// # Returns
/// * `Result<String, Box<dyn Error>>` - CSV content as a string or an error
pub fn to_csv(form: &ProductionForm) -> Result<String, Box<dyn Error>> {
    let mut csv_content = column_names().join(",");
    csv_content.push('\n');

    for view in form.entry_views() {
        let line: Vec<String> = row_cells(&view)
            .into_iter()
            .map(|cell| match cell {
                Cell::Text(s) => escape_csv(&s),
                Cell::Number(v) => v.to_string(),
                Cell::Blank => String::new(),
            })
            .collect();
        csv_content.push_str(&line.join(","));
        csv_content.push('\n');
    }

    Ok(csv_content)
}

/// Convert a form's rows to XLSX
///
/// Same layout as [`to_csv`], written with rust_xlsxwriter. Numeric fields
/// are written as numbers so they stay usable in formulas.
///
/// # Arguments
/// * `form` - The production form to export
///
/// # Returns
/// * `Result<Vec<u8>, Box<dyn Error>>` - XLSX file content as bytes or an error
pub fn to_xlsx(form: &ProductionForm) -> Result<Vec<u8>, Box<dyn Error>> {
    use rust_xlsxwriter::{Workbook, Worksheet};

    let mut workbook = Workbook::new();
    let mut worksheet = Worksheet::new();
    worksheet.set_name("Production")?;

    for (c, name) in column_names().iter().enumerate() {
        worksheet.write_string(0, c as u16, *name)?;
    }

    for (r, view) in form.entry_views().iter().enumerate() {
        let row = (r + 1) as u32;
        for (c, cell) in row_cells(view).into_iter().enumerate() {
            match cell {
                Cell::Text(s) => {
                    worksheet.write_string(row, c as u16, &s)?;
                }
                Cell::Number(v) => {
                    worksheet.write_number(row, c as u16, v)?;
                }
                Cell::Blank => {}
            }
        }
    }

    workbook.push_worksheet(worksheet);
    let buffer = workbook.save_to_buffer()?;

    Ok(buffer)
}
