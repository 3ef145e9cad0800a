use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::form::ProductionForm;

/// Extension of draft snapshots.
pub const DRAFT_EXTENSION: &str = "json.gz";

pub fn save_form(form: &ProductionForm, filename: impl AsRef<Path>) -> std::io::Result<()> {
    let file = File::create(filename)?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut writer = BufWriter::new(encoder);

    serde_json::to_writer(&mut writer, form)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;

    writer
        .into_inner()
        .map_err(|e| e.into_error())?
        .finish()?
        .flush()?;
    Ok(())
}

pub fn load_form(filename: impl AsRef<Path>) -> std::io::Result<ProductionForm> {
    let file = File::open(filename)?;
    let decoder = GzDecoder::new(file);
    let reader = BufReader::new(decoder);

    let mut form: ProductionForm = serde_json::from_reader(reader)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    form.ensure_rows();

    Ok(form)
}

/// File-name-safe draft id for a form id.
pub fn draft_id(form_id: &str) -> String {
    form_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

/// Path of the draft for `form_id` inside `dir`.
pub fn draft_path(dir: impl AsRef<Path>, form_id: &str) -> PathBuf {
    dir.as_ref()
        .join(format!("{}.{}", draft_id(form_id), DRAFT_EXTENSION))
}

/// Ids of the drafts stored in `dir`, sorted.
pub fn list_drafts(dir: impl AsRef<Path>) -> std::io::Result<Vec<String>> {
    let suffix = format!(".{}", DRAFT_EXTENSION);
    let mut ids = Vec::new();
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(ids),
        Err(e) => return Err(e),
    };
    for entry in entries {
        let name = entry?.file_name();
        if let Some(id) = name.to_str().and_then(|n| n.strip_suffix(suffix.as_str())) {
            ids.push(id.to_string());
        }
    }
    ids.sort();
    Ok(ids)
}
