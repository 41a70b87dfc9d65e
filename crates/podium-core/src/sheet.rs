//! Row-level reading of CSV sheets.
//!
//! The first row defines field names; data rows zip positionally against
//! it, padding short rows with empty strings. Header names are normalized
//! once here (trim + alias table for the well-known identity columns) so
//! the rest of the crate never repeats `USERID`-vs-`userid` checks.
//! Quoting follows full CSV rules via the `csv` crate, including embedded
//! delimiters, newlines, and doubled quotes.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use crate::errors::StoreError;

/// Canonical column names for the identity fields used across sheets.
pub mod columns {
    pub const TEAM: &str = "team";
    pub const JUDGE: &str = "judge";
    pub const USER_ID: &str = "user_id";
    pub const USERNAME: &str = "username";
    pub const PASSWORD: &str = "password";
    pub const DISPLAY_NAME: &str = "display_name";
    pub const IS_ADMIN: &str = "is_admin";
    pub const SUBMITTED: &str = "submitted";
}

/// One parsed sheet row: canonical header name -> trimmed raw cell.
pub type Row = BTreeMap<String, String>;

/// Map a raw header cell to its canonical field name.
///
/// Identity columns are matched case-insensitively and across the alias
/// spellings seen in real sheets; anything else (the rubric criteria in
/// particular) keeps its trimmed original spelling.
pub fn canonical_header(raw: &str) -> String {
    let trimmed = raw.trim();
    let folded: String = trimmed
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase();
    let canonical = match folded.as_str() {
        "team" | "teamname" => columns::TEAM,
        "judge" | "judgename" => columns::JUDGE,
        "userid" | "id" => columns::USER_ID,
        "username" => columns::USERNAME,
        "password" => columns::PASSWORD,
        "name" | "displayname" => columns::DISPLAY_NAME,
        "admin" | "isadmin" => columns::IS_ADMIN,
        "submitted" | "hassubmitted" => columns::SUBMITTED,
        _ => return trimmed.to_string(),
    };
    canonical.to_string()
}

/// Read every data row from `input`, keyed by canonical header.
///
/// Blank rows (all cells empty after trim) are skipped. Rows shorter than
/// the header are padded with empty strings; extra trailing cells are
/// ignored.
pub fn read_all<R: Read>(input: R, path: &Path) -> Result<Vec<Row>, StoreError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(true)
        .from_reader(input);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|source| StoreError::Parse {
            path: path.to_path_buf(),
            source,
        })?
        .iter()
        .map(canonical_header)
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|source| StoreError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        let row: Row = headers
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let cell = record.get(i).unwrap_or("").trim().to_string();
                (name.clone(), cell)
            })
            .collect();
        rows.push(row);
    }
    Ok(rows)
}

/// Fetch a cell by canonical name, empty string when the column is absent.
pub fn cell<'a>(row: &'a Row, name: &str) -> &'a str {
    row.get(name).map_or("", String::as_str)
}

/// Truthy cell values as the sheets spell them.
pub fn cell_bool(row: &Row, name: &str) -> bool {
    matches!(
        cell(row, name).to_ascii_lowercase().as_str(),
        "true" | "yes" | "y" | "1"
    )
}
