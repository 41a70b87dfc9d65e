//! CSV-backed durable mirrors of the evaluation and credentials sheets.
//!
//! The sheets are small (dozens of rows), so every write rewrites the
//! whole file through a temp-file rename. The read-modify-rewrite is
//! serialized through a lock shared by clones of the same sheet, so
//! parallel upserts for different keys cannot drop each other's rows.
//! The cache layer in front of `EvalSheet` owns read-after-write
//! consistency; these types only guarantee one physical row per
//! (team, judge) pair.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use crate::errors::StoreError;
use crate::model::EvaluationRecord;
use crate::rubric;
use crate::sheet::{self, columns};

/// Sheet column headers for the two identity columns, spelled the way the
/// competition workbook spells them.
const TEAM_HEADER: &str = "Team Name";
const JUDGE_HEADER: &str = "Judge Name";

/// Anything the evaluation cache can reload itself from.
pub trait EvaluationSource {
    fn load(&self) -> Result<Vec<EvaluationRecord>, StoreError>;
}

/// The evaluation results sheet: one row per (team, judge) pair, header
/// `[Team Name, Judge Name, <criteria...>]`.
#[derive(Debug, Clone)]
pub struct EvalSheet {
    path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl EvalSheet {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Update the row matching (team, judge) in place, or append one.
    /// Calling twice for the same pair leaves exactly one row. The whole
    /// load-mutate-rewrite runs under the sheet's write lock.
    pub fn upsert(&self, record: &EvaluationRecord) -> Result<(), StoreError> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let mut records = self.load()?;
        let team = record.team.trim();
        let judge = record.judge.trim();
        match records
            .iter_mut()
            .find(|r| r.team == team && r.judge == judge)
        {
            Some(existing) => existing.scores = record.scores.clone(),
            None => records.push(EvaluationRecord::new(team, judge, record.scores.clone())),
        }
        self.write_all(&records)
    }

    fn write_all(&self, records: &[EvaluationRecord]) -> Result<(), StoreError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        let header: Vec<&str> = [TEAM_HEADER, JUDGE_HEADER]
            .into_iter()
            .chain(rubric::criteria())
            .collect();
        writer.write_record(&header).map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })?;
        for record in records {
            let mut cells = vec![record.team.clone(), record.judge.clone()];
            for criterion in rubric::criteria() {
                let score = record.scores.get(criterion).copied().unwrap_or(0);
                cells.push(score.to_string());
            }
            writer.write_record(&cells).map_err(|source| StoreError::Parse {
                path: self.path.clone(),
                source,
            })?;
        }
        let buf = writer.into_inner().map_err(|e| StoreError::Write {
            path: self.path.clone(),
            source: std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
        })?;
        write_atomic(&self.path, &buf)
    }
}

impl EvaluationSource for EvalSheet {
    /// Read every evaluation row. A missing file is an empty sheet, not
    /// an error; rows without both a team and a judge are dropped.
    fn load(&self) -> Result<Vec<EvaluationRecord>, StoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let file = File::open(&self.path).map_err(|source| StoreError::Read {
            path: self.path.clone(),
            source,
        })?;
        let rows = sheet::read_all(file, &self.path)?;
        let records = rows
            .into_iter()
            .filter_map(|row| {
                let team = sheet::cell(&row, columns::TEAM).to_string();
                let judge = sheet::cell(&row, columns::JUDGE).to_string();
                if team.is_empty() || judge.is_empty() {
                    return None;
                }
                let scores =
                    rubric::normalize_cells(|name| row.get(name).map(String::as_str));
                Some(EvaluationRecord::new(team, judge, scores))
            })
            .collect();
        Ok(records)
    }
}

/// The login credentials sheet. Only `mark_submitted` writes back, and it
/// preserves the sheet's own header spellings.
#[derive(Debug, Clone)]
pub struct UsersSheet {
    path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl UsersSheet {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Vec<sheet::Row>, StoreError> {
        let file = File::open(&self.path).map_err(|source| StoreError::Read {
            path: self.path.clone(),
            source,
        })?;
        sheet::read_all(file, &self.path)
    }

    /// Flip the submitted flag for one user. Returns false when no row
    /// matches; the sheet is rewritten only on a match, under the same
    /// write lock as any other rewrite of this sheet.
    pub fn mark_submitted(&self, user_id: &str) -> Result<bool, StoreError> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let file = File::open(&self.path).map_err(|source| StoreError::Read {
            path: self.path.clone(),
            source,
        })?;
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .has_headers(true)
            .from_reader(file);
        let headers = reader
            .headers()
            .map_err(|source| StoreError::Parse {
                path: self.path.clone(),
                source,
            })?
            .clone();
        let canonical: Vec<String> =
            headers.iter().map(sheet::canonical_header).collect();
        let id_idx = self.require_column(&canonical, columns::USER_ID)?;
        let submitted_idx = self.require_column(&canonical, columns::SUBMITTED)?;

        let mut found = false;
        let mut rows: Vec<Vec<String>> = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|source| StoreError::Parse {
                path: self.path.clone(),
                source,
            })?;
            let mut cells: Vec<String> = record.iter().map(str::to_string).collect();
            cells.resize(headers.len(), String::new());
            if cells[id_idx].trim() == user_id.trim() {
                cells[submitted_idx] = "true".to_string();
                found = true;
            }
            rows.push(cells);
        }
        if !found {
            return Ok(false);
        }

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&headers).map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })?;
        for cells in &rows {
            writer.write_record(cells).map_err(|source| StoreError::Parse {
                path: self.path.clone(),
                source,
            })?;
        }
        let buf = writer.into_inner().map_err(|e| StoreError::Write {
            path: self.path.clone(),
            source: std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
        })?;
        write_atomic(&self.path, &buf)?;
        Ok(true)
    }

    fn require_column(&self, canonical: &[String], name: &str) -> Result<usize, StoreError> {
        canonical
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| StoreError::MissingColumn {
                path: self.path.clone(),
                column: name.to_string(),
            })
    }
}

fn write_atomic(path: &Path, buf: &[u8]) -> Result<(), StoreError> {
    let tmp = path.with_extension("csv.tmp");
    std::fs::write(&tmp, buf).map_err(|source| StoreError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::rename(&tmp, path).map_err(|source| StoreError::Write {
        path: path.to_path_buf(),
        source,
    })
}
