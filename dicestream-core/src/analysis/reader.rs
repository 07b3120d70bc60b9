//! Schema-checked loading of the snapshot log.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;

use crate::constants::{FACE_COUNT, SNAPSHOT_FIELDS};
use crate::snapshot::SnapshotRecord;

use super::AnalysisError;

/// Position of each expected field in the file header, aligned with
/// `SNAPSHOT_FIELDS`.
#[derive(Debug, Clone, Copy)]
struct ColumnMap {
    positions: [usize; SNAPSHOT_FIELDS.len()],
    width: usize,
}

impl ColumnMap {
    fn resolve(header: &[&str]) -> Result<Self, AnalysisError> {
        let mut positions = [0; SNAPSHOT_FIELDS.len()];
        let mut missing = Vec::new();
        for (slot, field) in positions.iter_mut().zip(SNAPSHOT_FIELDS) {
            match header.iter().position(|h| *h == field) {
                Some(index) => *slot = index,
                None => missing.push(field.to_string()),
            }
        }
        if !missing.is_empty() {
            return Err(AnalysisError::MissingColumns { columns: missing });
        }
        Ok(Self {
            positions,
            width: header.len(),
        })
    }

    fn parse<T: FromStr>(
        &self,
        fields: &[&str],
        field: usize,
        line: usize,
    ) -> Result<T, AnalysisError> {
        let raw = self
            .positions
            .get(field)
            .and_then(|index| fields.get(*index))
            .copied()
            .unwrap_or_default();
        raw.parse::<T>().map_err(|_| AnalysisError::InvalidValue {
            line,
            column: SNAPSHOT_FIELDS.get(field).copied().unwrap_or("?").to_string(),
            value: raw.to_string(),
        })
    }
}

// field slots within SNAPSHOT_FIELDS
const TS: usize = 0;
const N: usize = 1;
const MAX_ABS_DEV: usize = 2;
const CHI2: usize = 3;
const FIRST_PROPORTION: usize = 4;
const FIRST_COUNT: usize = FIRST_PROPORTION + FACE_COUNT;

/// Load every row of the log at `path`, in file order.
///
/// # Errors
///
/// Fails when the file cannot be read, a required column is missing, a value
/// does not parse, or the log holds no data rows.
pub fn load_snapshots(path: &Path) -> Result<Vec<SnapshotRecord>, AnalysisError> {
    let file = File::open(path).map_err(|source| AnalysisError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    read_snapshots(BufReader::new(file)).map_err(|err| match err {
        AnalysisError::Read { source } => AnalysisError::Io {
            path: path.to_path_buf(),
            source,
        },
        other => other,
    })
}

/// Parse snapshot rows from any buffered reader.
///
/// # Errors
///
/// See [`load_snapshots`].
pub fn read_snapshots<R: BufRead>(reader: R) -> Result<Vec<SnapshotRecord>, AnalysisError> {
    let mut lines = reader.lines().enumerate();

    let header_line = loop {
        match lines.next() {
            Some((_, line)) => {
                let line = line.map_err(|source| AnalysisError::Read { source })?;
                if !line.trim().is_empty() {
                    break line;
                }
            }
            None => return Err(AnalysisError::EmptyLog),
        }
    };
    let header: Vec<&str> = header_line.split(',').map(str::trim).collect();
    let columns = ColumnMap::resolve(&header)?;

    let mut records = Vec::new();
    for (index, line) in lines {
        let line = line.map_err(|source| AnalysisError::Read { source })?;
        if line.trim().is_empty() {
            continue;
        }
        let line_no = index + 1;
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() != columns.width {
            return Err(AnalysisError::RaggedRow {
                line: line_no,
                expected: columns.width,
                found: fields.len(),
            });
        }
        records.push(parse_row(&fields, &columns, line_no)?);
    }

    if records.is_empty() {
        return Err(AnalysisError::EmptyLog);
    }
    log::debug!("loaded {} snapshot rows", records.len());
    Ok(records)
}

fn parse_row(
    fields: &[&str],
    columns: &ColumnMap,
    line: usize,
) -> Result<SnapshotRecord, AnalysisError> {
    let ts: String = columns.parse(fields, TS, line)?;
    let n = columns.parse(fields, N, line)?;
    let max_abs_dev = columns.parse(fields, MAX_ABS_DEV, line)?;
    let chi2 = columns.parse(fields, CHI2, line)?;
    let mut proportions = [0.0; FACE_COUNT];
    for (i, slot) in proportions.iter_mut().enumerate() {
        *slot = columns.parse(fields, FIRST_PROPORTION + i, line)?;
    }
    let mut counts = [0; FACE_COUNT];
    for (i, slot) in counts.iter_mut().enumerate() {
        *slot = columns.parse(fields, FIRST_COUNT + i, line)?;
    }
    Ok(SnapshotRecord {
        ts,
        n,
        max_abs_dev,
        chi2,
        proportions,
        counts,
    })
}
