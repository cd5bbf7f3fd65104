//! The shared norms table: canonical ordering, CSV load/save, atomic writes.
//!
//! The table file is the only persistent state of a build. It is read whole,
//! rebuilt in memory, and replaced by rename so a reader never observes a
//! half-written file.

use crate::csv::{parse_csv, render_record};
use psynorm_kernel::{NORM_COLUMNS, NormRow, NormsError};
use std::collections::BTreeSet;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// All rows of a norms table, kept in canonical order:
/// `(group_id, domain-before-facet, metric_code)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormsTable {
    rows: Vec<NormRow>,
}

impl NormsTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: Vec<NormRow>) -> Self {
        let mut table = Self { rows };
        table.sort_canonical();
        table
    }

    pub fn rows(&self) -> &[NormRow] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<NormRow> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows of one group in table order.
    pub fn group<'s, 'g>(
        &'s self,
        group_id: &'g str,
    ) -> impl Iterator<Item = &'s NormRow> + use<'s, 'g> {
        self.rows.iter().filter(move |row| row.group_id == group_id)
    }

    /// Distinct group ids, sorted.
    pub fn group_ids(&self) -> Vec<&str> {
        self.rows
            .iter()
            .map(|row| row.group_id.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Stable sort; rows with equal keys keep their relative order.
    pub fn sort_canonical(&mut self) {
        self.rows.sort_by(|a, b| {
            (a.group_id.as_str(), a.level_rank(), a.metric_code.as_str()).cmp(&(
                b.group_id.as_str(),
                b.level_rank(),
                b.metric_code.as_str(),
            ))
        });
    }

    /// Parse table CSV text. Columns may appear in any order; all of
    /// [`NORM_COLUMNS`] must be present. `label` names the source in errors.
    pub fn parse_csv(text: &str, label: &str) -> Result<Self, NormsError> {
        let doc = parse_csv(text).map_err(|e| NormsError::malformed(label, e.to_string()))?;

        let missing = doc.missing_columns(NORM_COLUMNS);
        if !missing.is_empty() {
            return Err(NormsError::malformed(
                label,
                format!("missing required columns: {}", missing.join(",")),
            ));
        }

        let positions: Vec<usize> = NORM_COLUMNS
            .iter()
            .filter_map(|name| doc.column(name))
            .collect();

        let mut rows = Vec::with_capacity(doc.records.len());
        for record in &doc.records {
            let cells: [&str; 18] = std::array::from_fn(|idx| record.cell(positions[idx]));
            let row = NormRow::from_cells(cells, &format!("{label} line {}", record.line))?;
            rows.push(row);
        }
        Ok(Self::from_rows(rows))
    }

    /// Header plus rows in canonical column order, `\n` terminated.
    pub fn render_csv(&self) -> String {
        let mut out = String::new();
        render_record(&mut out, &NORM_COLUMNS);
        for row in &self.rows {
            render_record(&mut out, &row.to_cells());
        }
        out
    }

    /// Load a table file. A file that does not exist yet reads as an empty
    /// table so the first build can bootstrap it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, NormsError> {
        let path = path.as_ref();
        match read_text_if_exists(path)? {
            Some(text) => Self::parse_csv(&text, &path.display().to_string()),
            None => Ok(Self::new()),
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), NormsError> {
        write_bytes_atomic(path, self.render_csv().as_bytes())
    }
}

/// Read a text file, `Ok(None)` when it does not exist. Rejects NUL bytes
/// and invalid UTF-8.
pub fn read_text_if_exists(path: &Path) -> Result<Option<String>, NormsError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(NormsError::malformed(path.display().to_string(), e.to_string())),
    };
    if bytes.contains(&0) {
        return Err(NormsError::malformed(
            path.display().to_string(),
            "contains NUL byte(s)",
        ));
    }
    String::from_utf8(bytes).map(Some).map_err(|_| {
        NormsError::malformed(
            path.display().to_string(),
            "contains non-UTF-8 byte sequence(s)",
        )
    })
}

/// Replace `path` with `bytes`: write a sibling temp file, fsync, rename,
/// then fsync the parent directory. Missing parent directories are created.
pub fn write_bytes_atomic(path: impl AsRef<Path>, bytes: &[u8]) -> Result<(), NormsError> {
    stage_bytes(path, bytes)?.commit()
}

/// Write `bytes` to a synced temp file next to `path` without replacing
/// `path` yet. Missing parent directories are created.
pub fn stage_bytes(path: impl AsRef<Path>, bytes: &[u8]) -> Result<StagedFile, NormsError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .map_err(|e| NormsError::storage(parent.display().to_string(), e.to_string()))?;
    }

    let staged = StagedFile {
        tmp_path: tmp_write_path(path),
        path: path.to_path_buf(),
    };
    let tmp_label = staged.tmp_path.display().to_string();
    let tmp_err = |e: std::io::Error| NormsError::storage(tmp_label.as_str(), e.to_string());
    let file = File::create(&staged.tmp_path).map_err(tmp_err)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(bytes).map_err(tmp_err)?;
    writer.flush().map_err(tmp_err)?;
    let file = writer.into_inner().map_err(|e| tmp_err(e.into_error()))?;
    file.sync_all().map_err(tmp_err)?;
    Ok(staged)
}

/// A written and synced temp file waiting to replace its target. Dropping it
/// without [`StagedFile::commit`] removes the temp file and leaves the target
/// untouched.
#[derive(Debug)]
pub struct StagedFile {
    tmp_path: PathBuf,
    path: PathBuf,
}

impl StagedFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rename over the target, then fsync the parent directory.
    pub fn commit(self) -> Result<(), NormsError> {
        fs::rename(&self.tmp_path, &self.path).map_err(|e| {
            NormsError::storage(
                format!("{} -> {}", self.tmp_path.display(), self.path.display()),
                e.to_string(),
            )
        })?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            let dir = File::open(parent)
                .map_err(|e| NormsError::storage(parent.display().to_string(), e.to_string()))?;
            dir.sync_all()
                .map_err(|e| NormsError::storage(parent.display().to_string(), e.to_string()))?;
        }

        Ok(())
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        // Already gone after a successful commit.
        let _ = fs::remove_file(&self.tmp_path);
    }
}

fn tmp_write_path(path: &Path) -> PathBuf {
    let unique = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let mut tmp: OsString = path.as_os_str().to_os_string();
    tmp.push(format!(".tmp.{}.{}", std::process::id(), unique));
    PathBuf::from(tmp)
}
