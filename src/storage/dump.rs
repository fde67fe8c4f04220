//! Chunked JSON dumps
//!
//! A job's records are split into chunks of at most `max_records_per_file`
//! and each chunk lands in `<prefix>.<chunk_index>` as one JSON array.
//! Chunks are written to a temp file in the target directory first and
//! renamed into place, so a reader never sees half a chunk.

use crate::crawler::Record;
use crate::state::ProcessKind;
use crate::storage::{PersistError, PersistResult};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// `<output_dir>/<file_prefix>_<job_id>[_detailed].json`
pub fn output_prefix(output_dir: &Path, file_prefix: &str, job_id: &str, kind: ProcessKind) -> PathBuf {
    output_dir.join(format!("{}_{}{}.json", file_prefix, job_id, kind.file_suffix()))
}

/// Ensures the directory exists and accepts new files
pub fn ensure_output_dir(dir: &Path) -> PersistResult<()> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(PersistError::OutputDir(format!(
                "{} is not a directory",
                dir.display()
            )));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
    }
    NamedTempFile::new_in(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
    Ok(())
}

/// Writes single chunks atomically with a bounded number of attempts
#[derive(Debug, Clone)]
pub struct ChunkWriter {
    prefix: PathBuf,
    retry_limit: u32,
}

impl ChunkWriter {
    pub fn new(prefix: PathBuf, retry_limit: u32) -> Self {
        Self {
            prefix,
            retry_limit: retry_limit.max(1),
        }
    }

    /// Target path of chunk `index`
    pub fn chunk_path(&self, index: usize) -> PathBuf {
        let mut name = self.prefix.as_os_str().to_owned();
        name.push(format!(".{}", index));
        PathBuf::from(name)
    }

    /// Writes one chunk, retrying on failure
    ///
    /// Returns the last error once every attempt has failed.
    pub fn write_chunk(&self, index: usize, records: &[&Record]) -> PersistResult<PathBuf> {
        let mut attempt = 1;
        loop {
            match self.try_write(index, records) {
                Ok(path) => return Ok(path),
                Err(e) if attempt < self.retry_limit => {
                    tracing::warn!(
                        "Chunk {} write attempt {}/{} failed: {}",
                        index,
                        attempt,
                        self.retry_limit,
                        e
                    );
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn try_write(&self, index: usize, records: &[&Record]) -> PersistResult<PathBuf> {
        let target = self.chunk_path(index);
        let dir = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        ensure_output_dir(&dir)?;

        let mut tmp = NamedTempFile::new_in(&dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            serde_json::to_writer(&mut writer, records)?;
            writer.flush()?;
        }
        tmp.as_file_mut().sync_all()?;
        tmp.persist(&target)?;

        Ok(target)
    }
}

/// Outcome of a chunked dump
#[derive(Debug, Default)]
pub struct DumpReport {
    /// Chunks written successfully
    pub files: Vec<PathBuf>,

    /// Chunks that failed every attempt, with the last error
    pub failed: Vec<(usize, PersistError)>,
}

impl DumpReport {
    /// True when every chunk was written
    pub fn success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Splits `records` into chunks and writes each through `writer`
///
/// A failed chunk does not stop the remaining ones from being written.
pub fn dump_records<'a>(
    records: impl IntoIterator<Item = &'a Record>,
    writer: &ChunkWriter,
    max_records_per_file: usize,
) -> DumpReport {
    let records: Vec<&Record> = records.into_iter().collect();
    let mut report = DumpReport::default();

    for (index, chunk) in records.chunks(max_records_per_file.max(1)).enumerate() {
        match writer.write_chunk(index, chunk) {
            Ok(path) => {
                tracing::debug!("Wrote {} records to {}", chunk.len(), path.display());
                report.files.push(path);
            }
            Err(e) => {
                tracing::error!("Giving up on chunk {}: {}", index, e);
                report.failed.push((index, e));
            }
        }
    }

    report
}
