//! Reading previous dumps back
//!
//! Enrichment picks up every chunk in a read directory: discovery output
//! named `<prefix>_<job_id>.json.<n>` and earlier enrichment output named
//! `<prefix>_<job_id>_detailed.json.<n>`.

use crate::crawler::Record;
use crate::state::ProcessKind;
use crate::storage::PersistResult;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Lists discovery-mode dump chunks in `read_dir`, sorted by name
pub fn discover_dump_files(read_dir: &Path, file_prefix: &str) -> PersistResult<Vec<PathBuf>> {
    list_chunks(read_dir, file_prefix, ProcessKind::Discover)
}

/// Lists enrichment-mode (`_detailed`) dump chunks in `read_dir`, sorted by name
pub fn discover_detailed_files(read_dir: &Path, file_prefix: &str) -> PersistResult<Vec<PathBuf>> {
    list_chunks(read_dir, file_prefix, ProcessKind::Details)
}

fn list_chunks(read_dir: &Path, file_prefix: &str, kind: ProcessKind) -> PersistResult<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in fs::read_dir(read_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if chunk_kind(name, file_prefix) == Some(kind) {
            files.push(entry.path());
        }
    }

    files.sort();
    Ok(files)
}

/// Which kind of job wrote the chunk `name`, if it is a chunk at all
fn chunk_kind(name: &str, file_prefix: &str) -> Option<ProcessKind> {
    let rest = name.strip_prefix(file_prefix)?.strip_prefix('_')?;
    let (job, index) = rest.rsplit_once(".json.")?;
    if index.is_empty() || !index.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    match job.strip_suffix(ProcessKind::Details.file_suffix()) {
        Some(job) if !job.is_empty() => Some(ProcessKind::Details),
        Some(_) => None,
        None if !job.is_empty() => Some(ProcessKind::Discover),
        None => None,
    }
}

/// Reads one chunk file
pub fn load_records(path: &Path) -> PersistResult<Vec<Record>> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

/// Reads one chunk file, retrying up to `attempts` times
pub fn load_records_with_retry(path: &Path, attempts: u32) -> PersistResult<Vec<Record>> {
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        match load_records(path) {
            Ok(records) => return Ok(records),
            Err(e) if attempt < attempts => {
                tracing::warn!(
                    "Loading {} failed (attempt {}/{}): {}",
                    path.display(),
                    attempt,
                    attempts,
                    e
                );
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{dump_records, ChunkWriter};
    use std::collections::HashSet;
    use tempfile::TempDir;

    #[test]
    fn test_chunk_names() {
        assert_eq!(chunk_kind("sweeper_abc.json.0", "sweeper"), Some(ProcessKind::Discover));
        assert_eq!(chunk_kind("sweeper_abc.json.12", "sweeper"), Some(ProcessKind::Discover));
        assert_eq!(
            chunk_kind("sweeper_abc_detailed.json.0", "sweeper"),
            Some(ProcessKind::Details)
        );
        assert_eq!(chunk_kind("sweeper__detailed.json.0", "sweeper"), None);
        assert_eq!(chunk_kind("sweeper_abc.json", "sweeper"), None);
        assert_eq!(chunk_kind("sweeper_abc.json.x", "sweeper"), None);
        assert_eq!(chunk_kind("other_abc.json.0", "sweeper"), None);
        assert_eq!(chunk_kind("sweeper_.json.0", "sweeper"), None);
    }

    #[test]
    fn test_discover_dump_files() {
        let dir = TempDir::new().unwrap();
        for name in [
            "sweeper_b.json.1",
            "sweeper_a.json.0",
            "sweeper_a_detailed.json.0",
            "sweeper_c_detailed.json.3",
            "notes.txt",
        ] {
            fs::write(dir.path().join(name), b"[]").unwrap();
        }
        fs::create_dir(dir.path().join("sweeper_dir.json.0")).unwrap();

        let names = |files: Vec<PathBuf>| -> Vec<String> {
            files
                .iter()
                .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
                .collect()
        };
        assert_eq!(
            names(discover_dump_files(dir.path(), "sweeper").unwrap()),
            vec!["sweeper_a.json.0", "sweeper_b.json.1"]
        );
        assert_eq!(
            names(discover_detailed_files(dir.path(), "sweeper").unwrap()),
            vec!["sweeper_a_detailed.json.0", "sweeper_c_detailed.json.3"]
        );
    }

    #[test]
    fn test_chunked_dump_round_trip() {
        let dir = TempDir::new().unwrap();
        let records: Vec<Record> = (0..10)
            .map(|i| Record::new(format!("com.app.{}", i)).with("title", format!("App {}", i)))
            .collect();

        let writer = ChunkWriter::new(dir.path().join("sweeper_job.json"), 1);
        let report = dump_records(records.iter(), &writer, 4);
        assert_eq!(report.files.len(), 3);

        let mut reloaded = Vec::new();
        for path in discover_dump_files(dir.path(), "sweeper").unwrap() {
            reloaded.extend(load_records(&path).unwrap());
        }

        let original: HashSet<_> = records.iter().map(|r| serde_json::to_string(r).unwrap()).collect();
        let restored: HashSet<_> = reloaded.iter().map(|r| serde_json::to_string(r).unwrap()).collect();
        assert_eq!(original, restored);
    }

    #[test]
    fn test_load_rejects_records_without_id() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sweeper_x.json.0");
        fs::write(&path, br#"[{"title": "no id"}]"#).unwrap();
        assert!(load_records(&path).is_err());
    }

    #[test]
    fn test_load_with_retry_gives_up() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sweeper_x.json.0");
        fs::write(&path, b"not json").unwrap();
        assert!(load_records_with_retry(&path, 3).is_err());
    }
}
