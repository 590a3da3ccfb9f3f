//! Rotating JSONL writer

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::types::LinkRecord;
use crate::error::Result;

const FILE_PREFIX: &str = "link_";
const FILE_EXTENSION: &str = "jsonl";

/// Appends [`LinkRecord`]s to `link_<timestamp>_<seq>.jsonl` files
///
/// A new file is started every `max_records_per_file` records; only the
/// newest `max_files_to_keep` files are retained.
#[derive(Debug)]
pub struct TelemetryLogger {
    dir: PathBuf,
    max_records_per_file: usize,
    max_files_to_keep: usize,
    writer: Option<BufWriter<File>>,
    current: Option<PathBuf>,
    records_in_file: usize,
    sequence: u32,
}

impl TelemetryLogger {
    /// Create the log directory if needed
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created
    pub fn new<P: AsRef<Path>>(dir: P, max_records_per_file: usize, max_files_to_keep: usize) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        info!("Telemetry logging to {}", dir.display());

        Ok(Self {
            dir,
            max_records_per_file: max_records_per_file.max(1),
            max_files_to_keep: max_files_to_keep.max(1),
            writer: None,
            current: None,
            records_in_file: 0,
            sequence: 0,
        })
    }

    /// Append one record, rotating first if the current file is full
    ///
    /// # Errors
    ///
    /// Returns error on serialization or file I/O failure
    pub fn log(&mut self, record: &LinkRecord) -> Result<()> {
        if self.writer.is_none() || self.records_in_file >= self.max_records_per_file {
            self.rotate(record)?;
        }

        let line = serde_json::to_string(record)?;
        if let Some(writer) = self.writer.as_mut() {
            writeln!(writer, "{}", line)?;
            writer.flush()?;
        }
        self.records_in_file += 1;
        Ok(())
    }

    /// File currently being written
    pub fn current_file(&self) -> Option<&Path> {
        self.current.as_deref()
    }

    fn rotate(&mut self, record: &LinkRecord) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }

        let name = format!(
            "{}{}_{:06}.{}",
            FILE_PREFIX,
            record.timestamp.format("%Y%m%d_%H%M%S"),
            self.sequence,
            FILE_EXTENSION
        );
        self.sequence += 1;

        let path = self.dir.join(name);
        let file = File::create(&path)?;
        debug!("Opened telemetry file {}", path.display());

        self.writer = Some(BufWriter::new(file));
        self.current = Some(path);
        self.records_in_file = 0;

        self.prune();
        Ok(())
    }

    /// Delete the oldest log files beyond the retention limit
    fn prune(&self) {
        let mut files = match self.log_files() {
            Ok(files) => files,
            Err(e) => {
                warn!("Failed to list telemetry files: {}", e);
                return;
            }
        };

        if files.len() <= self.max_files_to_keep {
            return;
        }

        files.sort();
        let excess = files.len() - self.max_files_to_keep;
        for path in files.into_iter().take(excess) {
            if let Err(e) = fs::remove_file(&path) {
                warn!("Failed to remove {}: {}", path.display(), e);
            }
        }
    }

    fn log_files(&self) -> std::io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            let is_log = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(FILE_PREFIX))
                && path.extension().is_some_and(|e| e == FILE_EXTENSION);
            if is_log {
                files.push(path);
            }
        }
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn record(n: u64) -> LinkRecord {
        LinkRecord {
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            state: "tracking",
            bound: true,
            online: true,
            hop_index: (n % 20) as u8,
            backoff: 0,
            frames_received: n,
            channels: [500; 8],
            replay: None,
        }
    }

    fn files_in(dir: &Path) -> Vec<PathBuf> {
        let mut files: Vec<_> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        files.sort();
        files
    }

    #[test]
    fn test_creates_directory() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("nested").join("logs");
        TelemetryLogger::new(&dir, 10, 2).unwrap();
        assert!(dir.is_dir());
    }

    #[test]
    fn test_no_file_until_first_record() {
        let temp = TempDir::new().unwrap();
        let logger = TelemetryLogger::new(temp.path(), 10, 2).unwrap();
        assert!(logger.current_file().is_none());
        assert!(files_in(temp.path()).is_empty());
    }

    #[test]
    fn test_records_are_json_lines() {
        let temp = TempDir::new().unwrap();
        let mut logger = TelemetryLogger::new(temp.path(), 10, 2).unwrap();

        logger.log(&record(1)).unwrap();
        logger.log(&record(2)).unwrap();

        let contents = fs::read_to_string(logger.current_file().unwrap()).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 2);

        let value: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(value["state"], "tracking");
        assert_eq!(value["frames_received"], 2);
        assert_eq!(value["channels"][0], 500);
        assert!(value.get("replay").is_none());
    }

    #[test]
    fn test_rotates_after_max_records() {
        let temp = TempDir::new().unwrap();
        let mut logger = TelemetryLogger::new(temp.path(), 3, 10).unwrap();

        for n in 0..7 {
            logger.log(&record(n)).unwrap();
        }

        let files = files_in(temp.path());
        assert_eq!(files.len(), 3);
        let counts: Vec<_> = files
            .iter()
            .map(|f| fs::read_to_string(f).unwrap().lines().count())
            .collect();
        assert_eq!(counts, vec![3, 3, 1]);
    }

    #[test]
    fn test_keeps_only_newest_files() {
        let temp = TempDir::new().unwrap();
        let mut logger = TelemetryLogger::new(temp.path(), 1, 2).unwrap();

        for n in 0..5 {
            logger.log(&record(n)).unwrap();
        }

        let files = files_in(temp.path());
        assert_eq!(files.len(), 2);
        assert_eq!(files[1].as_path(), logger.current_file().unwrap());

        let first: serde_json::Value =
            serde_json::from_str(fs::read_to_string(&files[0]).unwrap().trim()).unwrap();
        assert_eq!(first["frames_received"], 3);
    }

    #[test]
    fn test_prune_ignores_foreign_files() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("notes.txt"), "keep me").unwrap();
        let mut logger = TelemetryLogger::new(temp.path(), 1, 1).unwrap();

        for n in 0..3 {
            logger.log(&record(n)).unwrap();
        }

        assert!(temp.path().join("notes.txt").exists());
        assert_eq!(files_in(temp.path()).len(), 2);
    }
}
