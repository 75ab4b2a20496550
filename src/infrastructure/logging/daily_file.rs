use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::domain::errors::{DispatchError, DispatchResult};

/// Append-only `whatsapi-YYYYMMDD.log` files inside one directory.
#[derive(Debug, Clone)]
pub struct DailyLogFile {
    dir: PathBuf,
}

impl DailyLogFile {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, now: &DateTime<Local>) -> PathBuf {
        self.dir
            .join(format!("whatsapi-{}.log", now.format("%Y%m%d")))
    }

    /// Fails with `LogPathUnavailable` unless the directory exists and is writable.
    pub fn ensure_writable(&self) -> DispatchResult<()> {
        let unavailable = || DispatchError::LogPathUnavailable(self.dir.display().to_string());
        let metadata = std::fs::metadata(&self.dir).map_err(|_| unavailable())?;
        if !metadata.is_dir() || metadata.permissions().readonly() {
            return Err(unavailable());
        }
        Ok(())
    }

    pub fn append(&self, event: &str, message: &str) -> DispatchResult<()> {
        self.ensure_writable()?;

        let now = Local::now();
        let name = event.strip_prefix("on").unwrap_or(event);
        let line = format!("[{}] {}: {}\n", now.format("%Y-%m-%d %H:%M:%S"), name, message);

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path_for(&now))
            .map_err(|_| DispatchError::LogPathUnavailable(self.dir.display().to_string()))?;
        file.lock()?;
        file.write_all(line.as_bytes())?;
        file.unlock()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_timestamped_lines_without_on_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let log = DailyLogFile::new(dir.path());

        log.append("onConnect", "521 Connected successfully!").unwrap();
        log.append("onDisconnect", "521 Disconnected!").unwrap();

        let contents = std::fs::read_to_string(log.path_for(&Local::now())).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with('['));
        assert!(lines[0].ends_with("] Connect: 521 Connected successfully!"));
        assert!(lines[1].ends_with("] Disconnect: 521 Disconnected!"));
    }

    #[test]
    fn missing_directory_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let log = DailyLogFile::new(dir.path().join("missing"));
        assert!(matches!(
            log.append("onConnect", "x"),
            Err(DispatchError::LogPathUnavailable(_))
        ));
    }
}
