// PID file implementation of RecordStore
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

use pipectl_core::domain::Pid;
use pipectl_core::port::record_store::{RecordError, RecordStore};

/// Plain-text marker file holding one PID
///
/// Writes go through a sibling temp file and a rename, so readers see either
/// the old or the new PID and never a partial write.
pub struct PidFile {
    path: PathBuf,
}

impl PidFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "pipeline.pid".to_string());
        self.path.with_file_name(format!(".{name}.tmp"))
    }
}

impl RecordStore for PidFile {
    fn load(&self) -> Result<Option<Pid>, RecordError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let corrupt = |bytes: &[u8]| RecordError::Corrupt {
            content: String::from_utf8_lossy(bytes).trim().to_string(),
        };
        let content = std::str::from_utf8(&bytes).map_err(|_| corrupt(&bytes))?;

        content.parse().map(Some).map_err(|_| corrupt(&bytes))
    }

    fn save(&self, pid: Pid) -> Result<(), RecordError> {
        let temp = self.temp_path();
        fs::write(&temp, format!("{pid}\n"))?;

        if let Err(e) = fs::rename(&temp, &self.path) {
            let _ = fs::remove_file(&temp);
            return Err(e.into());
        }

        debug!(pid = %pid, path = %self.path.display(), "PID file written");
        Ok(())
    }

    fn delete(&self) -> Result<bool, RecordError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "PID file removed");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_is_no_record() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path();
        let file = PidFile::new(dir.join("pipeline.pid"));

        assert!(file.load().unwrap().is_none());
        assert!(!file.delete().unwrap());
    }

    #[test]
    fn test_save_load_delete() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path();
        let file = PidFile::new(dir.join("pipeline.pid"));
        let pid = Pid::new(4321).unwrap();

        file.save(pid).unwrap();
        assert_eq!(fs::read_to_string(file.path()).unwrap(), "4321\n");
        assert_eq!(file.load().unwrap(), Some(pid));

        assert!(file.delete().unwrap());
        assert!(!file.path().exists());
        assert!(file.load().unwrap().is_none());
    }

    #[test]
    fn test_save_overwrites_and_leaves_no_temp_file() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path();
        let file = PidFile::new(dir.join("pipeline.pid"));

        file.save(Pid::new(1).unwrap()).unwrap();
        file.save(Pid::new(2).unwrap()).unwrap();

        assert_eq!(file.load().unwrap(), Some(Pid::new(2).unwrap()));
        let entries: Vec<_> = fs::read_dir(dir).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_accepts_shell_written_content() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path();
        let file = PidFile::new(dir.join("pipeline.pid"));
        fs::write(file.path(), "  987 \r\n").unwrap();

        assert_eq!(file.load().unwrap(), Some(Pid::new(987).unwrap()));
    }

    #[test]
    fn test_garbage_is_corrupt() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path();
        let file = PidFile::new(dir.join("pipeline.pid"));
        fs::write(file.path(), "hello\n").unwrap();

        match file.load() {
            Err(RecordError::Corrupt { content }) => assert_eq!(content, "hello"),
            other => panic!("expected corrupt record, got {other:?}"),
        }
    }

    #[test]
    fn test_non_utf8_is_corrupt() {
        let tmp = tempdir().unwrap();
        let file = PidFile::new(tmp.path().join("pipeline.pid"));
        fs::write(file.path(), [0xff, 0xfe, b'\n']).unwrap();

        assert!(matches!(file.load(), Err(RecordError::Corrupt { .. })));
        assert!(file.delete().unwrap());
    }
}
