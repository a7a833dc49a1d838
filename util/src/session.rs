//! Session management

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::fs::OpenOptions;
use std::path::Path;
use std::path::PathBuf;
use thiserror::Error;

// Internal imports
use crate::time;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// A chrono format string which diplays a timestamp. See
/// https://docs.rs/chrono/0.4.11/chrono/format/strftime/index.html for more
/// information.
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A struct storing information about the current session
#[derive(Clone, Debug)]
pub struct Session {
    /// The root directory for this session
    pub session_root: PathBuf,

    /// The root directory for this session's archives
    pub arch_root: PathBuf,

    /// The path to the session's log file
    pub log_file_path: PathBuf,

    /// The instant the session was started
    epoch: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors associated with the session module.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Cannot create the session directory: {0}")]
    CannotCreateDir(std::io::Error),

    #[error("Cannot create the file {0:?}: {1}")]
    CannotCreateFile(PathBuf, std::io::Error),

    #[error("Cannot serialize data for the file {0:?}: {1}")]
    SerializeError(PathBuf, serde_json::Error),

    #[error("Unrecognised file path extension for {0:?}, only json is supported")]
    UnsupportedExtension(PathBuf),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Session {
    /// Start a new session within the given directory.
    ///
    /// This will create a new session directory named `{exec_name}_{timestamp}`
    pub fn new<P: AsRef<Path>>(exec_name: &str, sessions_dir: P) -> Result<Self, SessionError> {
        let epoch = Utc::now();

        // Create the session path
        let mut path: PathBuf = sessions_dir.as_ref().to_path_buf();
        path.push(format!("{}_{}", exec_name, epoch.format(TIMESTAMP_FORMAT)));

        // Create the directory
        fs::create_dir_all(&path).map_err(SessionError::CannotCreateDir)?;

        // Create the archive dir
        let arch_path = path.join("arch");
        fs::create_dir_all(&arch_path).map_err(SessionError::CannotCreateDir)?;

        // Create the log file path
        let log_file_path = path.join(format!("{}.log", exec_name));

        Ok(Session {
            session_root: path,
            arch_root: arch_path,
            log_file_path,
            epoch,
        })
    }

    /// Return the session's epoch.
    pub fn epoch(&self) -> DateTime<Utc> {
        self.epoch
    }

    /// Get the number of seconds elapsed since the start of the session.
    pub fn elapsed_seconds(&self) -> f64 {
        elapsed_since(self.epoch)
    }

    /// Saves the given data to the given session-relative path.
    ///
    /// Only `.json` paths are supported. Parent directories are created as needed.
    pub fn save_json<P: AsRef<Path>, T: Serialize>(
        &self,
        path: P,
        data: &T,
    ) -> Result<PathBuf, SessionError> {
        let full_path = self.session_root.join(path);

        match full_path.extension().and_then(|s| s.to_str()) {
            Some("json") => (),
            _ => return Err(SessionError::UnsupportedExtension(full_path)),
        }

        // Create the parent path if needed
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).map_err(SessionError::CannotCreateDir)?;
        }

        let file = OpenOptions::new()
            .write(true)
            .truncate(true)
            .create(true)
            .open(&full_path)
            .map_err(|e| SessionError::CannotCreateFile(full_path.clone(), e))?;

        serde_json::to_writer_pretty(&file, data)
            .map_err(|e| SessionError::SerializeError(full_path.clone(), e))?;

        Ok(full_path)
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Get the number of seconds elapsed since the given epoch, or NaN if the
/// duration overflows.
pub fn elapsed_since(epoch: DateTime<Utc>) -> f64 {
    match time::duration_to_seconds(Utc::now() - epoch) {
        Some(s) => s,
        None => std::f64::NAN,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn temp_sessions_dir(name: &str) -> PathBuf {
        let mut dir = std::env::temp_dir();
        dir.push(format!("util_session_{}_{}", name, std::process::id()));
        dir
    }

    #[test]
    fn test_new_creates_dirs() {
        let dir = temp_sessions_dir("new");
        let session = Session::new("test_exec", &dir).unwrap();

        assert!(session.session_root.is_dir());
        assert!(session.arch_root.is_dir());
        assert!(session.session_root.starts_with(&dir));
        assert_eq!(
            session.log_file_path.file_name().unwrap().to_str(),
            Some("test_exec.log")
        );
        assert!(session.elapsed_seconds() >= 0.0);

        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_save_json() {
        #[derive(Serialize)]
        struct Summary {
            num_ticks: u64,
        }

        let dir = temp_sessions_dir("save");
        let session = Session::new("test_exec", &dir).unwrap();

        let path = session
            .save_json("nested/summary.json", &Summary { num_ticks: 12 })
            .unwrap();
        let contents = fs::read_to_string(path).unwrap();
        assert!(contents.contains("\"num_ticks\": 12"));

        assert!(matches!(
            session.save_json("summary.txt", &Summary { num_ticks: 0 }),
            Err(SessionError::UnsupportedExtension(_))
        ));

        fs::remove_dir_all(dir).ok();
    }
}
