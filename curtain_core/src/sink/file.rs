use crate::sink::LogSink;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::warn;

/// A [`LogSink`] that appends timestamped, levelled lines to a file.
///
/// Each line has the shape `<RFC 3339 timestamp> <LEVEL> <message>`. Failures
/// to write are reported via `tracing` and otherwise swallowed: the process is
/// usually on its way out when this sink is written to.
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl FileSink {
    /// Opens (creating if necessary) the file at the given path for appending.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    /// Reports the path of the underlying file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_line(&self, level: &str, message: &str) {
        let timestamp = humantime::format_rfc3339_millis(SystemTime::now());
        let mut file = self.file.lock();

        let result = writeln!(file, "{} {} {}", timestamp, level, message).and_then(|_| file.flush());

        if let Err(error) = result {
            warn!(
                path = %self.path.display(),
                error = %error,
                "Failed to write into the log file",
            );
        }
    }
}

impl LogSink for FileSink {
    fn log(&self, message: &str) {
        self.write_line("INFO", message);
    }

    fn error(&self, message: &str) {
        self.write_line("ERROR", message);
    }
}
