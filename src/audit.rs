use std::{
    fs::OpenOptions,
    io::Write,
    path::{Path, PathBuf},
    sync::mpsc::{self, Sender},
    thread::JoinHandle,
};

use chrono::{DateTime, SecondsFormat, Utc};
use log::{debug, error, info};

/// One audit record. Serialized as a pipe-delimited line:
/// `<ISO-8601 instant>|<operation>|<table>|<user>|SUCCESS/FAILURE|<sql>|<error>`
/// with any newlines in the SQL replaced by spaces.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub operation: String,
    pub table_name: Option<String>,
    pub sql: String,
    pub user: String,
    pub success: bool,
    pub error: Option<String>,
}

impl AuditEntry {
    fn to_line(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}|{}|{}",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.operation,
            self.table_name.as_deref().unwrap_or(""),
            self.user,
            if self.success { "SUCCESS" } else { "FAILURE" },
            self.sql.replace(['\n', '\r'], " "),
            self.error.as_deref().unwrap_or(""),
        )
    }
}

/// Appends audit entries to `<dir>/audit.log` from a dedicated writer
/// thread fed by an unbounded channel, so statement execution never waits
/// on audit I/O. Write failures are logged and never fail a statement.
pub struct AuditLogger {
    path: PathBuf,
    sender: Option<Sender<AuditEntry>>,
    writer: Option<JoinHandle<()>>,
}

impl AuditLogger {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            sender: None,
            writer: None,
        }
    }

    pub fn start(&mut self) {
        if self.sender.is_some() {
            return;
        }

        let (sender, receiver) = mpsc::channel::<AuditEntry>();
        let path = self.path.clone();
        let writer = std::thread::Builder::new()
            .name("audit-writer".to_string())
            .spawn(move || {
                debug!("Audit writer thread started");
                // recv fails once the sender is dropped, after the queue
                // has drained.
                while let Ok(entry) = receiver.recv() {
                    if let Err(io_error) = append_line(&path, &entry.to_line()) {
                        error!(
                            "Failed to write audit entry to {}: {}",
                            path.display(),
                            io_error
                        );
                    }
                }
                debug!("Audit writer thread stopped");
            })
            .ok();

        if writer.is_some() {
            self.sender = Some(sender);
            self.writer = writer;
            info!("Audit logging started, writing to: {}", self.path.display());
        } else {
            error!("Failed to spawn audit writer thread");
        }
    }

    pub fn log(&self, entry: AuditEntry) {
        if let Some(sender) = &self.sender {
            if sender.send(entry).is_err() {
                error!("Audit writer is gone; dropping audit entry");
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn log_statement(
        &self,
        operation: &str,
        table_name: Option<&str>,
        sql: &str,
        user: &str,
        success: bool,
        error: Option<&str>,
    ) {
        self.log(AuditEntry {
            timestamp: Utc::now(),
            operation: operation.to_string(),
            table_name: table_name.map(str::to_string),
            sql: sql.to_string(),
            user: user.to_string(),
            success,
            error: error.map(str::to_string),
        });
    }

    /// Disconnects the channel and waits for the writer to drain.
    pub fn stop(&mut self) {
        self.sender.take();
        if let Some(writer) = self.writer.take() {
            if writer.join().is_err() {
                error!("Audit writer thread did not stop cleanly");
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for AuditLogger {
    fn drop(&mut self) {
        self.stop();
    }
}

fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", line)?;
    file.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_line_format() {
        let entry = AuditEntry {
            timestamp: Utc::now(),
            operation: "INSERT".to_string(),
            table_name: Some("users".to_string()),
            sql: "INSERT INTO users\n(id) VALUES (1)".to_string(),
            user: "system".to_string(),
            success: true,
            error: None,
        };

        let line = entry.to_line();
        let fields: Vec<&str> = line.split('|').collect();
        assert_eq!(fields.len(), 7);
        assert_eq!(fields[1], "INSERT");
        assert_eq!(fields[2], "users");
        assert_eq!(fields[3], "system");
        assert_eq!(fields[4], "SUCCESS");
        assert!(!fields[5].contains('\n'));
    }
}
