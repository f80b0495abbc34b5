use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use thiserror::Error;

use crate::config::NodeConfig;

/// Retries a failing append before giving up. `node.py::write_out` polls
/// forever on write failure (`while not done`); this replaces that with a
/// bounded retry so a wedged disk can't hang the tick loop.
const MAX_WRITE_RETRIES: u32 = 5;
const RETRY_DELAY: Duration = Duration::from_millis(50);

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to create directory {path}: {source}")]
    CreateDir { path: PathBuf, source: io::Error },
    #[error("failed to open {path}: {source}")]
    Open { path: PathBuf, source: io::Error },
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to append to {path} after {MAX_WRITE_RETRIES} attempts: {source}")]
    WriteExhausted { path: PathBuf, source: io::Error },
}

/// The runtime shell's file transport: this node's inbound stream (written
/// by the controller), outbound stream (read by the controller), per-root
/// received-data sinks, and log file. Holds no protocol state — it only
/// moves bytes.
pub struct FileTransport {
    inbound_path: PathBuf,
    outbound_path: PathBuf,
    base_dir: PathBuf,
    self_id: u8,
    read_lines: usize,
    log: File,
}

impl FileTransport {
    pub fn open(config: &NodeConfig) -> Result<Self, TransportError> {
        let log_path = config.log_path();
        let out_dir = config.outbound_path().parent().unwrap().to_path_buf();
        fs::create_dir_all(&out_dir).map_err(|source| TransportError::CreateDir { path: out_dir, source })?;
        let log_dir = log_path.parent().unwrap().to_path_buf();
        fs::create_dir_all(&log_dir).map_err(|source| TransportError::CreateDir { path: log_dir, source })?;

        let log = File::create(&log_path).map_err(|source| TransportError::Open { path: log_path, source })?;

        Ok(Self {
            inbound_path: config.inbound_path(),
            outbound_path: config.outbound_path(),
            base_dir: config.base_dir.clone(),
            self_id: config.id,
            read_lines: 0,
            log,
        })
    }

    /// Reads every new line appended to the inbound file since the last
    /// call, de-duplicating the newly-seen batch (a node's inbound file can
    /// carry the same flooded line from more than one neighbor in a single
    /// tick; `node.py::read_input_file` dedups with the same `set(...)` over
    /// just the unread suffix).
    pub fn poll_inbound(&mut self) -> Result<Vec<String>, TransportError> {
        let file = match File::open(&self.inbound_path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(TransportError::Read { path: self.inbound_path.clone(), source }),
        };

        let lines: Vec<String> = BufReader::new(file)
            .lines()
            .collect::<Result<_, _>>()
            .map_err(|source| TransportError::Read { path: self.inbound_path.clone(), source })?;

        if lines.len() <= self.read_lines {
            return Ok(Vec::new());
        }

        let fresh = &lines[self.read_lines..];
        let deduped: HashSet<&String> = fresh.iter().collect();
        self.read_lines = lines.len();
        Ok(deduped.into_iter().cloned().collect())
    }

    pub fn emit_outbound(&mut self, line: &str) -> Result<(), TransportError> {
        self.append_with_retry(&self.outbound_path.clone(), line)
    }

    pub fn deliver(&mut self, root: u8, payload: &str) -> Result<(), TransportError> {
        let path = self.base_dir.join("out").join(format!("{}_received_from_{}", self.self_id, root));
        self.append_with_retry(&path, payload)
    }

    pub fn log_line(&mut self, line: &str) {
        let _ = writeln!(self.log, "{line}");
    }

    fn append_with_retry(&mut self, path: &PathBuf, line: &str) -> Result<(), TransportError> {
        let mut last_err = None;
        for attempt in 0..MAX_WRITE_RETRIES {
            match OpenOptions::new().create(true).append(true).open(path) {
                Ok(mut file) => {
                    if writeln!(file, "{line}").is_ok() {
                        return Ok(());
                    }
                }
                Err(err) => last_err = Some(err),
            }
            if attempt + 1 < MAX_WRITE_RETRIES {
                self.log_line(&format!("failed to write to {}, retrying", path.display()));
                thread::sleep(RETRY_DELAY);
            }
        }
        Err(TransportError::WriteExhausted {
            path: path.clone(),
            source: last_err.unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, "write did not complete")),
        })
    }
}

/// Flushes the log on every exit path, including an early `?`-propagated
/// return from the runtime shell, without any open/format logic of its own.
impl Drop for FileTransport {
    fn drop(&mut self) {
        let _ = self.log.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Mode;

    fn config(dir: &std::path::Path) -> NodeConfig {
        NodeConfig { id: 2, mode: Mode::None, duration: 10, base_dir: dir.to_path_buf() }
    }

    #[test]
    fn poll_inbound_dedups_new_batch_only() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let mut transport = FileTransport::open(&config).unwrap();

        fs::write(config.inbound_path(), "hello 0\nhello 0\nhello 1\n").unwrap();
        let mut first = transport.poll_inbound().unwrap();
        first.sort();
        assert_eq!(first, vec!["hello 0".to_string(), "hello 1".to_string()]);

        assert!(transport.poll_inbound().unwrap().is_empty());

        let mut existing = fs::read_to_string(config.inbound_path()).unwrap();
        existing.push_str("hello 2\n");
        fs::write(config.inbound_path(), existing).unwrap();
        assert_eq!(transport.poll_inbound().unwrap(), vec!["hello 2".to_string()]);
    }

    #[test]
    fn missing_inbound_file_is_empty_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut transport = FileTransport::open(&config(dir.path())).unwrap();
        assert_eq!(transport.poll_inbound().unwrap(), Vec::<String>::new());
    }

    #[test]
    fn emit_outbound_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let mut transport = FileTransport::open(&config).unwrap();
        transport.emit_outbound("hello 2").unwrap();
        transport.emit_outbound("hello 2").unwrap();
        let contents = fs::read_to_string(config.outbound_path()).unwrap();
        assert_eq!(contents, "hello 2\nhello 2\n");
    }

    #[test]
    fn deliver_writes_to_per_root_sink() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let mut transport = FileTransport::open(&config).unwrap();
        transport.deliver(0, "hi").unwrap();
        let contents = fs::read_to_string(config.received_path(0)).unwrap();
        assert_eq!(contents, "hi\n");
    }
}
