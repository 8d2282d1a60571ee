//! Configuration loading and parsing.
//!
//! Parses `bufcore.toml` (or an override path provided by the binary). The
//! only section today is `[undo]`, which carries the three truncation
//! thresholds consumed by the undo log:
//!
//! ```toml
//! [undo]
//! limit = 80000          # soft limit
//! strong_limit = 120000
//! outer_limit = "none"   # or an integer
//! ```
//!
//! Unknown fields are ignored so newer files keep loading. A file that fails
//! to parse falls back to defaults and logs a warning under the `config`
//! target; a missing file is not an error.

use anyhow::Result;
use serde::Deserialize;
use std::{fs, path::PathBuf};
use tracing::{debug, warn};

pub const DEFAULT_UNDO_LIMIT: usize = 80_000;
pub const DEFAULT_UNDO_STRONG_LIMIT: usize = 120_000;
pub const DEFAULT_UNDO_OUTER_LIMIT: usize = 12_000_000;

const CONFIG_FILE_NAME: &str = "bufcore.toml";

/// Outer limit on the undo information a single command may produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawOuterLimit")]
pub enum OuterLimit {
    Bytes(usize),
    Unlimited,
}

impl OuterLimit {
    /// The limit as an optional byte count (`None` = no limit).
    pub fn bytes(self) -> Option<usize> {
        match self {
            OuterLimit::Bytes(n) => Some(n),
            OuterLimit::Unlimited => None,
        }
    }
}

impl Default for OuterLimit {
    fn default() -> Self {
        OuterLimit::Bytes(DEFAULT_UNDO_OUTER_LIMIT)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawOuterLimit {
    Bytes(usize),
    Keyword(String),
}

impl TryFrom<RawOuterLimit> for OuterLimit {
    type Error = String;

    fn try_from(raw: RawOuterLimit) -> std::result::Result<Self, Self::Error> {
        match raw {
            RawOuterLimit::Bytes(n) => Ok(OuterLimit::Bytes(n)),
            RawOuterLimit::Keyword(k) => match k.as_str() {
                "none" | "unlimited" => Ok(OuterLimit::Unlimited),
                other => Err(format!(
                    "outer_limit must be an integer or \"none\", got {other:?}"
                )),
            },
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct UndoConfig {
    #[serde(default = "UndoConfig::default_limit")]
    pub limit: usize,
    #[serde(default = "UndoConfig::default_strong_limit")]
    pub strong_limit: usize,
    #[serde(default)]
    pub outer_limit: OuterLimit,
}

impl Default for UndoConfig {
    fn default() -> Self {
        Self {
            limit: Self::default_limit(),
            strong_limit: Self::default_strong_limit(),
            outer_limit: OuterLimit::default(),
        }
    }
}

impl UndoConfig {
    const fn default_limit() -> usize {
        DEFAULT_UNDO_LIMIT
    }
    const fn default_strong_limit() -> usize {
        DEFAULT_UNDO_STRONG_LIMIT
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct ConfigFile {
    #[serde(default)]
    pub undo: UndoConfig,
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub raw: Option<String>, // original file string (optional)
    pub file: ConfigFile,    // parsed (or default) data
}

impl Config {
    pub fn undo(&self) -> &UndoConfig {
        &self.file.undo
    }
}

/// Best-effort config path: working directory first, then the platform
/// config dir (XDG / AppData Roaming).
pub fn discover() -> PathBuf {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("bufcore").join(CONFIG_FILE_NAME);
    }
    PathBuf::from(CONFIG_FILE_NAME)
}

pub fn load_from(path: Option<PathBuf>) -> Result<Config> {
    let path = path.unwrap_or_else(discover);
    let Ok(content) = fs::read_to_string(&path) else {
        debug!(target: "config", path = %path.display(), "config_missing_using_defaults");
        return Ok(Config::default());
    };
    match toml::from_str::<ConfigFile>(&content) {
        Ok(file) => {
            debug!(
                target: "config",
                path = %path.display(),
                limit = file.undo.limit,
                strong_limit = file.undo.strong_limit,
                outer_limit = ?file.undo.outer_limit.bytes(),
                "config_loaded"
            );
            Ok(Config {
                raw: Some(content),
                file,
            })
        }
        Err(err) => {
            warn!(
                target: "config",
                path = %path.display(),
                error = %err,
                "config_parse_failed_using_defaults"
            );
            Ok(Config::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex, MutexGuard};
    use tracing::Level;
    use tracing::subscriber::with_default;
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone)]
    struct BufferWriter {
        inner: Arc<Mutex<Vec<u8>>>,
    }

    impl BufferWriter {
        fn new() -> (Self, Arc<Mutex<Vec<u8>>>) {
            let buf = Arc::new(Mutex::new(Vec::new()));
            (Self { inner: buf.clone() }, buf)
        }
    }

    struct LockedWriter<'a> {
        guard: MutexGuard<'a, Vec<u8>>,
    }

    impl<'a> Write for LockedWriter<'a> {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.guard.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for BufferWriter {
        type Writer = LockedWriter<'a>;

        fn make_writer(&'a self) -> Self::Writer {
            LockedWriter {
                guard: self.inner.lock().expect("log buffer poisoned"),
            }
        }
    }

    fn write_config(body: &str) -> tempfile::NamedTempFile {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), body).unwrap();
        tmp
    }

    #[test]
    fn default_config_when_missing_file() {
        let cfg = load_from(Some(PathBuf::from("__nonexistent_hopefully__.toml"))).unwrap();
        assert!(cfg.raw.is_none());
        assert_eq!(cfg.undo(), &UndoConfig::default());
        assert_eq!(cfg.undo().limit, 80_000);
        assert_eq!(cfg.undo().strong_limit, 120_000);
        assert_eq!(cfg.undo().outer_limit.bytes(), Some(12_000_000));
    }

    #[test]
    fn parses_all_undo_limits() {
        let tmp = write_config("[undo]\nlimit = 10\nstrong_limit = 20\nouter_limit = 30\n");
        let cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        assert_eq!(cfg.undo().limit, 10);
        assert_eq!(cfg.undo().strong_limit, 20);
        assert_eq!(cfg.undo().outer_limit, OuterLimit::Bytes(30));
        assert!(cfg.raw.is_some());
    }

    #[test]
    fn partial_section_keeps_remaining_defaults() {
        let tmp = write_config("[undo]\nlimit = 500\n");
        let cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        assert_eq!(cfg.undo().limit, 500);
        assert_eq!(cfg.undo().strong_limit, DEFAULT_UNDO_STRONG_LIMIT);
        assert_eq!(cfg.undo().outer_limit, OuterLimit::default());
    }

    #[test]
    fn outer_limit_keyword_means_unlimited() {
        let tmp = write_config("[undo]\nouter_limit = \"none\"\n");
        let cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        assert_eq!(cfg.undo().outer_limit, OuterLimit::Unlimited);
        assert_eq!(cfg.undo().outer_limit.bytes(), None);
    }

    #[test]
    fn unknown_sections_are_ignored() {
        let tmp = write_config("[display]\nwidth = 3\n[undo]\nstrong_limit = 7\n");
        let cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        assert_eq!(cfg.undo().strong_limit, 7);
    }

    #[test]
    fn bad_outer_keyword_falls_back_and_logs() {
        let tmp = write_config("[undo]\nlimit = 5\nouter_limit = \"sometimes\"\n");
        let (writer, buffer) = BufferWriter::new();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(Level::WARN)
            .with_target(true)
            .with_ansi(false)
            .without_time()
            .with_writer(writer)
            .finish();

        let cfg = with_default(subscriber, || {
            load_from(Some(tmp.path().to_path_buf())).unwrap()
        });

        let log_output = String::from_utf8(buffer.lock().unwrap().clone()).unwrap();
        assert!(log_output.contains("WARN config:"));
        assert!(log_output.contains("config_parse_failed_using_defaults"));
        // Whole file rejected: even the valid `limit` is not applied.
        assert_eq!(cfg.undo().limit, DEFAULT_UNDO_LIMIT);
        assert!(cfg.raw.is_none());
    }
}
