//! Log sinks and startup retention for the per-device log file.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Local, NaiveDateTime, TimeDelta};
use color_eyre::eyre::{self, WrapErr};
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::constants::{LOG_FILE_PREFIX, LOG_TIMESTAMP_FORMAT};

/// Installs the global subscriber: plain text to `log_path`, colored to stderr.
///
/// `RUST_LOG` overrides `level` when set.
pub fn init_logging(log_path: &Path, level: &str) -> eyre::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .wrap_err_with(|| format!("invalid log level {level:?}"))?;

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .wrap_err_with(|| format!("open log file: {}", log_path.display()))?;

    let file_layer = fmt::layer()
        .with_writer(Mutex::new(file))
        .with_timer(ChronoLocal::new(LOG_TIMESTAMP_FORMAT.to_owned()))
        .with_ansi(false)
        .with_target(false);

    let stderr_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_timer(ChronoLocal::new(LOG_TIMESTAMP_FORMAT.to_owned()))
        .with_ansi(io::stderr().is_terminal())
        .with_target(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .wrap_err("install tracing subscriber")?;
    Ok(())
}

/// `modstar-plant.yaml` logs to `plant.log` in the same directory.
pub fn default_log_path(config_path: &Path) -> PathBuf {
    let stem = config_path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("modstar");
    let name = stem.strip_prefix(LOG_FILE_PREFIX).filter(|rest| !rest.is_empty()).unwrap_or(stem);
    config_path.with_file_name(format!("{name}.log"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PruneSummary {
    pub kept: usize,
    pub removed: usize,
    pub unparsable: usize,
}

/// Drops entries older than `retention` from the log file at `path`.
///
/// Lines without a leading `%Y-%m-%d %H:%M:%S` timestamp are dropped too and
/// counted separately. Returns `None` when the file does not exist.
pub fn prune_log_file(
    path: &Path,
    retention: TimeDelta,
    now: DateTime<Local>,
) -> eyre::Result<Option<PruneSummary>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(err).wrap_err_with(|| format!("open log file: {}", path.display()));
        }
    };

    let cutoff = (now - retention).naive_local();
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    let summary = rewrite_recent(file, &tmp_path, cutoff)
        .wrap_err_with(|| format!("prune log file: {}", path.display()));
    let summary = match summary {
        Ok(summary) => summary,
        Err(err) => {
            let _ = fs::remove_file(&tmp_path);
            return Err(err);
        }
    };
    fs::rename(&tmp_path, path)
        .wrap_err_with(|| format!("replace log file: {}", path.display()))?;
    Ok(Some(summary))
}

fn rewrite_recent(file: File, tmp_path: &Path, cutoff: NaiveDateTime) -> eyre::Result<PruneSummary> {
    let mut summary = PruneSummary::default();
    let mut out = BufWriter::new(File::create(tmp_path)?);

    for line in BufReader::new(file).lines() {
        let line = line?;
        match line_timestamp(&line) {
            Some(stamp) if stamp > cutoff => {
                writeln!(out, "{line}")?;
                summary.kept += 1;
            }
            Some(_) => summary.removed += 1,
            None => summary.unparsable += 1,
        }
    }
    out.flush()?;
    Ok(summary)
}

fn line_timestamp(line: &str) -> Option<NaiveDateTime> {
    let head = line.get(..19)?;
    NaiveDateTime::parse_from_str(head, LOG_TIMESTAMP_FORMAT).ok()
}
