use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Writes `value` as pretty JSON to `{dir}/{name}-{timestamp}.json`.
pub fn write_report<T: Serialize>(
    dir: &Path,
    name: &str,
    generated_at: DateTime<Utc>,
    value: &T,
) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("unable to create report directory {}", dir.display()))?;
    let path = dir.join(format!("{name}-{}.json", generated_at.format("%Y%m%dT%H%M%SZ")));
    let file = std::fs::File::create(&path)
        .with_context(|| format!("unable to create report {}", path.display()))?;
    serde_json::to_writer_pretty(file, value)?;
    tracing::info!(path = %path.display(), "report written");
    Ok(path)
}
