// CSV export artifacts: the raw fetched rows, one file per pitcher.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write export {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Write one pitcher's raw fetched CSV body verbatim to
/// `{dir}/{Display_Name}_data.csv` and return the artifact path.
///
/// The body is the provider's response unmodified: UTF-8, comma-separated,
/// header row included. The directory is created if missing.
pub fn export_raw_csv(
    dir: &Path,
    display_name: &str,
    raw_csv: &str,
) -> Result<PathBuf, ExportError> {
    std::fs::create_dir_all(dir).map_err(|e| ExportError::Io {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let path = dir.join(format!("{}_data.csv", artifact_stem(display_name)));
    std::fs::write(&path, raw_csv.as_bytes()).map_err(|e| ExportError::Io {
        path: path.clone(),
        source: e,
    })?;

    info!(path = %path.display(), bytes = raw_csv.len(), "wrote export artifact");
    Ok(path)
}

/// Spaces become underscores; path separators in a free-form name would
/// escape the export directory, so they are replaced too.
fn artifact_stem(display_name: &str) -> String {
    display_name
        .chars()
        .map(|c| match c {
            ' ' | '/' | '\\' => '_',
            other => other,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
