//! JSON output of the aggregated feed.
//!
//! The file is the one interface downstream consumers rely on, so it is written
//! atomically: the document goes to a sibling `.json.tmp` file, is flushed to disk,
//! and then renamed over the destination. Readers see either the previous
//! snapshot or the new one, never a partial write.
//!
//! # Output Shape
//!
//! ```text
//! {
//!   "generated_at": "2025-05-06T12:00:00.123456+00:00",
//!   "contests": [
//!     {
//!       "site": "cf",
//!       "name": "Codeforces Round 1010",
//!       "start": "2025-05-06T14:00:00+00:00"
//!     }
//!   ]
//! }
//! ```

use crate::error::PersistError;
use crate::models::Snapshot;
use crate::utils::ensure_parent_dir;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{error, info, instrument};

/// Encode a snapshot exactly as it is written to disk.
pub fn render(snapshot: &Snapshot) -> Result<String, PersistError> {
    Ok(serde_json::to_string_pretty(snapshot)?)
}

/// Sibling temporary path used while writing `path`; never equal to `path`.
pub fn temp_path(path: &Path) -> PathBuf {
    path.with_extension("json.tmp")
}

/// Write `snapshot` to `path`, replacing any previous file atomically.
///
/// Creates the parent directory if needed, writes the rendered document to
/// [`temp_path`], syncs it and renames it over `path`. On any failure the
/// temporary file is removed and the previous feed (if any) is left untouched.
///
/// # Arguments
///
/// * `snapshot` - The aggregated feed to serialize
/// * `path` - Destination of the JSON document
///
/// # Returns
///
/// `Ok(())` once the new file is in place, or [`PersistError::Io`] naming the
/// path that could not be created, written or renamed.
#[instrument(level = "info", skip_all, fields(path = %path.display(), contests = snapshot.contests.len()))]
pub async fn write_snapshot(snapshot: &Snapshot, path: &Path) -> Result<(), PersistError> {
    let json = render(snapshot)?;
    ensure_parent_dir(path).await.map_err(io_err(path))?;

    let tmp = temp_path(path);
    let write = async {
        let mut file = fs::File::create(&tmp).await?;
        file.write_all(json.as_bytes()).await?;
        file.sync_all().await?;
        Ok::<_, std::io::Error>(())
    };
    if let Err(e) = write.await {
        error!(tmp = %tmp.display(), error = %e, "Failed to write temporary file");
        let _ = fs::remove_file(&tmp).await;
        return Err(io_err(&tmp)(e));
    }

    if let Err(e) = fs::rename(&tmp, path).await {
        error!(tmp = %tmp.display(), error = %e, "Failed to move temporary file into place");
        let _ = fs::remove_file(&tmp).await;
        return Err(io_err(path)(e));
    }
    info!(bytes = json.len(), "Wrote contest feed");
    Ok(())
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> PersistError {
    let path = path.display().to_string();
    move |source| PersistError::Io { path, source }
}
