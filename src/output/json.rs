//! JSON Output Document writer.
//!
//! The document is written to a temporary file next to the destination and
//! renamed over it, so readers never observe a half-written file.

use crate::error::{ReportError, Result};
use crate::warehouse::QueryResult;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

/// Indentation used for the pretty-printed document.
pub const INDENT: &[u8] = b"    ";

/// Serializes the result table as a pretty-printed JSON array of row objects.
pub fn render_document(result: &QueryResult) -> Result<Vec<u8>> {
    let records = result.to_records();
    let mut buf = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(INDENT));
    records
        .serialize(&mut serializer)
        .map_err(|e| ReportError::internal(format!("Failed to serialize result: {e}")))?;
    buf.push(b'\n');
    Ok(buf)
}

/// Writes the Output Document to `path`, replacing any previous content.
///
/// The parent directory must already exist.
pub fn write_document(path: &Path, result: &QueryResult) -> Result<()> {
    let document = render_document(result)?;

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    if !parent.is_dir() {
        return Err(ReportError::output(format!(
            "Output directory {} does not exist",
            parent.display()
        )));
    }

    let mut file = NamedTempFile::new_in(parent).map_err(|e| {
        ReportError::output(format!("Cannot write to {}: {e}", parent.display()))
    })?;
    file.write_all(&document)
        .and_then(|_| file.as_file().sync_all())
        .map_err(|e| ReportError::output(format!("Failed to write {}: {e}", path.display())))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        // NamedTempFile creates files with mode 0600
        std::fs::set_permissions(file.path(), std::fs::Permissions::from_mode(0o644))
            .map_err(|e| {
                ReportError::output(format!(
                    "Failed to set permissions on {}: {e}",
                    path.display()
                ))
            })?;
    }

    file.persist(path).map_err(|e| {
        ReportError::output(format!("Failed to replace {}: {}", path.display(), e.error))
    })?;

    debug!("Wrote {} bytes to {}", document.len(), path.display());
    Ok(())
}
