//! Title to file name mapping

use crate::jobs::JobEnvelope;
use std::path::{Path, PathBuf};

/// Longest stem we produce, well under the 255 byte NAME_MAX of common filesystems
const MAX_STEM_LEN: usize = 200;

const SEPARATOR: char = '_';

/// Reduce `name` to ASCII alphanumerics joined by single underscores
///
/// - Every run of characters outside `[A-Za-z0-9]` becomes one `_`
/// - No leading, trailing or doubled `_`
/// - Capped at 200 bytes
///
/// Total and idempotent; may return an empty string.
pub fn sanitize_file_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len().min(MAX_STEM_LEN));
    let mut pending_separator = false;

    for c in name.chars() {
        if !c.is_ascii_alphanumeric() {
            pending_separator = true;
            continue;
        }
        if pending_separator && !out.is_empty() {
            if out.len() + 2 > MAX_STEM_LEN {
                break;
            }
            out.push(SEPARATOR);
        }
        if out.len() + 1 > MAX_STEM_LEN {
            break;
        }
        pending_separator = false;
        out.push(c);
    }

    out
}

/// File stem for a job: the sanitized title, or `download_<id prefix>` when nothing survives
pub fn file_stem(envelope: &JobEnvelope) -> String {
    let stem = sanitize_file_name(&envelope.job.title);
    if stem.is_empty() {
        format!("download_{}", envelope.id.short())
    } else {
        stem
    }
}

/// `<output_dir>/<stem>.<ext>`
pub fn output_path(output_dir: &Path, envelope: &JobEnvelope) -> PathBuf {
    output_dir.join(format!(
        "{}.{}",
        file_stem(envelope),
        envelope.job.format.extension()
    ))
}
