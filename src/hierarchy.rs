//! Pipe-delimited tokens describing where a dataset lives below the crawl root.

use std::path::Path;

/// Derives the hierarchy token of a container relative to the crawl root.
///
/// Purely textual: `C:\example\input\USA\roads` below `C:\example\input`
/// becomes `USA|roads`. Both `\` and `/` separators map to `|`.
pub fn hierarchy_token(root: &Path, container: &Path) -> String {
    let root = root.to_string_lossy();
    let container = container.to_string_lossy();

    let root = root.trim_end_matches(['/', '\\']);
    let suffix = if root.is_empty() {
        container.as_ref()
    } else {
        container.strip_prefix(root).unwrap_or(container.as_ref())
    };

    let token = suffix.replace("\\\\", "\\").replace(['\\', '/'], "|");
    match token.strip_prefix('|') {
        Some(rest) => rest.to_string(),
        None => token,
    }
}
