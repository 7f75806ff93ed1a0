//! Atomic replacement of the output file.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

/// Write `body` to a temp file next to `path`, then rename it over `path`,
/// so readers never observe a half-written feed.
pub fn write_output(path: &Path, body: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("creating temp file in {}", dir.display()))?;
    tmp.write_all(body)
        .with_context(|| format!("writing {}", path.display()))?;
    tmp.persist(path)
        .with_context(|| format!("replacing {}", path.display()))?;
    Ok(())
}
