//! Source discovery and output naming for `oppsql merge`.

use std::path::{Path, PathBuf};

use anyhow::Context;
use oppsql_merge::SourceFile;
use tracing::debug;
use walkdir::WalkDir;

/// Characters trimmed from the end of a common prefix, so that
/// `General-#0` and `General-#1` name their merge `General`.
const PREFIX_SEPARATORS: &[char] = &['-', '_', '#', '.'];

/// Output stem used when the sources share no prefix.
const FALLBACK_STEM: &str = "merged";

/// Result files directly inside `dir` (not recursive), sorted by file name.
pub fn discover_sources(dir: &Path, extensions: &[String]) -> anyhow::Result<Vec<SourceFile>> {
    let mut sources = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.with_context(|| format!("listing {}", dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let matches = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| extensions.iter().any(|x| x == e));
        if matches {
            sources.push(SourceFile::from_path(entry.into_path())?);
        }
    }
    debug!(dir = %dir.display(), count = sources.len(), "discovered sources");
    Ok(sources)
}

/// Longest common prefix of `names`, compared per character.
pub fn common_prefix<'a>(names: impl IntoIterator<Item = &'a str>) -> String {
    let mut names = names.into_iter();
    let Some(first) = names.next() else {
        return String::new();
    };
    let mut len = first.len();
    for name in names {
        len = first
            .char_indices()
            .zip(name.chars())
            .take_while(|((_, a), b)| a == b)
            .last()
            .map_or(0, |((i, c), _)| i + c.len_utf8())
            .min(len);
    }
    first[..len].to_string()
}

/// Default merge target: `<dir>/<common prefix of source names>.<extension>`.
pub fn default_output(dir: &Path, sources: &[SourceFile], extension: &str) -> PathBuf {
    let prefix = common_prefix(sources.iter().map(|s| s.name.as_str()));
    let stem = prefix.trim_end_matches(|c: char| c.is_whitespace() || PREFIX_SEPARATORS.contains(&c));
    let stem = if stem.is_empty() { FALLBACK_STEM } else { stem };
    dir.join(format!("{stem}.{extension}"))
}
