//! Breakpoint specification parsing and matching.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use rustc_hash::{FxHashMap, FxHashSet};

/// Parsed breakpoint locations, replaced wholesale between debug segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BreakpointSpec {
    /// Break on every executable line of project-owned files.
    Wildcard,
    /// Per-file target lines.
    Lines(FxHashMap<PathBuf, FxHashSet<u32>>),
}

impl BreakpointSpec {
    /// An empty spec: nothing matches.
    #[must_use]
    pub fn empty() -> Self {
        Self::Lines(FxHashMap::default())
    }

    /// Parse raw breakpoint tokens.
    ///
    /// `"*"` switches the whole spec into wildcard (step) mode. Bare line
    /// numbers resolve against `entrypoint` and are dropped when none is
    /// configured. `file:line` tokens resolve the file part against the
    /// current working directory. Every other token belongs to a non-line
    /// breakpoint dialect handled elsewhere and is dropped silently.
    #[must_use]
    pub fn parse(tokens: &[String], entrypoint: Option<&Path>) -> Self {
        let entry = entrypoint.map(absolutize);
        let mut lines: FxHashMap<PathBuf, FxHashSet<u32>> = FxHashMap::default();
        for token in tokens {
            let token = token.trim();
            if token == "*" {
                return Self::Wildcard;
            }
            if is_line_number(token) {
                if let (Some(entry), Ok(line)) = (entry.as_ref(), token.parse::<u32>()) {
                    lines.entry(entry.clone()).or_default().insert(line);
                }
                continue;
            }
            if let Some((file, line)) = token.rsplit_once(':') {
                if !file.is_empty() && is_line_number(line) {
                    if let Ok(line) = line.parse::<u32>() {
                        lines
                            .entry(absolutize(Path::new(file)))
                            .or_default()
                            .insert(line);
                    }
                }
            }
        }
        Self::Lines(lines)
    }

    /// Whether this spec is in wildcard (step) mode.
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        matches!(self, Self::Wildcard)
    }

    /// Whether no location can ever match.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Wildcard => false,
            Self::Lines(lines) => lines.values().all(FxHashSet::is_empty),
        }
    }

    /// Whether `file` has at least one configured breakpoint line.
    /// Wildcard matches every file; the caller applies the project filter.
    #[must_use]
    pub fn has_file(&self, file: &Path) -> bool {
        match self {
            Self::Wildcard => true,
            Self::Lines(lines) => lines.get(file).is_some_and(|set| !set.is_empty()),
        }
    }

    /// Whether `file:line` is a configured breakpoint location.
    #[must_use]
    pub fn contains(&self, file: &Path, line: u32) -> bool {
        match self {
            Self::Wildcard => true,
            Self::Lines(lines) => lines.get(file).is_some_and(|set| set.contains(&line)),
        }
    }

    /// Total number of configured lines (primarily for tests).
    #[doc(hidden)]
    #[must_use]
    pub fn line_count(&self) -> usize {
        match self {
            Self::Wildcard => 0,
            Self::Lines(lines) => lines.values().map(FxHashSet::len).sum(),
        }
    }
}

impl Default for BreakpointSpec {
    fn default() -> Self {
        Self::empty()
    }
}

fn is_line_number(token: &str) -> bool {
    !token.is_empty() && token.bytes().all(|byte| byte.is_ascii_digit())
}

fn absolutize(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(raw: &[&str]) -> Vec<String> {
        raw.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn star_token_switches_to_wildcard() {
        let spec = BreakpointSpec::parse(&tokens(&["3", "*", "other.flow:9"]), None);
        assert!(spec.is_wildcard());
        assert!(!spec.is_empty());
    }

    #[test]
    fn bare_lines_resolve_against_the_entrypoint() {
        let entry = Path::new("/proj/main.flow");
        let spec = BreakpointSpec::parse(&tokens(&["3", "5"]), Some(entry));
        assert!(spec.contains(entry, 3));
        assert!(spec.contains(entry, 5));
        assert!(!spec.contains(entry, 4));
        assert_eq!(spec.line_count(), 2);
    }

    #[test]
    fn bare_lines_without_an_entrypoint_are_dropped() {
        let spec = BreakpointSpec::parse(&tokens(&["3", "5"]), None);
        assert!(spec.is_empty());
    }

    #[test]
    fn file_line_tokens_keep_their_own_file() {
        let spec = BreakpointSpec::parse(&tokens(&["/proj/lib/util.flow:12"]), None);
        assert!(spec.contains(Path::new("/proj/lib/util.flow"), 12));
    }

    #[test]
    fn file_part_may_itself_contain_colons() {
        let spec = BreakpointSpec::parse(&tokens(&["/proj/a:b.flow:4"]), None);
        assert!(spec.contains(Path::new("/proj/a:b.flow"), 4));
    }

    #[test]
    fn non_line_tokens_are_dropped_silently() {
        let entry = Path::new("/proj/main.flow");
        let spec = BreakpointSpec::parse(
            &tokens(&["checkpoint-a", "node:alpha", "-3", "+4", "", "7"]),
            Some(entry),
        );
        assert_eq!(spec.line_count(), 1);
        assert!(spec.contains(entry, 7));
    }

    #[test]
    fn parse_replaces_rather_than_merges() {
        let entry = Path::new("/proj/main.flow");
        let first = BreakpointSpec::parse(&tokens(&["3"]), Some(entry));
        let second = BreakpointSpec::parse(&tokens(&["5"]), Some(entry));
        assert!(first.contains(entry, 3));
        assert!(!second.contains(entry, 3));
        assert!(second.contains(entry, 5));
    }
}
