//! Ignore-pattern matching for the scanner.
//!
//! Patterns are glob strings evaluated against the forward-slash form of a
//! path. Three shapes are supported:
//!
//! - `*.tmp`: single-level glob tried against the basename, then the full path.
//! - `.cache/*`: a multi-segment glob whose segments must match a contiguous
//!   run of path segments, at any depth.
//! - `**/node_modules`: a pattern with exactly one `**` is split into a prefix
//!   and a suffix, and matches when the path contains both as substrings. This
//!   is a loose heuristic, not full globstar semantics: the order of prefix
//!   and suffix in the path is not checked.
//!
//! A path is ignored when any pattern matches.

use globset::{GlobBuilder, GlobMatcher};
use std::path::Path;
use tracing::warn;

/// A single compiled ignore pattern.
#[derive(Debug, Clone)]
pub struct IgnorePattern {
    raw: String,
    kind: PatternKind,
}

#[derive(Debug, Clone)]
enum PatternKind {
    /// Exactly one `**`: substring test on the surrounding parts.
    DoubleStar { prefix: String, suffix: String },
    Glob {
        whole: Option<GlobMatcher>,
        /// Per-segment matchers, only present when the pattern contains `/`.
        segments: Option<Vec<GlobMatcher>>,
    },
}

impl IgnorePattern {
    /// Compile a pattern. Malformed globs never match; they are logged once here.
    pub fn new(pattern: &str) -> Self {
        let normalized = to_slash(pattern);

        if normalized.matches("**").count() == 1 {
            let (prefix, suffix) = normalized.split_once("**").unwrap_or((normalized.as_str(), ""));
            return Self {
                raw: pattern.to_string(),
                kind: PatternKind::DoubleStar {
                    prefix: prefix.trim_start_matches('/').to_string(),
                    suffix: suffix.trim_matches('/').to_string(),
                },
            };
        }

        let whole = compile(&normalized);
        if whole.is_none() {
            warn!(pattern = %pattern, "invalid ignore pattern, it will never match");
        }

        let segments = if normalized.contains('/') {
            normalized
                .split('/')
                .map(compile)
                .collect::<Option<Vec<_>>>()
        } else {
            None
        };

        Self {
            raw: pattern.to_string(),
            kind: PatternKind::Glob { whole, segments },
        }
    }

    /// The pattern as written in the configuration.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Check a forward-slash path against this pattern.
    pub fn matches_str(&self, path: &str) -> bool {
        match &self.kind {
            PatternKind::DoubleStar { prefix, suffix } => {
                (prefix.is_empty() || path.contains(prefix.as_str()))
                    && (suffix.is_empty() || path.contains(suffix.as_str()))
            }
            PatternKind::Glob { whole, segments } => {
                if let Some(glob) = whole {
                    let basename = path.rsplit('/').next().unwrap_or(path);
                    if glob.is_match(basename) || glob.is_match(path) {
                        return true;
                    }
                }

                match segments {
                    Some(segments) => matches_segment_window(path, segments),
                    None => false,
                }
            }
        }
    }

    /// Check a filesystem path against this pattern.
    pub fn matches(&self, path: &Path) -> bool {
        self.matches_str(&to_slash(&path.to_string_lossy()))
    }
}

/// An ordered set of ignore patterns; the first match wins.
#[derive(Debug, Clone, Default)]
pub struct PatternMatcher {
    patterns: Vec<IgnorePattern>,
}

impl PatternMatcher {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Self {
        Self {
            patterns: patterns.iter().map(|p| IgnorePattern::new(p.as_ref())).collect(),
        }
    }

    /// Returns the first pattern matching `path`, if any.
    pub fn find_match(&self, path: &Path) -> Option<&IgnorePattern> {
        let normalized = to_slash(&path.to_string_lossy());
        self.patterns.iter().find(|p| p.matches_str(&normalized))
    }

    pub fn is_ignored(&self, path: &Path) -> bool {
        self.find_match(path).is_some()
    }
}

/// Single-level glob: `*` and `?` never cross a `/`.
fn compile(pattern: &str) -> Option<GlobMatcher> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .ok()
        .map(|g| g.compile_matcher())
}

fn matches_segment_window(path: &str, segments: &[GlobMatcher]) -> bool {
    let parts: Vec<&str> = path.split('/').collect();
    if segments.len() > parts.len() {
        return false;
    }

    parts.windows(segments.len()).any(|window| {
        window
            .iter()
            .zip(segments)
            .all(|(part, glob)| glob.is_match(part))
    })
}

fn to_slash(path: &str) -> String {
    if cfg!(windows) {
        path.replace('\\', "/")
    } else {
        path.to_string()
    }
}
