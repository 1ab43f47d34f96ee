//! Owned-scope glob matching.
//!
//! Patterns use a deliberately small glob dialect:
//!
//! | Token | Matches |
//! |-------|---------|
//! | `**`  | any sequence of characters, including `/` |
//! | `*`   | any sequence of characters except `/` |
//!
//! Every other character is literal. Matching is always against the whole
//! path, never a prefix or sub-path.
//!
//! # Example
//!
//! ```rust
//! use intentgate_core::scope::matches;
//!
//! assert!(matches("src/a/b.ts", "src/**/*.ts"));
//! assert!(!matches("docs/readme.md", "*.md"));
//! ```

use regex::Regex;

const DOUBLE_STAR: &str = r"\*\*";
const SINGLE_STAR: &str = r"\*";

/// Convert backslash separators to forward slashes.
pub fn normalize_path(path: &str) -> String {
    path.replace('\\', "/")
}

/// A compiled scope pattern.
#[derive(Debug, Clone)]
pub struct ScopePattern {
    source: String,
    regex: Regex,
}

impl ScopePattern {
    /// Compile a glob pattern into an anchored matcher.
    pub fn compile(pattern: &str) -> Result<Self, regex::Error> {
        let escaped = regex::escape(&normalize_path(pattern));
        // `**` must be rewritten before `*` so it is not consumed as two singles.
        let translated = escaped
            .split(DOUBLE_STAR)
            .map(|segment| segment.replace(SINGLE_STAR, "[^/]*"))
            .collect::<Vec<_>>()
            .join(".*");
        let regex = Regex::new(&format!("^{}$", translated))?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    /// The pattern text this matcher was compiled from.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Test a path against this pattern.
    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(&normalize_path(path))
    }
}

/// An ordered list of compiled patterns; a path matches if any pattern does.
#[derive(Debug, Clone, Default)]
pub struct ScopeSet {
    patterns: Vec<ScopePattern>,
}

impl ScopeSet {
    /// Compile every pattern in `patterns`.
    ///
    /// Patterns that fail to compile are skipped and logged; they can never
    /// grant access.
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .filter_map(|p| match ScopePattern::compile(p.as_ref()) {
                Ok(compiled) => Some(compiled),
                Err(e) => {
                    tracing::warn!(pattern = p.as_ref(), error = %e, "skipping invalid scope pattern");
                    None
                }
            })
            .collect();
        Self { patterns }
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// True if any pattern matches `path`.
    pub fn matches_any(&self, path: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(path))
    }
}

/// One-shot match of `path` against a single `pattern`.
pub fn matches(path: &str, pattern: &str) -> bool {
    ScopePattern::compile(pattern)
        .map(|p| p.is_match(path))
        .unwrap_or(false)
}
