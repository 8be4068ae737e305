//! Scan patterns: resource globs rooted at a package directory.
//!
//! A pattern looks like `classpath*:com/example/plugins/**/*.class`. The
//! prefix selects how search-path roots are combined, the remainder is a
//! glob over `/`-separated resource paths relative to each root.

use globset::{GlobBuilder, GlobMatcher};
use std::fmt;
use std::path::MAIN_SEPARATOR;

use crate::error::ScanError;

/// Union matches across every root of the search path.
pub const CLASSPATH_ALL_URL_PREFIX: &str = "classpath*:";
/// Only the first root that yields a match contributes.
pub const CLASSPATH_URL_PREFIX: &str = "classpath:";

const CLASS_FILE_SUFFIX: &str = ".class";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScanPattern(String);

impl ScanPattern {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self(pattern.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Splits off the root prefix and compiles the location glob.
    pub fn compile(&self) -> Result<CompiledPattern, ScanError> {
        let (all_roots, location) = if let Some(rest) = self.0.strip_prefix(CLASSPATH_ALL_URL_PREFIX)
        {
            (true, rest)
        } else if let Some(rest) = self.0.strip_prefix(CLASSPATH_URL_PREFIX) {
            (false, rest)
        } else {
            (true, self.0.as_str())
        };

        let location = location.replace('\\', "/");
        let location = location.trim_start_matches('/').to_string();

        let Some(wildcard_at) = location.find(['*', '?', '[', '{']) else {
            return Err(ScanError::Pattern {
                pattern: self.0.clone(),
                reason: "location has no wildcard".to_string(),
            });
        };
        let base_dir = match location[..wildcard_at].rfind('/') {
            Some(slash) => location[..=slash].to_string(),
            None => String::new(),
        };

        let remainder = &location[base_dir.len()..];
        let max_depth = if remainder.contains("**") {
            None
        } else {
            Some(remainder.matches('/').count() + 1)
        };

        let matcher = GlobBuilder::new(&location)
            .literal_separator(true)
            .build()
            .map_err(|e| ScanError::Pattern {
                pattern: self.0.clone(),
                reason: e.to_string(),
            })?
            .compile_matcher();

        Ok(CompiledPattern {
            all_roots,
            base_dir,
            max_depth,
            matcher,
        })
    }
}

impl fmt::Display for ScanPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A parsed [`ScanPattern`] ready to be matched against resource paths.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    all_roots: bool,
    base_dir: String,
    max_depth: Option<usize>,
    matcher: GlobMatcher,
}

impl CompiledPattern {
    pub fn all_roots(&self) -> bool {
        self.all_roots
    }

    /// Non-wildcard directory prefix, `/`-separated, with trailing `/`
    /// (empty when the glob starts at the root).
    pub fn base_dir(&self) -> &str {
        &self.base_dir
    }

    /// How many levels below [`Self::base_dir`] a match may sit, or `None`
    /// for unbounded (`**`) patterns.
    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    pub fn is_match(&self, resource_path: &str) -> bool {
        self.matcher.is_match(resource_path)
    }
}

/// Builds the scan pattern for `package_name`.
///
/// The name is not validated here; callers pass a dot-form package name.
pub fn build_scan_pattern(package_name: &str, include_subpackages: bool) -> ScanPattern {
    let mut pattern = String::from(CLASSPATH_ALL_URL_PREFIX);
    pattern.push_str(&package_name.replace('.', &MAIN_SEPARATOR.to_string()));
    pattern.push('/');
    if include_subpackages {
        pattern.push_str("**/");
    }
    pattern.push('*');
    pattern.push_str(CLASS_FILE_SUFFIX);
    ScanPattern(pattern)
}
