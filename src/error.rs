//! Error types for annotation discovery.
//!
//! Every failure aborts the whole call; the driver never hands back a
//! partial result set.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Top-level error returned by [`crate::finder::AnnotationFinder`].
#[derive(Debug, thiserror::Error)]
pub enum FinderError {
    #[error("invalid input {input:?}: {reason}")]
    InvalidInput { input: String, reason: String },

    #[error("scan failed while {phase}: {source}")]
    ScanFailed {
        phase: ScanPhase,
        #[source]
        source: ScanError,
    },

    #[error("failed to resolve class {class_name}: {source}")]
    ClassResolveFailed {
        class_name: String,
        #[source]
        source: ResolveError,
    },
}

impl FinderError {
    pub(crate) fn invalid_input(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// Class name carried by a resolution failure.
    pub fn class_name(&self) -> Option<&str> {
        match self {
            Self::ClassResolveFailed { class_name, .. } => Some(class_name),
            _ => None,
        }
    }
}

/// Which part of the discovery pipeline a [`ScanError`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPhase {
    Enumerate,
    ReadMetadata,
}

impl fmt::Display for ScanPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enumerate => f.write_str("enumerating resources"),
            Self::ReadMetadata => f.write_str("reading class metadata"),
        }
    }
}

/// Failure of the resource enumerator or the metadata reader.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("invalid scan pattern {pattern:?}: {reason}")]
    Pattern { pattern: String, reason: String },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unreadable archive {}: {source}", path.display())]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("malformed class file {location}: {source}")]
    ClassFormat {
        location: String,
        #[source]
        source: ClassFormatError,
    },

    #[error("{0}")]
    Other(String),
}

impl ScanError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn archive(path: impl Into<PathBuf>, source: zip::result::ZipError) -> Self {
        Self::Archive {
            path: path.into(),
            source,
        }
    }
}

/// Structural problem found while decoding a class file.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClassFormatError {
    #[error("bad magic number {0:#010x}")]
    BadMagic(u32),

    #[error("unexpected end of data at offset {offset} (wanted {wanted} bytes)")]
    Truncated { offset: usize, wanted: usize },

    #[error("unknown constant pool tag {tag} at index {index}")]
    UnknownConstantTag { tag: u8, index: u16 },

    #[error("constant pool index {index} is not a {expected}")]
    BadConstant { index: u16, expected: &'static str },

    #[error("unknown annotation element tag {0:?}")]
    UnknownElementTag(char),

    #[error("invalid modified UTF-8 at constant pool index {0}")]
    BadUtf8(u16),

    #[error("annotation values nested deeper than {0} levels")]
    NestingTooDeep(usize),
}

/// Failure to turn a canonical class name into a [`crate::loader::ClassHandle`].
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("class not found: {0}")]
    NotFound(String),

    #[error("class file for {expected} declares {found}")]
    NameMismatch { expected: String, found: String },

    #[error("initialization of {name} failed: {message}")]
    Initialization { name: String, message: String },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unreadable archive {}: {source}", path.display())]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("malformed class file {location}: {source}")]
    ClassFormat {
        location: String,
        #[source]
        source: ClassFormatError,
    },
}
