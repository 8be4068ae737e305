//! # annotation-finder
//!
//! Discovers the classes of a Java package that carry a given annotation by
//! reading class-file headers straight from directories and jars on a class
//! search path. No JVM is started and no class code runs.

pub mod classfile;
pub mod classpath;
pub mod cli;
pub mod config;
pub mod error;
pub mod finder;
pub mod loader;
pub mod logging;
pub mod names;
pub mod pattern;
pub mod registry;
pub mod resource;

#[cfg(test)]
mod testing;

pub use classfile::{ClassFileReader, ClassMetadata, MetadataReader};
pub use classpath::{ClassPathRoot, SearchPath};
pub use error::{ClassFormatError, FinderError, ResolveError, ScanError, ScanPhase};
pub use finder::{AnnotationFinder, ClassSet};
pub use loader::{
    ClassHandle, ClassLoader, SearchPathLoader, context_class_loader, set_context_class_loader,
    with_context_class_loader,
};
pub use names::{AnnotationTag, IntoPackageName, PackageName};
pub use pattern::{ScanPattern, build_scan_pattern};
pub use registry::Registry;
pub use resource::{PathMatchingEnumerator, Resource, ResourceEnumerator};
