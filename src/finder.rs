//! Annotation discovery driver.
//!
//! Builds the scan pattern for a package, enumerates matching class files
//! across the whole search path, keeps those whose class-level annotations
//! include the requested tag and resolves them to [`ClassHandle`]s.
//!
//! ```no_run
//! use annotation_finder::{AnnotationFinder, AnnotationTag, SearchPath};
//!
//! let finder = AnnotationFinder::new(SearchPath::parse("target/classes:lib/*")?);
//! let plugins = finder.find_annotated_classes(
//!     &AnnotationTag::new("com.example.Plugin"),
//!     "com.example.plugins",
//! )?;
//! for class in &plugins {
//!     println!("{class}");
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use crate::classfile::{ClassFileReader, ClassMetadata, MetadataReader};
use crate::classpath::SearchPath;
use crate::error::{FinderError, ScanPhase};
use crate::loader::{ClassHandle, ClassLoader, SearchPathLoader, context_class_loader};
use crate::names::{AnnotationTag, IntoPackageName, PackageName};
use crate::pattern::build_scan_pattern;
use crate::resource::{PathMatchingEnumerator, ResourceEnumerator};

/// Unordered, duplicate-free set of discovered classes.
pub type ClassSet = HashSet<ClassHandle>;

pub struct AnnotationFinder {
    enumerator: Box<dyn ResourceEnumerator>,
    reader: Box<dyn MetadataReader>,
    loader: Option<Arc<dyn ClassLoader>>,
    default_loader: Arc<dyn ClassLoader>,
}

impl AnnotationFinder {
    /// Finder over `search_path` using the built-in enumerator, class-file
    /// reader and loader.
    pub fn new(search_path: SearchPath) -> Self {
        Self {
            enumerator: Box::new(PathMatchingEnumerator::new(search_path.clone())),
            reader: Box::new(ClassFileReader::new()),
            loader: None,
            default_loader: Arc::new(SearchPathLoader::new(search_path)),
        }
    }

    /// Finder with caller-supplied collaborators. Without a context class
    /// loader or [`Self::with_class_loader`], every match fails to resolve.
    pub fn with_collaborators(
        enumerator: impl ResourceEnumerator + 'static,
        reader: impl MetadataReader + 'static,
    ) -> Self {
        Self {
            enumerator: Box::new(enumerator),
            reader: Box::new(reader),
            loader: None,
            default_loader: Arc::new(SearchPathLoader::new(SearchPath::new())),
        }
    }

    pub fn with_reader(mut self, reader: impl MetadataReader + 'static) -> Self {
        self.reader = Box::new(reader);
        self
    }

    pub fn with_class_loader(mut self, loader: Arc<dyn ClassLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Classes directly in `package` annotated with `tag`.
    pub fn find_annotated_classes(
        &self,
        tag: &AnnotationTag,
        package: impl IntoPackageName,
    ) -> Result<ClassSet, FinderError> {
        self.find_annotated_classes_in(tag, package, false)
    }

    /// Classes in `package`, and in its sub-packages when
    /// `include_subpackages` is set, annotated with `tag`.
    ///
    /// Resolving a match may have side effects in the loader (a registry's
    /// initializer, for instance). Use [`Self::find_annotated_metadata`] to
    /// avoid them.
    pub fn find_annotated_classes_in(
        &self,
        tag: &AnnotationTag,
        package: impl IntoPackageName,
        include_subpackages: bool,
    ) -> Result<ClassSet, FinderError> {
        let package = package.into_package_name()?;
        let matches = self.scan(tag, &package, include_subpackages)?;
        let loader = self.effective_loader();

        let mut classes = ClassSet::with_capacity(matches.len());
        for metadata in matches {
            let class_name = metadata.class_name;
            let handle = loader
                .load_class(&class_name)
                .map_err(|source| FinderError::ClassResolveFailed {
                    class_name: class_name.clone(),
                    source,
                })?;
            if !classes.insert(handle) {
                tracing::debug!(class = %class_name, "class found on more than one root");
            }
        }

        tracing::info!(
            annotation = %tag,
            package = %package,
            include_subpackages,
            found = classes.len(),
            "annotation scan finished"
        );
        Ok(classes)
    }

    /// Metadata of every class file in `package` (and sub-packages when
    /// `include_subpackages` is set) annotated with `tag`, in enumeration
    /// order. Nothing is resolved, so a class present on two roots appears
    /// twice.
    pub fn find_annotated_metadata(
        &self,
        tag: &AnnotationTag,
        package: impl IntoPackageName,
        include_subpackages: bool,
    ) -> Result<Vec<ClassMetadata>, FinderError> {
        let package = package.into_package_name()?;
        self.scan(tag, &package, include_subpackages)
    }

    fn scan(
        &self,
        tag: &AnnotationTag,
        package: &PackageName,
        include_subpackages: bool,
    ) -> Result<Vec<ClassMetadata>, FinderError> {
        let pattern = build_scan_pattern(package.as_str(), include_subpackages);
        let resources = self
            .enumerator
            .resolve(&pattern)
            .map_err(|source| FinderError::ScanFailed {
                phase: ScanPhase::Enumerate,
                source,
            })?;
        tracing::debug!(%pattern, resources = resources.len(), "enumerated class files");

        let mut matches = Vec::new();
        for resource in &resources {
            if !resource.is_readable() {
                tracing::debug!(resource = %resource.location(), "skipping unreadable resource");
                continue;
            }
            let metadata = self
                .reader
                .read(resource)
                .map_err(|source| FinderError::ScanFailed {
                    phase: ScanPhase::ReadMetadata,
                    source,
                })?;
            if !metadata.has_annotation(tag.canonical_name()) {
                continue;
            }
            if !package.contains_class(&metadata.class_name, include_subpackages) {
                tracing::debug!(
                    class = %metadata.class_name,
                    resource = %resource.location(),
                    "skipping class file that declares a class outside {package}"
                );
                continue;
            }
            tracing::debug!(class = %metadata.class_name, resource = %resource.location(), "matched");
            matches.push(metadata);
        }
        Ok(matches)
    }

    fn effective_loader(&self) -> Arc<dyn ClassLoader> {
        if let Some(loader) = self.loader.as_ref() {
            return Arc::clone(loader);
        }
        context_class_loader().unwrap_or_else(|| Arc::clone(&self.default_loader))
    }
}
