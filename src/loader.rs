//! Class handles and the loaders that produce them.
//!
//! A [`ClassLoader`] turns a canonical class name into a [`ClassHandle`].
//! Each thread carries an optional *context* class loader, consulted by the
//! finder when no loader was configured explicitly.

use memmap2::Mmap;
use serde::Serialize;
use std::cell::RefCell;
use std::fmt;
use std::fs::File;
use std::hash::{Hash, Hasher};
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use zip::ZipArchive;

use crate::classfile::{ClassMetadata, parse_class_file};
use crate::classpath::{ClassPathRoot, SearchPath};
use crate::error::{FinderError, ResolveError};
use crate::names::{PackageName, class_name_to_resource_path, is_valid_class_name};

/// A resolved class. Two handles are equal when their canonical names are.
#[derive(Debug, Clone, Serialize)]
pub struct ClassHandle {
    name: String,
    location: Option<PathBuf>,
}

impl ClassHandle {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: None,
        }
    }

    pub fn defined_at(name: impl Into<String>, location: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            location: Some(location.into()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn package(&self) -> Result<PackageName, FinderError> {
        match self.name.rsplit_once('.') {
            Some((pkg, _)) => PackageName::new(pkg),
            None => Err(FinderError::invalid_input(
                self.name.as_str(),
                "class is in the unnamed package",
            )),
        }
    }

    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }
}

impl PartialEq for ClassHandle {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for ClassHandle {}

impl Hash for ClassHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Display for ClassHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

pub trait ClassLoader: Send + Sync {
    fn load_class(&self, name: &str) -> Result<ClassHandle, ResolveError>;
}

impl<L: ClassLoader + ?Sized> ClassLoader for Arc<L> {
    fn load_class(&self, name: &str) -> Result<ClassHandle, ResolveError> {
        (**self).load_class(name)
    }
}

/// Resolves classes from a search path; the first root holding the class
/// file defines it.
#[derive(Debug, Clone)]
pub struct SearchPathLoader {
    search_path: SearchPath,
}

impl SearchPathLoader {
    pub fn new(search_path: SearchPath) -> Self {
        Self { search_path }
    }

    /// Locates and parses the class file that would define `name`.
    pub fn find_class_metadata(
        &self,
        name: &str,
    ) -> Result<(ClassMetadata, &ClassPathRoot), ResolveError> {
        if !is_valid_class_name(name) {
            return Err(ResolveError::NotFound(name.to_string()));
        }
        let resource_path = class_name_to_resource_path(name);

        for root in self.search_path.roots() {
            let Some((bytes, location)) = read_from_root(root, &resource_path)? else {
                continue;
            };
            let metadata =
                parse_class_file(&bytes).map_err(|source| ResolveError::ClassFormat {
                    location,
                    source,
                })?;
            if metadata.class_name != name {
                return Err(ResolveError::NameMismatch {
                    expected: name.to_string(),
                    found: metadata.class_name,
                });
            }
            return Ok((metadata, root));
        }

        Err(ResolveError::NotFound(name.to_string()))
    }
}

impl ClassLoader for SearchPathLoader {
    fn load_class(&self, name: &str) -> Result<ClassHandle, ResolveError> {
        let (_, root) = self.find_class_metadata(name)?;
        Ok(ClassHandle::defined_at(name, root.path()))
    }
}

fn read_from_root(
    root: &ClassPathRoot,
    resource_path: &str,
) -> Result<Option<(Vec<u8>, String)>, ResolveError> {
    match root {
        ClassPathRoot::Directory(dir) => {
            let path = dir.join(resource_path);
            if !path.is_file() {
                return Ok(None);
            }
            let bytes = std::fs::read(&path).map_err(|source| ResolveError::Io {
                path: path.clone(),
                source,
            })?;
            Ok(Some((bytes, path.display().to_string())))
        }
        ClassPathRoot::Archive(jar) => {
            if !jar.is_file() {
                return Ok(None);
            }
            let file = File::open(jar).map_err(|source| ResolveError::Io {
                path: jar.clone(),
                source,
            })?;
            // SAFETY: read-only mapping of a file that stays open until the
            // mapping is dropped at the end of this block.
            let mmap = unsafe { Mmap::map(&file) }.map_err(|source| ResolveError::Io {
                path: jar.clone(),
                source,
            })?;
            let mut archive =
                ZipArchive::new(Cursor::new(&mmap[..])).map_err(|source| ResolveError::Archive {
                    path: jar.clone(),
                    source,
                })?;
            let mut entry = match archive.by_name(resource_path) {
                Ok(entry) => entry,
                Err(zip::result::ZipError::FileNotFound) => return Ok(None),
                Err(source) => {
                    return Err(ResolveError::Archive {
                        path: jar.clone(),
                        source,
                    });
                }
            };
            let mut bytes = Vec::with_capacity(entry.size() as usize);
            entry
                .read_to_end(&mut bytes)
                .map_err(|source| ResolveError::Io {
                    path: jar.clone(),
                    source,
                })?;
            Ok(Some((
                bytes,
                format!("{}!/{resource_path}", jar.display()),
            )))
        }
    }
}

thread_local! {
    static CONTEXT_LOADER: RefCell<Option<Arc<dyn ClassLoader>>> = const { RefCell::new(None) };
}

pub fn context_class_loader() -> Option<Arc<dyn ClassLoader>> {
    CONTEXT_LOADER.with(|slot| slot.borrow().clone())
}

/// Replaces the calling thread's context class loader, returning the old one.
pub fn set_context_class_loader(
    loader: Option<Arc<dyn ClassLoader>>,
) -> Option<Arc<dyn ClassLoader>> {
    CONTEXT_LOADER.with(|slot| slot.replace(loader))
}

/// Runs `f` with `loader` installed as the context class loader; the
/// previous loader is restored afterwards, also when `f` panics.
pub fn with_context_class_loader<R>(loader: Arc<dyn ClassLoader>, f: impl FnOnce() -> R) -> R {
    struct Restore(Option<Option<Arc<dyn ClassLoader>>>);

    impl Drop for Restore {
        fn drop(&mut self) {
            if let Some(previous) = self.0.take() {
                set_context_class_loader(previous);
            }
        }
    }

    let _restore = Restore(Some(set_context_class_loader(Some(loader))));
    f()
}
