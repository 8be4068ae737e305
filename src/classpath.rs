use ignore::WalkBuilder;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::mpsc;

use crate::error::ScanError;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ClassPathRoot {
    Directory(PathBuf),
    Archive(PathBuf),
}

impl ClassPathRoot {
    /// Classifies `path` by extension: `.jar` and `.zip` are archives,
    /// anything else is a directory of class files.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if is_archive(&path) {
            Self::Archive(path)
        } else {
            Self::Directory(path)
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::Directory(p) | Self::Archive(p) => p,
        }
    }
}

/// Ordered set of roots classes are loaded from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPath {
    roots: Vec<ClassPathRoot>,
}

impl SearchPath {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_roots(roots: impl IntoIterator<Item = ClassPathRoot>) -> Self {
        let mut sp = Self::new();
        for root in roots {
            sp.push(root);
        }
        sp
    }

    /// Parses a platform path list (the `CLASSPATH` syntax). An entry of the
    /// form `dir/*` expands to every jar directly inside `dir`.
    pub fn parse(list: impl AsRef<OsStr>) -> Result<Self, ScanError> {
        let mut sp = Self::new();
        for entry in std::env::split_paths(list.as_ref()) {
            if entry.as_os_str().is_empty() {
                continue;
            }
            if entry.file_name().is_some_and(|n| n == "*") {
                let dir = entry.parent().unwrap_or_else(|| Path::new("."));
                if !dir.is_dir() {
                    tracing::warn!(dir = %dir.display(), "class path wildcard directory does not exist, skipping");
                    continue;
                }
                sp.add_jars_in(dir)?;
            } else {
                sp.push(ClassPathRoot::from_path(entry));
            }
        }
        Ok(sp)
    }

    pub fn push(&mut self, root: ClassPathRoot) {
        if !self.roots.contains(&root) {
            self.roots.push(root);
        }
    }

    pub fn add_jars_in(&mut self, dir: &Path) -> Result<usize, ScanError> {
        let mut jars = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(|e| ScanError::io(dir, e))? {
            let path = entry.map_err(|e| ScanError::io(dir, e))?.path();
            if path.is_file() && is_archive(&path) {
                jars.push(path);
            }
        }
        jars.sort();
        let added = jars.len();
        for jar in jars {
            self.push(ClassPathRoot::Archive(jar));
        }
        Ok(added)
    }

    /// Adds every jar found anywhere below `base` (a local Maven repository,
    /// an exploded distribution's `lib/` tree).
    pub fn add_jars_under(&mut self, base: &Path) -> usize {
        let jars = scan_jars(base);
        let added = jars.len();
        for jar in jars {
            self.push(ClassPathRoot::Archive(jar));
        }
        added
    }

    pub fn roots(&self) -> &[ClassPathRoot] {
        &self.roots
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

pub fn scan_jars(base_path: &Path) -> Vec<PathBuf> {
    let (tx, rx) = mpsc::channel();

    let walker = WalkBuilder::new(base_path)
        .hidden(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .ignore(false)
        .parents(false)
        .build_parallel();

    walker.run(|| {
        let tx = tx.clone();
        Box::new(move |entry| {
            match entry {
                Ok(entry) => {
                    let path = entry.path();
                    if path.extension().is_some_and(|e| e.eq_ignore_ascii_case("jar")) {
                        let _ = tx.send(path.to_path_buf());
                    }
                }
                Err(err) => tracing::debug!(%err, "skipping unreadable entry while looking for jars"),
            }
            ignore::WalkState::Continue
        })
    });

    drop(tx);
    let mut jars: Vec<PathBuf> = rx.iter().collect();
    jars.sort();
    jars
}

fn is_archive(path: &Path) -> bool {
    path.extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("jar") || e.eq_ignore_ascii_case("zip"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_dir(prefix: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("{prefix}-{}-{nanos}", std::process::id()))
    }

    #[test]
    fn roots_are_classified_by_extension() {
        assert_eq!(
            ClassPathRoot::from_path("lib/app.jar"),
            ClassPathRoot::Archive(PathBuf::from("lib/app.jar"))
        );
        assert_eq!(
            ClassPathRoot::from_path("lib/APP.ZIP"),
            ClassPathRoot::Archive(PathBuf::from("lib/APP.ZIP"))
        );
        assert_eq!(
            ClassPathRoot::from_path("target/classes"),
            ClassPathRoot::Directory(PathBuf::from("target/classes"))
        );
    }

    #[test]
    fn parse_splits_list_and_dedupes() {
        let list = std::env::join_paths(["classes", "a.jar", "", "classes"]).unwrap();
        let sp = SearchPath::parse(&list).unwrap();
        assert_eq!(
            sp.roots(),
            &[
                ClassPathRoot::Directory(PathBuf::from("classes")),
                ClassPathRoot::Archive(PathBuf::from("a.jar")),
            ]
        );
    }

    #[test]
    fn wildcard_entry_expands_to_jars() {
        let base = temp_dir("annotation-finder-cp");
        let lib = base.join("lib");
        fs::create_dir_all(lib.join("nested")).unwrap();
        fs::write(lib.join("b.jar"), b"x").unwrap();
        fs::write(lib.join("a.jar"), b"x").unwrap();
        fs::write(lib.join("notes.txt"), b"x").unwrap();
        fs::write(lib.join("nested").join("c.jar"), b"x").unwrap();

        let sp = SearchPath::parse(lib.join("*")).unwrap();
        assert_eq!(
            sp.roots(),
            &[
                ClassPathRoot::Archive(lib.join("a.jar")),
                ClassPathRoot::Archive(lib.join("b.jar")),
            ]
        );

        let mut deep = SearchPath::new();
        assert_eq!(deep.add_jars_under(&lib), 3);
        assert_eq!(deep.roots()[2], ClassPathRoot::Archive(lib.join("nested").join("c.jar")));

        let _ = fs::remove_dir_all(base);
    }

    #[test]
    fn wildcard_over_missing_directory_is_skipped() {
        let missing = temp_dir("annotation-finder-cp-missing").join("*");
        let list = std::env::join_paths([missing.as_path(), Path::new("classes")]).unwrap();
        let sp = SearchPath::parse(&list).unwrap();
        assert_eq!(sp.roots(), &[ClassPathRoot::Directory(PathBuf::from("classes"))]);
    }
}
