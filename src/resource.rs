//! Resource enumeration across the class search path.
//!
//! [`PathMatchingEnumerator`] resolves a [`ScanPattern`] against every root
//! of a [`SearchPath`]: directory roots are walked, jar roots are read
//! through a memory map.

use memmap2::Mmap;
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc;
use zip::ZipArchive;

use crate::classpath::{ClassPathRoot, SearchPath};
use crate::error::ScanError;
use crate::pattern::{CompiledPattern, ScanPattern};

#[derive(Debug, Clone)]
enum Source {
    File(PathBuf),
    ArchiveEntry { archive: PathBuf, bytes: Arc<[u8]> },
    Memory(Arc<[u8]>),
}

/// A class-file resource found on the search path.
#[derive(Debug, Clone)]
pub struct Resource {
    entry_name: String,
    source: Source,
    readable: bool,
}

impl Resource {
    /// A file on disk. It is readable when it is a regular file that can be
    /// opened.
    pub fn from_file(entry_name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let readable = path.is_file() && File::open(&path).is_ok();
        Self {
            entry_name: entry_name.into(),
            source: Source::File(path),
            readable,
        }
    }

    pub fn from_archive_entry(
        archive: impl Into<PathBuf>,
        entry_name: impl Into<String>,
        bytes: Vec<u8>,
        readable: bool,
    ) -> Self {
        Self {
            entry_name: entry_name.into(),
            source: Source::ArchiveEntry {
                archive: archive.into(),
                bytes: bytes.into(),
            },
            readable,
        }
    }

    pub fn from_bytes(entry_name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            entry_name: entry_name.into(),
            source: Source::Memory(bytes.into()),
            readable: true,
        }
    }

    pub fn with_readable(mut self, readable: bool) -> Self {
        self.readable = readable;
        self
    }

    pub fn entry_name(&self) -> &str {
        &self.entry_name
    }

    /// Human-readable location: a file path, or `archive!/entry`.
    pub fn location(&self) -> String {
        match &self.source {
            Source::File(path) => path.display().to_string(),
            Source::ArchiveEntry { archive, .. } => {
                format!("{}!/{}", archive.display(), self.entry_name)
            }
            Source::Memory(_) => format!("memory:{}", self.entry_name),
        }
    }

    /// `false` means the enumerator found the entry but it has no content
    /// to offer (a directory, an empty entry, a file without read access).
    pub fn is_readable(&self) -> bool {
        self.readable
    }

    pub fn read_bytes(&self) -> Result<Vec<u8>, ScanError> {
        match &self.source {
            Source::File(path) => std::fs::read(path).map_err(|e| ScanError::io(path, e)),
            Source::ArchiveEntry { bytes, .. } | Source::Memory(bytes) => Ok(bytes.to_vec()),
        }
    }
}

/// Yields every resource that matches a scan pattern.
pub trait ResourceEnumerator: Send + Sync {
    fn resolve(&self, pattern: &ScanPattern) -> Result<Vec<Resource>, ScanError>;
}

#[derive(Debug, Clone)]
pub struct PathMatchingEnumerator {
    search_path: SearchPath,
}

impl PathMatchingEnumerator {
    pub fn new(search_path: SearchPath) -> Self {
        Self { search_path }
    }
}

impl ResourceEnumerator for PathMatchingEnumerator {
    fn resolve(&self, pattern: &ScanPattern) -> Result<Vec<Resource>, ScanError> {
        let compiled = pattern.compile()?;
        let mut resources = Vec::new();

        for root in self.search_path.roots() {
            let found = match root {
                ClassPathRoot::Directory(dir) => find_in_directory(dir, &compiled),
                ClassPathRoot::Archive(jar) => find_in_archive(jar, &compiled)?,
            };
            let Some(found) = found else {
                tracing::warn!(root = %root.path().display(), "class path root does not exist, skipping");
                continue;
            };
            tracing::debug!(
                root = %root.path().display(),
                matches = found.len(),
                "resolved {pattern}"
            );

            let stop = !compiled.all_roots() && !found.is_empty();
            resources.extend(found);
            if stop {
                break;
            }
        }

        Ok(resources)
    }
}

/// `None` when the root directory itself is missing.
fn find_in_directory(root: &Path, pattern: &CompiledPattern) -> Option<Vec<Resource>> {
    if !root.is_dir() {
        return None;
    }
    let base = root.join(pattern.base_dir());
    if !base.is_dir() {
        return Some(Vec::new());
    }

    let (tx, rx) = mpsc::channel();
    let walker = ignore::WalkBuilder::new(&base)
        .hidden(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .ignore(false)
        .parents(false)
        .follow_links(true)
        .max_depth(pattern.max_depth())
        .build_parallel();

    walker.run(|| {
        let tx = tx.clone();
        Box::new(move |entry| {
            match entry {
                Ok(entry) => {
                    if entry.path().is_file() {
                        let _ = tx.send(entry.into_path());
                    }
                }
                Err(err) => tracing::warn!(%err, "skipping unreadable directory entry"),
            }
            ignore::WalkState::Continue
        })
    });
    drop(tx);

    let mut found: Vec<Resource> = rx
        .iter()
        .filter_map(|path| {
            let entry_name = relative_entry_name(root, &path)?;
            pattern
                .is_match(&entry_name)
                .then(|| Resource::from_file(entry_name, path))
        })
        .collect();
    found.sort_by(|a, b| a.entry_name().cmp(b.entry_name()));
    Some(found)
}

/// `None` when the archive does not exist.
fn find_in_archive(
    jar_path: &Path,
    pattern: &CompiledPattern,
) -> Result<Option<Vec<Resource>>, ScanError> {
    let file = match File::open(jar_path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(ScanError::io(jar_path, e)),
    };
    // SAFETY: The file is opened read-only and outlives the mapping, which is
    // dropped at the end of this function.
    let mmap = unsafe { Mmap::map(&file) }.map_err(|e| ScanError::io(jar_path, e))?;
    let mut archive = ZipArchive::new(Cursor::new(&mmap[..]))
        .map_err(|e| ScanError::archive(jar_path, e))?;

    let mut found = Vec::new();
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| ScanError::archive(jar_path, e))?;
        let name = entry.name().to_string();
        if !name.starts_with(pattern.base_dir()) || !pattern.is_match(&name) {
            continue;
        }

        let readable = !entry.is_dir() && entry.size() > 0;
        let mut bytes = Vec::new();
        if readable {
            bytes.reserve(entry.size() as usize);
            entry
                .read_to_end(&mut bytes)
                .map_err(|e| ScanError::io(jar_path, e))?;
        }
        found.push(Resource::from_archive_entry(jar_path, name, bytes, readable));
    }

    found.sort_by(|a, b| a.entry_name().cmp(b.entry_name()));
    Ok(Some(found))
}

fn relative_entry_name(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<&str> = rel
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<_>>()?;
    Some(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::build_scan_pattern;
    use std::io::Write;
    use std::time::{SystemTime, UNIX_EPOCH};
    use zip::write::FileOptions;

    fn temp_path(name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!(
            "annotation_finder_test_{}_{}_{}",
            std::process::id(),
            nanos,
            name
        ))
    }

    fn write_jar(path: &Path, entries: &[(&str, &[u8])]) {
        let file = File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        for (name, content) in entries {
            zip.start_file(*name, options).unwrap();
            zip.write_all(content).unwrap();
        }
        zip.finish().unwrap();
    }

    fn names(resources: &[Resource]) -> Vec<&str> {
        resources.iter().map(|r| r.entry_name()).collect()
    }

    #[test]
    fn directory_root_respects_depth() {
        let root = temp_path("dir_root");
        let pkg = root.join("com/example/plugins");
        std::fs::create_dir_all(pkg.join("extra")).unwrap();
        std::fs::write(pkg.join("Alpha.class"), b"a").unwrap();
        std::fs::write(pkg.join("readme.txt"), b"a").unwrap();
        std::fs::write(pkg.join("extra/Delta.class"), b"d").unwrap();

        let enumerator = PathMatchingEnumerator::new(SearchPath::from_roots([
            ClassPathRoot::Directory(root.clone()),
        ]));

        let flat = enumerator
            .resolve(&build_scan_pattern("com.example.plugins", false))
            .unwrap();
        assert_eq!(names(&flat), vec!["com/example/plugins/Alpha.class"]);
        assert!(flat[0].is_readable());
        assert_eq!(flat[0].read_bytes().unwrap(), b"a");

        let deep = enumerator
            .resolve(&build_scan_pattern("com.example.plugins", true))
            .unwrap();
        assert_eq!(
            names(&deep),
            vec![
                "com/example/plugins/Alpha.class",
                "com/example/plugins/extra/Delta.class"
            ]
        );

        let _ = std::fs::remove_dir_all(root);
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_class_files_and_directories_are_followed() {
        use std::os::unix::fs::symlink;

        let base = temp_path("symlinks");
        let real = base.join("real");
        let root = base.join("classes");
        std::fs::create_dir_all(real.join("extra")).unwrap();
        std::fs::create_dir_all(root.join("com/example/plugins")).unwrap();
        std::fs::write(real.join("Alpha.class"), b"a").unwrap();
        std::fs::write(real.join("extra/Delta.class"), b"d").unwrap();
        symlink(real.join("Alpha.class"), root.join("com/example/plugins/Alpha.class")).unwrap();
        symlink(real.join("extra"), root.join("com/example/plugins/extra")).unwrap();

        let enumerator =
            PathMatchingEnumerator::new(SearchPath::from_roots([ClassPathRoot::Directory(root)]));
        let deep = enumerator
            .resolve(&build_scan_pattern("com.example.plugins", true))
            .unwrap();
        assert_eq!(
            names(&deep),
            vec![
                "com/example/plugins/Alpha.class",
                "com/example/plugins/extra/Delta.class"
            ]
        );
        assert!(deep.iter().all(Resource::is_readable));
        assert_eq!(deep[0].read_bytes().unwrap(), b"a");

        let _ = std::fs::remove_dir_all(base);
    }

    #[test]
    fn non_regular_and_missing_files_are_unreadable() {
        let dir = temp_path("not_a_file.class");
        std::fs::create_dir_all(&dir).unwrap();
        assert!(!Resource::from_file("a/Dir.class", &dir).is_readable());
        assert!(!Resource::from_file("a/Gone.class", dir.join("Gone.class")).is_readable());
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn archive_root_marks_empty_entries_unreadable() {
        let jar = temp_path("archive_root.jar");
        write_jar(
            &jar,
            &[
                ("com/example/plugins/Alpha.class", b"alpha"),
                ("com/example/plugins/Empty.class", b""),
                ("com/example/Other.class", b"other"),
                ("META-INF/MANIFEST.MF", b"Manifest-Version: 1.0\n"),
            ],
        );

        let enumerator =
            PathMatchingEnumerator::new(SearchPath::from_roots([ClassPathRoot::Archive(jar.clone())]));
        let found = enumerator
            .resolve(&build_scan_pattern("com.example.plugins", false))
            .unwrap();
        assert_eq!(
            names(&found),
            vec!["com/example/plugins/Alpha.class", "com/example/plugins/Empty.class"]
        );
        assert!(found[0].is_readable());
        assert!(!found[1].is_readable());
        assert!(found[0].location().ends_with("!/com/example/plugins/Alpha.class"));

        let _ = std::fs::remove_file(jar);
    }

    #[test]
    fn missing_roots_are_skipped_and_corrupt_archives_fail() {
        let missing = SearchPath::from_roots([
            ClassPathRoot::Directory(temp_path("nope")),
            ClassPathRoot::Archive(temp_path("nope.jar")),
        ]);
        let found = PathMatchingEnumerator::new(missing)
            .resolve(&build_scan_pattern("a", false))
            .unwrap();
        assert!(found.is_empty());

        let corrupt = temp_path("corrupt.jar");
        std::fs::write(&corrupt, b"not a zip").unwrap();
        let err = PathMatchingEnumerator::new(SearchPath::from_roots([ClassPathRoot::Archive(
            corrupt.clone(),
        )]))
        .resolve(&build_scan_pattern("a", false));
        assert!(matches!(err, Err(ScanError::Archive { .. })));
        let _ = std::fs::remove_file(corrupt);
    }

    #[test]
    fn single_root_prefix_stops_at_first_match() {
        let first = temp_path("first.jar");
        let second = temp_path("second.jar");
        write_jar(&first, &[("a/A.class", b"1")]);
        write_jar(&second, &[("a/A.class", b"2"), ("a/B.class", b"2")]);

        let sp = SearchPath::from_roots([
            ClassPathRoot::Archive(first.clone()),
            ClassPathRoot::Archive(second.clone()),
        ]);
        let enumerator = PathMatchingEnumerator::new(sp);

        let single = enumerator.resolve(&ScanPattern::new("classpath:a/*.class")).unwrap();
        assert_eq!(single.len(), 1);

        let all = enumerator.resolve(&ScanPattern::new("classpath*:a/*.class")).unwrap();
        assert_eq!(names(&all), vec!["a/A.class", "a/A.class", "a/B.class"]);

        let _ = std::fs::remove_file(first);
        let _ = std::fs::remove_file(second);
    }
}
