//! Loading of stylesheets and modules.
//!
//! The compiler reaches other files only through [`ModuleHost`]. The
//! [`FileProcessor`] implementation reads files through a [`FileSystem`],
//! processes stylesheets into cached [`StylableMeta`]s and serves modules
//! that were registered up front or live in `.json` files.

use crate::cache::StylesheetCache;
use crate::js::JsValue;
use crate::meta::StylableMeta;
use crate::processor::{process_source, ProcessOptions};
use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::io;
use std::rc::Rc;
use thiserror::Error;
use tracing::{debug, trace};

/// Errors raised while loading an import target.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("file not found: {0}")]
    NotFound(Utf8PathBuf),

    #[error("failed to read {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: Utf8PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot load module {0}")]
    UnknownModule(Utf8PathBuf),
}

/// Read access to source files.
pub trait FileSystem {
    /// Reads a whole file.
    fn read_to_string(&self, path: &Utf8Path) -> io::Result<String>;
}

/// The real file system.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    fn read_to_string(&self, path: &Utf8Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }
}

/// An in-memory file system for tests and tooling.
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    files: RefCell<FxHashMap<Utf8PathBuf, String>>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a file system holding the given files.
    pub fn with_files<P, C>(files: impl IntoIterator<Item = (P, C)>) -> Self
    where
        P: Into<Utf8PathBuf>,
        C: Into<String>,
    {
        let fs = Self::new();
        for (path, content) in files {
            fs.write(path, content);
        }
        fs
    }

    /// Creates or replaces a file.
    pub fn write(&self, path: impl Into<Utf8PathBuf>, content: impl Into<String>) {
        let path: Utf8PathBuf = path.into();
        self.files
            .borrow_mut()
            .insert(normalize_path(&path), content.into());
    }
}

impl FileSystem for MemoryFileSystem {
    fn read_to_string(&self, path: &Utf8Path) -> io::Result<String> {
        self.files
            .borrow()
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.to_string()))
    }
}

impl<F: FileSystem + ?Sized> FileSystem for &F {
    fn read_to_string(&self, path: &Utf8Path) -> io::Result<String> {
        (**self).read_to_string(path)
    }
}

/// Loads import targets for the resolver.
pub trait ModuleHost {
    /// Returns the processed symbol table of a stylesheet.
    fn process(&self, path: &Utf8Path) -> Result<Rc<StylableMeta>, HostError>;

    /// Returns the exports of a non-stylesheet module.
    fn require(&self, path: &Utf8Path) -> Result<JsValue, HostError>;
}

/// Resolves an import request against the importing file's directory.
///
/// Relative requests are joined and normalised; anything else is a module
/// name and is kept as written.
pub fn resolve_request(context: &Utf8Path, request: &str) -> Utf8PathBuf {
    if request.starts_with("./") || request.starts_with("../") {
        normalize_path(&context.join(request))
    } else if request.starts_with('/') {
        normalize_path(Utf8Path::new(request))
    } else {
        Utf8PathBuf::from(request)
    }
}

/// Removes `.` and resolves `..` components without touching the disk.
pub fn normalize_path(path: &Utf8Path) -> Utf8PathBuf {
    let mut out = Utf8PathBuf::new();
    for component in path.components() {
        match component {
            Utf8Component::CurDir => {}
            Utf8Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_str()),
        }
    }
    out
}

/// The default host: processes stylesheets from a file system with caching.
pub struct FileProcessor<F: FileSystem = OsFileSystem> {
    fs: F,
    options: ProcessOptions,
    cache: RefCell<StylesheetCache>,
    modules: RefCell<FxHashMap<Utf8PathBuf, JsValue>>,
}

impl<F: FileSystem> FileProcessor<F> {
    /// Creates a processor over a file system.
    pub fn new(fs: F, options: ProcessOptions) -> Self {
        Self {
            fs,
            options,
            cache: RefCell::new(StylesheetCache::new()),
            modules: RefCell::new(FxHashMap::default()),
        }
    }

    /// Returns the underlying file system.
    pub fn fs(&self) -> &F {
        &self.fs
    }

    /// Makes `value` the exports of the module at `path`.
    ///
    /// `path` is either an absolute path matched by relative imports or a
    /// bare module name.
    pub fn register_module(&self, path: impl Into<Utf8PathBuf>, value: JsValue) {
        let path: Utf8PathBuf = path.into();
        let key = if path.is_absolute() {
            normalize_path(&path)
        } else {
            path
        };
        self.modules.borrow_mut().insert(key, value);
    }

    /// Drops the cached table of a stylesheet.
    pub fn invalidate(&self, path: &Utf8Path) -> bool {
        self.cache.borrow_mut().invalidate(path)
    }

    /// Number of cached stylesheets.
    pub fn cached(&self) -> usize {
        self.cache.borrow().len()
    }

    fn read(&self, path: &Utf8Path) -> Result<String, HostError> {
        self.fs.read_to_string(path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                HostError::NotFound(path.to_path_buf())
            } else {
                HostError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })
    }
}

impl<F: FileSystem> ModuleHost for FileProcessor<F> {
    fn process(&self, path: &Utf8Path) -> Result<Rc<StylableMeta>, HostError> {
        let path = normalize_path(path);
        let source = self.read(&path)?;
        if let Some(meta) = self.cache.borrow().get(&path, &source) {
            trace!(path = %path, "stylesheet cache hit");
            return Ok(meta);
        }
        debug!(path = %path, "processing stylesheet");
        let meta = Rc::new(process_source(&source, &path, &self.options));
        self.cache
            .borrow_mut()
            .insert(&path, &source, Rc::clone(&meta));
        Ok(meta)
    }

    fn require(&self, path: &Utf8Path) -> Result<JsValue, HostError> {
        if let Some(value) = self.modules.borrow().get(path) {
            return Ok(value.clone());
        }
        if path.extension() == Some("json") {
            let text = self.read(path)?;
            let json = serde_json::from_str(&text).map_err(|source| HostError::Json {
                path: path.to_path_buf(),
                source,
            })?;
            return Ok(JsValue::from_json(json));
        }
        Err(HostError::UnknownModule(path.to_path_buf()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_request() {
        let context = Utf8Path::new("/project/src/components");
        assert_eq!(
            resolve_request(context, "./button.st.css"),
            Utf8PathBuf::from("/project/src/components/button.st.css")
        );
        assert_eq!(
            resolve_request(context, "../theme/colors.st.css"),
            Utf8PathBuf::from("/project/src/theme/colors.st.css")
        );
        assert_eq!(
            resolve_request(context, "my-formatters"),
            Utf8PathBuf::from("my-formatters")
        );
    }

    #[test]
    fn test_process_is_cached_until_content_changes() {
        let fs = MemoryFileSystem::with_files([("/a.st.css", ".root {}")]);
        let processor = FileProcessor::new(&fs, ProcessOptions::default());
        let first = processor.process(Utf8Path::new("/a.st.css")).unwrap();
        let second = processor.process(Utf8Path::new("/./a.st.css")).unwrap();
        assert!(Rc::ptr_eq(&first, &second));

        fs.write("/a.st.css", ".root {} .b {}");
        let third = processor.process(Utf8Path::new("/a.st.css")).unwrap();
        assert!(!Rc::ptr_eq(&first, &third));
        assert!(third.classes.contains_key("b"));
        assert_eq!(processor.cached(), 1);
    }

    #[test]
    fn test_missing_file() {
        let processor = FileProcessor::new(MemoryFileSystem::new(), ProcessOptions::default());
        let err = processor.process(Utf8Path::new("/nope.st.css")).unwrap_err();
        assert!(matches!(err, HostError::NotFound(_)));
    }

    #[test]
    fn test_require_registered_and_json() {
        let fs = MemoryFileSystem::with_files([("/colors.json", r#"{"brand": "red"}"#)]);
        let processor = FileProcessor::new(fs, ProcessOptions::default());
        processor.register_module("formatters", JsValue::from("x"));

        let json = processor.require(Utf8Path::new("/colors.json")).unwrap();
        assert_eq!(json.get("brand").and_then(JsValue::as_css_string).as_deref(), Some("red"));
        assert!(processor.require(Utf8Path::new("formatters")).is_ok());
        assert!(matches!(
            processor.require(Utf8Path::new("/missing.js")),
            Err(HostError::UnknownModule(_))
        ));
    }
}
