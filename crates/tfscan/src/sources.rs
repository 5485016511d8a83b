//! collection of configuration sources (text and path to source file)
//!
//! [Sources] keeps the raw text of every loaded file in load order. Documents are merged by textual concatenation,
//! each source followed by a blank line, and parsed once. Directory walks keep whatever order the file system
//! returns.
use std::path::{Path, PathBuf};

/// Appended after every source when concatenating
pub const SEPARATOR: &str = "\n\n";

/// Which files a directory walk picks up
#[derive(Debug, Clone, PartialEq)]
pub struct SourceOptions {
    /// File name suffix of configuration files
    pub suffix: String,
    /// Directory name that is never descended into
    pub cache_dir: String,
}

impl Default for SourceOptions {
    fn default() -> Self {
        Self {
            suffix: ".tf".into(),
            cache_dir: ".terraform".into(),
        }
    }
}

#[derive(Default, Debug)]
pub struct Sources {
    sources: Vec<(Source, String)>,
}

impl Sources {
    /// Add configuration text
    pub fn insert(&mut self, text: impl Into<String>, path: impl Into<Source>) {
        self.sources.push((path.into(), text.into()));
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &Source> {
        self.sources.iter().map(|(path, _)| path)
    }

    /// All sources as one document
    pub fn concatenated(&self) -> String {
        let mut text = String::new();
        for (_path, source) in &self.sources {
            text.push_str(source);
            text.push_str(SEPARATOR);
        }
        text
    }
}

impl Sources {
    /// Load a single file, or every matching file below a directory
    pub fn from_path(path: &Path, options: &SourceOptions) -> Result<Self, LoadError> {
        let metadata = std::fs::metadata(path).map_err(|source| LoadError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let mut sources = Self::default();
        if metadata.is_dir() {
            sources.load_directory(path, options)?;
        } else {
            sources.load_file(path)?;
        }

        Ok(sources)
    }

    /// Load every listed file, failing on the first unreadable one
    pub fn from_files<P: AsRef<Path>>(
        paths: impl IntoIterator<Item = P>,
    ) -> Result<Self, LoadError> {
        let mut sources = Self::default();
        for path in paths {
            sources.load_file(path.as_ref())?;
        }

        Ok(sources)
    }

    pub fn load_file(&mut self, file_path: &Path) -> Result<(), LoadError> {
        tracing::info!(path=%file_path.display(), "loading file");

        let text = std::fs::read_to_string(file_path).map_err(|source| LoadError::Read {
            path: file_path.to_path_buf(),
            source,
        })?;

        self.insert(text, file_path.to_path_buf());
        Ok(())
    }

    /// Recursively load every matching file below `dir_path`
    pub fn load_directory(
        &mut self,
        dir_path: &Path,
        options: &SourceOptions,
    ) -> Result<(), LoadError> {
        let loaded_before = self.len();
        self.walk(dir_path, options)?;

        if self.len() == loaded_before {
            return Err(LoadError::NoMatchingFiles {
                path: dir_path.to_path_buf(),
                suffix: options.suffix.clone(),
            });
        }

        Ok(())
    }

    fn walk(&mut self, dir_path: &Path, options: &SourceOptions) -> Result<(), LoadError> {
        let walk_error = |source| LoadError::Walk {
            path: dir_path.to_path_buf(),
            source,
        };

        for dir_entry in std::fs::read_dir(dir_path).map_err(walk_error)? {
            let dir_entry = dir_entry.map_err(walk_error)?;
            let file_type = dir_entry.file_type().map_err(walk_error)?;
            let file_name = dir_entry.file_name();
            let file_name = file_name.to_string_lossy();

            if file_type.is_dir() {
                if file_name == options.cache_dir.as_str() {
                    tracing::debug!(path=%dir_entry.path().display(), "cache directory skipped");
                    continue;
                }

                self.walk(&dir_entry.path(), options)?;
                continue;
            }

            let is_file =
                file_type.is_file() || (file_type.is_symlink() && dir_entry.path().is_file());
            if is_file && file_name.ends_with(options.suffix.as_str()) {
                self.load_file(&dir_entry.path())?;
            }
        }

        Ok(())
    }
}

#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("No {suffix} files found in {}", path.display())]
    NoMatchingFiles { path: PathBuf, suffix: String },
    #[error("Unable to read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Unable to walk directory {}", path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Utility macro to create [Sources]
///
/// Create from a single document
/// ```
/// # use tfscan::sources;
/// let sources = sources!("resource \"aws_s3_bucket\" \"logs\" {}");
/// assert_eq!(sources.len(), 1);
/// ```
///
/// Create from multiple documents (path required)
/// ```
/// # use tfscan::sources;
/// let sources = sources! {
///   "one.tf" => "variable \"one\" {}",
///   "two.tf" => "variable \"two\" {}"
/// };
/// assert_eq!(sources.concatenated(), "variable \"one\" {}\n\nvariable \"two\" {}\n\n");
/// ```
#[macro_export]
macro_rules! sources {
    // single document without source
    { $expr:expr } => {{
        let mut sources = $crate::sources::Sources::default();
        sources.insert($expr, None);
        sources
    }};
    // multi document with sources
    { $($source:expr => $expr:expr),+ } => {{
        let mut sources = $crate::sources::Sources::default();
        $(
            sources.insert($expr, Some(std::path::PathBuf::from($source)));
        )+
        sources
    }};
}

pub type Source = Option<PathBuf>;
