//! File access for modules that are not open in the workspace.

use cirrus_ast::FileUri;
use dashmap::DashMap;
use std::io;
use thiserror::Error;

/// Errors returned by a [`FileResolver`].
#[derive(Debug, Error)]
pub enum FileResolveError {
    #[error("file '{0}' does not exist")]
    NotFound(FileUri),

    #[error("URI scheme '{scheme}' is not supported by this resolver ({uri})")]
    UnsupportedScheme { uri: FileUri, scheme: String },

    #[error("could not read '{uri}': {source}")]
    Io {
        uri: FileUri,
        #[source]
        source: io::Error,
    },
}

/// Reads source text by URI.
///
/// Implementations must be shareable across compile workers.
pub trait FileResolver: Send + Sync {
    fn read(&self, uri: &FileUri) -> Result<String, FileResolveError>;
}

/// Resolves `file:` URIs against the local file system.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileSystemResolver;

impl FileResolver for FileSystemResolver {
    fn read(&self, uri: &FileUri) -> Result<String, FileResolveError> {
        let Some(path) = uri.to_file_path() else {
            return Err(FileResolveError::UnsupportedScheme {
                uri: uri.clone(),
                scheme: uri.scheme().to_string(),
            });
        };
        std::fs::read_to_string(&path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => FileResolveError::NotFound(uri.clone()),
            _ => FileResolveError::Io {
                uri: uri.clone(),
                source,
            },
        })
    }
}

/// Thread-safe in-memory file set, for tests and editor buffers.
#[derive(Debug, Default)]
pub struct InMemoryFileResolver {
    files: DashMap<FileUri, String>,
}

impl InMemoryFileResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_files<I, S>(files: I) -> Self
    where
        I: IntoIterator<Item = (FileUri, S)>,
        S: Into<String>,
    {
        let resolver = Self::new();
        for (uri, text) in files {
            resolver.insert(uri, text);
        }
        resolver
    }

    pub fn insert(&self, uri: FileUri, text: impl Into<String>) {
        self.files.insert(uri, text.into());
    }

    pub fn remove(&self, uri: &FileUri) -> Option<String> {
        self.files.remove(uri).map(|(_, text)| text)
    }
}

impl FileResolver for InMemoryFileResolver {
    fn read(&self, uri: &FileUri) -> Result<String, FileResolveError> {
        self.files
            .get(uri)
            .map(|text| text.value().clone())
            .ok_or_else(|| FileResolveError::NotFound(uri.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_file_system_resolver_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("main.cirrus");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "var a = 1").unwrap();

        let uri = FileUri::from_file_path(&path).unwrap();
        assert_eq!(FileSystemResolver.read(&uri).unwrap(), "var a = 1\n");
    }

    #[test]
    fn test_file_system_resolver_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let uri = FileUri::from_file_path(&dir.path().join("nope.cirrus")).unwrap();
        assert!(matches!(
            FileSystemResolver.read(&uri),
            Err(FileResolveError::NotFound(_))
        ));
    }

    #[test]
    fn test_file_system_resolver_rejects_other_schemes() {
        let uri = FileUri::parse("inmemory:///main.cirrus").unwrap();
        assert!(matches!(
            FileSystemResolver.read(&uri),
            Err(FileResolveError::UnsupportedScheme { .. })
        ));
    }

    #[test]
    fn test_in_memory_resolver() {
        let uri = FileUri::parse("inmemory:///a.cirrus").unwrap();
        let resolver = InMemoryFileResolver::with_files([(uri.clone(), "var a = 1")]);
        assert_eq!(resolver.read(&uri).unwrap(), "var a = 1");
        resolver.remove(&uri);
        assert!(matches!(
            resolver.read(&uri),
            Err(FileResolveError::NotFound(_))
        ));
    }
}
