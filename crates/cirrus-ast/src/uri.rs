//! File identity.
//!
//! Every source file is identified by a normalised URI. Workspace, module
//! graph and diagnostics all key on [`FileUri`], so two spellings of the
//! same location always compare equal.
//!
//! Normalisation is what the `url` crate performs on parse (lower-cased
//! scheme and host, resolved `.`/`..` segments, canonical percent-encoding)
//! plus dropping query and fragment. Paths stay case-sensitive.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use thiserror::Error;
use url::Url;

/// Errors produced while building a [`FileUri`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UriError {
    #[error("invalid URI '{input}': {reason}")]
    Invalid { input: String, reason: String },

    #[error("URI '{0}' cannot serve as a base for relative references")]
    CannotBeABase(String),

    #[error("path '{0}' is not absolute")]
    RelativePath(String),
}

/// Normalised URI of a source file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FileUri(Url);

impl FileUri {
    pub fn parse(input: &str) -> Result<Self, UriError> {
        let url = Url::parse(input).map_err(|err| UriError::Invalid {
            input: input.to_string(),
            reason: err.to_string(),
        })?;
        Ok(Self::normalize(url))
    }

    /// URI of an absolute file-system path.
    pub fn from_file_path(path: &Path) -> Result<Self, UriError> {
        Url::from_file_path(path)
            .map(Self::normalize)
            .map_err(|_| UriError::RelativePath(path.display().to_string()))
    }

    fn normalize(mut url: Url) -> Self {
        url.set_fragment(None);
        url.set_query(None);
        // Re-parse so `.`/`..` segments introduced by joins are collapsed.
        let url = Url::parse(url.as_str()).unwrap_or(url);
        Self(url)
    }

    /// Resolve a relative reference (e.g. a module path) against this URI.
    pub fn join(&self, relative: &str) -> Result<Self, UriError> {
        if self.0.cannot_be_a_base() {
            return Err(UriError::CannotBeABase(self.0.to_string()));
        }
        self.0
            .join(relative)
            .map(Self::normalize)
            .map_err(|err| UriError::Invalid {
                input: relative.to_string(),
                reason: err.to_string(),
            })
    }

    pub fn as_url(&self) -> &Url {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn scheme(&self) -> &str {
        self.0.scheme()
    }

    /// Last path segment, e.g. `main.cirrus`.
    pub fn file_name(&self) -> &str {
        self.0
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .unwrap_or("")
    }

    /// Local path for `file:` URIs.
    pub fn to_file_path(&self) -> Option<std::path::PathBuf> {
        if self.0.scheme() == "file" {
            self.0.to_file_path().ok()
        } else {
            None
        }
    }
}

impl fmt::Display for FileUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

impl std::str::FromStr for FileUri {
    type Err = UriError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for FileUri {
    type Error = UriError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<FileUri> for String {
    fn from(value: FileUri) -> Self {
        value.0.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equivalent_spellings_compare_equal() {
        let a = FileUri::parse("file:///work/./infra/../main.cirrus").unwrap();
        let b = FileUri::parse("FILE:///work/main.cirrus#L3").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "file:///work/main.cirrus");
    }

    #[test]
    fn test_paths_are_case_sensitive() {
        let a = FileUri::parse("file:///work/Main.cirrus").unwrap();
        let b = FileUri::parse("file:///work/main.cirrus").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_join_relative_module_path() {
        let main = FileUri::parse("file:///work/main.cirrus").unwrap();
        let module = main.join("modules/../shared/storage.cirrus").unwrap();
        assert_eq!(module.as_str(), "file:///work/shared/storage.cirrus");
        assert_eq!(module.file_name(), "storage.cirrus");
    }

    #[test]
    fn test_inmemory_scheme() {
        let main = FileUri::parse("inmemory:///main.cirrus").unwrap();
        let module = main.join("mod.cirrus").unwrap();
        assert_eq!(module.as_str(), "inmemory:///mod.cirrus");
        assert!(module.to_file_path().is_none());
    }

    #[test]
    fn test_invalid_uri() {
        assert!(matches!(
            FileUri::parse("not a uri"),
            Err(UriError::Invalid { .. })
        ));
    }
}
