//! `composer.json`-style manifest files.
//!
//! A [`ManifestFile`] wraps one JSON document on disk. Reads go through an
//! explicit cache: the first [`ManifestFile::read`] parses the file, later
//! calls return the cached document until [`ManifestFile::reload`] is called.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};
use tempfile::NamedTempFile;
use thiserror::Error;

/// A parsed manifest: property name to property value.
pub type Manifest = Map<String, Value>;

static EMPTY_MANIFEST: LazyLock<Manifest> = LazyLock::new(Map::new);

/// Indentation used when writing manifests, matching Composer's own output.
const INDENT: &[u8] = b"    ";

/// Errors raised while reading or writing a manifest file.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("file does not exist: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("could not read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not decode JSON in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{} is not writable", path.display())]
    NotWritable { path: PathBuf },

    #[error("could not write to {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not encode JSON for {}: {source}", path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl ManifestError {
    /// The file the error refers to.
    pub fn path(&self) -> &Path {
        match self {
            ManifestError::NotFound { path }
            | ManifestError::Read { path, .. }
            | ManifestError::Parse { path, .. }
            | ManifestError::NotWritable { path }
            | ManifestError::Write { path, .. }
            | ManifestError::Encode { path, .. } => path,
        }
    }
}

/// A JSON manifest file on disk.
#[derive(Debug, Clone)]
pub struct ManifestFile {
    path: PathBuf,
    data: Option<Value>,
}

impl ManifestFile {
    /// Create a handle for the file at `path`. Nothing is read yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        ManifestFile {
            path: path.into(),
            data: None,
        }
    }

    /// Path of the underlying file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the path names an existing regular file.
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Whether a document has been read and cached.
    pub fn is_cached(&self) -> bool {
        self.data.is_some()
    }

    /// Read the manifest as an object.
    ///
    /// Top-level content that is not an object reads as an empty manifest.
    pub fn read(&mut self) -> Result<&Manifest, ManifestError> {
        let value = self.read_value()?;
        Ok(value.as_object().unwrap_or(&EMPTY_MANIFEST))
    }

    /// Read the raw JSON document.
    ///
    /// Objects and arrays are returned as parsed; scalar documents are
    /// normalized to an empty object.
    pub fn read_value(&mut self) -> Result<&Value, ManifestError> {
        let data = match self.data.take() {
            Some(data) => data,
            None => self.load()?,
        };
        Ok(self.data.insert(data))
    }

    /// Drop the cached document and read the file again.
    pub fn reload(&mut self) -> Result<&Manifest, ManifestError> {
        self.data = None;
        self.read()
    }

    /// Whether the file exists and holds valid JSON.
    pub fn is_valid(&mut self) -> bool {
        self.read().is_ok()
    }

    /// Serialize `data` and replace the file with it.
    ///
    /// The document is written to a temporary file next to the target and
    /// renamed over it. Returns the number of bytes written. The read cache
    /// is left untouched.
    pub fn write<T: Serialize + ?Sized>(&self, data: &T) -> Result<usize, ManifestError> {
        let existing = fs::metadata(&self.path).ok();
        if let Some(ref meta) = existing {
            if meta.permissions().readonly() {
                return Err(ManifestError::NotWritable {
                    path: self.path.clone(),
                });
            }
        }

        let json = to_pretty_json(data).map_err(|source| ManifestError::Encode {
            path: self.path.clone(),
            source,
        })?;

        let write_err = |source: io::Error| ManifestError::Write {
            path: self.path.clone(),
            source,
        };

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
        tmp.write_all(&json).map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;

        match existing {
            Some(meta) => fs::set_permissions(tmp.path(), meta.permissions()).map_err(write_err)?,
            None => set_default_permissions(tmp.path()).map_err(write_err)?,
        }

        tmp.persist(&self.path)
            .map_err(|e| write_err(e.error))?;

        tracing::debug!("wrote {} bytes to {}", json.len(), self.path.display());
        Ok(json.len())
    }
}

/// Encode `data` the way manifests are written to disk.
///
/// Pretty-printed with four-space indentation; object keys keep their
/// insertion order; `/` and non-ASCII characters are emitted unescaped.
pub fn to_pretty_json<T: Serialize + ?Sized>(data: &T) -> Result<Vec<u8>, serde_json::Error> {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(INDENT);
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    data.serialize(&mut serializer)?;
    Ok(buf)
}

#[cfg(unix)]
fn set_default_permissions(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn set_default_permissions(_path: &Path) -> io::Result<()> {
    Ok(())
}

impl ManifestFile {
    fn load(&self) -> Result<Value, ManifestError> {
        if !self.exists() {
            return Err(ManifestError::NotFound {
                path: self.path.clone(),
            });
        }

        let bytes = fs::read(&self.path).map_err(|source| ManifestError::Read {
            path: self.path.clone(),
            source,
        })?;

        let value: Value =
            serde_json::from_slice(&bytes).map_err(|source| ManifestError::Parse {
                path: self.path.clone(),
                source,
            })?;

        Ok(match value {
            Value::Object(_) | Value::Array(_) => value,
            _ => Value::Object(Map::new()),
        })
    }
}
