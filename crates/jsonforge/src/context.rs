//! Per-call state for extraction and serialization.

use std::{
    any::{Any, TypeId, type_name},
    fmt,
};

use thiserror::Error;

use crate::{
    formats::{BoxError, Formats, NoSerializer},
    path::Path,
    value::Value,
};

/// An API version threaded through extraction and serialization, so custom
/// extractors can accept older field layouts.
///
/// Versions order by `major`, then `minor`. The all-zero version is
/// "unspecified".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
}

impl Version {
    #[must_use]
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Whether this is the unspecified version `0.0`.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.major == 0 && self.minor == 0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Extraction failed somewhere below [`path`](ExtractionError::path).
///
/// Any error raised by an extractor is wrapped into this type exactly once;
/// the original error stays reachable through
/// [`source`](std::error::Error::source).
#[derive(Debug, Error)]
#[error("{}", render_extraction(.path, .message))]
pub struct ExtractionError {
    pub path: Path,
    pub message: String,
    #[source]
    pub source: Option<BoxError>,
}

fn render_extraction(path: &Path, message: &str) -> String {
    let mut out = String::from("Extraction error");
    if !path.is_empty() {
        out.push_str(" at ");
        out.push_str(&path.to_string());
    }
    if !message.is_empty() {
        out.push_str(": ");
        out.push_str(message);
    }
    out
}

impl ExtractionError {
    pub fn new(path: Path, message: impl Into<String>) -> Self {
        Self {
            path,
            message: message.into(),
            source: None,
        }
    }

    fn wrap(path: &Path, err: BoxError) -> Self {
        match err.downcast::<ExtractionError>() {
            Ok(err) => *err,
            Err(err) => Self {
                path: path.clone(),
                message: err.to_string(),
                source: Some(err),
            },
        }
    }
}

/// Serialization of a native value failed.
#[derive(Debug, Error)]
pub enum SerializationError {
    #[error(transparent)]
    NoSerializer(#[from] NoSerializer),
    #[error("Serialization error for type {type_name}: {source}")]
    Failed {
        type_name: &'static str,
        #[source]
        source: BoxError,
    },
}

/// State carried through one extraction.
///
/// The context handed to an extractor reports that extractor's position in
/// the document through [`path`](ExtractionContext::path); nested calls to
/// [`extract_sub`](ExtractionContext::extract_sub) extend it.
#[derive(Clone)]
pub struct ExtractionContext<'a> {
    formats: Formats,
    version: Version,
    path: Path,
    user_data: Option<&'a dyn Any>,
}

impl fmt::Debug for ExtractionContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionContext")
            .field("version", &self.version)
            .field("path", &self.path)
            .field("user_data", &self.user_data.is_some())
            .finish_non_exhaustive()
    }
}

impl<'a> ExtractionContext<'a> {
    pub fn new(formats: Formats) -> Self {
        Self {
            formats,
            version: Version::default(),
            path: Path::root(),
            user_data: None,
        }
    }

    /// A context over [`Formats::global`].
    #[must_use]
    pub fn global() -> Self {
        Self::new(Formats::global())
    }

    #[must_use]
    pub fn with_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    /// Starts extraction as if `from` were found at `path`.
    #[must_use]
    pub fn with_path(mut self, path: Path) -> Self {
        self.path = path;
        self
    }

    #[must_use]
    pub fn with_user_data(mut self, user_data: &'a dyn Any) -> Self {
        self.user_data = Some(user_data);
        self
    }

    pub fn formats(&self) -> &Formats {
        &self.formats
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The user data, if it was supplied and is a `U`.
    pub fn user_data<U: Any>(&self) -> Option<&'a U> {
        self.user_data.and_then(|data| data.downcast_ref::<U>())
    }

    /// Converts `from` into a `T` using the registered extractor.
    ///
    /// # Errors
    ///
    /// Any failure, including a missing extractor, comes back as an
    /// [`ExtractionError`] at this context's path. An [`ExtractionError`]
    /// raised by a nested extraction is passed through untouched so it keeps
    /// the deeper path.
    pub fn extract<T: 'static>(&self, from: &Value) -> Result<T, ExtractionError> {
        let extractor = self
            .formats
            .extractor_for::<T>()
            .map_err(|err| ExtractionError::wrap(&self.path, Box::new(err)))?;
        let extracted = extractor
            .extract(self, from)
            .map_err(|err| ExtractionError::wrap(&self.path, err))?;
        match extracted.downcast::<T>() {
            Ok(value) => Ok(*value),
            Err(_) => Err(ExtractionError::new(
                self.path.clone(),
                format!(
                    "extractor for {} produced a value of another type",
                    type_name::<T>()
                ),
            )),
        }
    }

    /// Extracts the value found at `subpath` below `from`.
    ///
    /// # Errors
    ///
    /// As [`extract`](ExtractionContext::extract), reported at this context's
    /// path extended by `subpath`. A missing subpath is reported the same
    /// way.
    pub fn extract_sub<T: 'static>(&self, from: &Value, subpath: &Path) -> Result<T, ExtractionError> {
        let sub = ExtractionContext {
            formats: self.formats.clone(),
            version: self.version,
            path: self.path.join(subpath),
            user_data: self.user_data,
        };
        let found = from
            .at_path(subpath)
            .map_err(|err| ExtractionError::wrap(&sub.path, Box::new(err)))?;
        sub.extract(found)
    }
}

/// State carried through one serialization.
#[derive(Clone)]
pub struct SerializationContext<'a> {
    formats: Formats,
    version: Version,
    user_data: Option<&'a dyn Any>,
}

impl fmt::Debug for SerializationContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerializationContext")
            .field("version", &self.version)
            .field("user_data", &self.user_data.is_some())
            .finish_non_exhaustive()
    }
}

impl<'a> SerializationContext<'a> {
    pub fn new(formats: Formats) -> Self {
        Self {
            formats,
            version: Version::default(),
            user_data: None,
        }
    }

    #[must_use]
    pub fn global() -> Self {
        Self::new(Formats::global())
    }

    #[must_use]
    pub fn with_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    #[must_use]
    pub fn with_user_data(mut self, user_data: &'a dyn Any) -> Self {
        self.user_data = Some(user_data);
        self
    }

    pub fn formats(&self) -> &Formats {
        &self.formats
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn user_data<U: Any>(&self) -> Option<&'a U> {
        self.user_data.and_then(|data| data.downcast_ref::<U>())
    }

    /// # Errors
    ///
    /// [`SerializationError::NoSerializer`] when nothing is registered for
    /// `T`, otherwise whatever the serializer raised.
    pub fn to_json<T: 'static>(&self, from: &T) -> Result<Value, SerializationError> {
        let serializer = self.formats.serializer_for::<T>()?;
        debug_assert_eq!(serializer.type_id(), TypeId::of::<T>());
        serializer
            .to_json(self, from)
            .map_err(|source| SerializationError::Failed {
                type_name: type_name::<T>(),
                source,
            })
    }
}

/// Extracts a `T` from `from` using `formats`.
///
/// # Errors
///
/// See [`ExtractionContext::extract`].
pub fn extract<T: 'static>(from: &Value, formats: &Formats) -> Result<T, ExtractionError> {
    ExtractionContext::new(formats.clone()).extract(from)
}

/// Extracts a `T` using [`Formats::global`].
///
/// # Errors
///
/// See [`ExtractionContext::extract`].
pub fn extract_global<T: 'static>(from: &Value) -> Result<T, ExtractionError> {
    ExtractionContext::global().extract(from)
}

/// Serializes `from` using `formats`.
///
/// # Errors
///
/// See [`SerializationContext::to_json`].
pub fn to_json<T: 'static>(from: &T, formats: &Formats) -> Result<Value, SerializationError> {
    SerializationContext::new(formats.clone()).to_json(from)
}

/// Serializes `from` using [`Formats::global`].
///
/// # Errors
///
/// See [`SerializationContext::to_json`].
pub fn to_json_global<T: 'static>(from: &T) -> Result<Value, SerializationError> {
    SerializationContext::global().to_json(from)
}
