//! Error types and result definitions for feed indexing operations.
//!
//! One crate-wide error type, [`FeedError`], classifies every failure with an
//! [`ErrorKind`], carries a static description plus optional dynamic detail,
//! and captures the callsite and a backtrace. Aggregation over multiple
//! failures is supported so batch operations can report everything at once.

use std::backtrace::Backtrace;
use std::borrow::Cow;
use std::error;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

/// Convenient result type for feed indexing operations.
pub type FeedResult<T> = Result<T, FeedError>;

/// Detailed payload stored for single [`FeedError`] instances.
#[derive(Debug, Clone)]
struct ErrorPayload {
    kind: ErrorKind,
    description: Cow<'static, str>,
    detail: Option<Cow<'static, str>>,
    source: Option<Arc<dyn error::Error + Send + Sync>>,
    location: &'static Location<'static>,
    backtrace: Arc<Backtrace>,
}

/// Main error type for feed indexing operations.
#[derive(Debug, Clone)]
pub struct FeedError {
    repr: ErrorRepr,
}

/// Internal representation of error data.
///
/// Supports a single rich error or multiple aggregated errors behind one
/// interface. Use [`FeedError`] methods instead of matching on this directly.
#[derive(Debug, Clone)]
enum ErrorRepr {
    /// Single error payload holding full metadata.
    Single(ErrorPayload),
    /// Multiple aggregated errors, e.g. from independent batch items.
    Many {
        errors: Vec<FeedError>,
        location: &'static Location<'static>,
    },
}

/// Categories of failures that can occur while indexing a feed.
#[derive(PartialEq, Eq, Copy, Clone, Debug, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    // Data access failures.
    SourceConnectionFailed,
    SourceQueryFailed,
    FeedQueryFailed,

    // Resolver failures. Deliberately opaque: callers never see the
    // underlying storage error, which is logged before wrapping.
    UnableRetrieveData,

    // Change-log input failures.
    MalformedRecord,

    // Configuration failures.
    ConfigError,

    // Serialization failures.
    SerializationError,
    DeserializationError,
    IoError,

    // State failures.
    InvalidState,

    // Unknown / uncategorized.
    Unknown,
}

impl FeedError {
    /// Returns the [`ErrorKind`] of this error.
    ///
    /// For aggregated errors, returns the kind of the first error, or
    /// [`ErrorKind::Unknown`] when the aggregate is empty.
    pub fn kind(&self) -> ErrorKind {
        match self.repr {
            ErrorRepr::Single(ref payload) => payload.kind,
            ErrorRepr::Many { ref errors, .. } => errors
                .first()
                .map(|err| err.kind())
                .unwrap_or(ErrorKind::Unknown),
        }
    }

    /// Returns all [`ErrorKind`]s present in this error, flattened.
    pub fn kinds(&self) -> Vec<ErrorKind> {
        match self.repr {
            ErrorRepr::Single(ref payload) => vec![payload.kind],
            ErrorRepr::Many { ref errors, .. } => errors
                .iter()
                .flat_map(|err| err.kinds())
                .collect::<Vec<_>>(),
        }
    }

    /// Returns the dynamic detail, if any.
    ///
    /// For aggregated errors, returns the first detail found.
    pub fn detail(&self) -> Option<&str> {
        match self.repr {
            ErrorRepr::Single(ref payload) => payload.detail.as_deref(),
            ErrorRepr::Many { ref errors, .. } => errors.iter().find_map(|e| e.detail()),
        }
    }

    /// Returns the captured backtrace, if this is a single error.
    pub fn backtrace(&self) -> Option<&Backtrace> {
        match self.repr {
            ErrorRepr::Single(ref payload) => Some(payload.backtrace.as_ref()),
            ErrorRepr::Many { .. } => None,
        }
    }

    /// Returns the callsite where this error was created.
    pub fn location(&self) -> &'static Location<'static> {
        match self.repr {
            ErrorRepr::Single(ref payload) => payload.location,
            ErrorRepr::Many { location, .. } => location,
        }
    }

    /// Attaches an originating error and returns the modified instance.
    ///
    /// The source is preserved across clones and exposed via
    /// [`error::Error::source`]. No effect on aggregated errors, which forward
    /// their first contained error as the source.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: error::Error + Send + Sync + 'static,
    {
        if let ErrorRepr::Single(ref mut payload) = self.repr {
            payload.source = Some(Arc::new(source));
        }
        self
    }

    /// Creates a [`FeedError`] from its components.
    #[track_caller]
    fn from_components(
        kind: ErrorKind,
        description: Cow<'static, str>,
        detail: Option<Cow<'static, str>>,
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    ) -> Self {
        FeedError {
            repr: ErrorRepr::Single(ErrorPayload {
                kind,
                description,
                detail,
                source,
                location: Location::caller(),
                backtrace: Arc::new(Backtrace::capture()),
            }),
        }
    }
}

impl PartialEq for FeedError {
    /// Compares errors by kind only, ignoring detail, location and sources.
    fn eq(&self, other: &FeedError) -> bool {
        match (&self.repr, &other.repr) {
            (ErrorRepr::Single(a), ErrorRepr::Single(b)) => a.kind == b.kind,
            (
                ErrorRepr::Many {
                    errors: errors_a, ..
                },
                ErrorRepr::Many {
                    errors: errors_b, ..
                },
            ) => {
                errors_a.len() == errors_b.len()
                    && errors_a.iter().zip(errors_b.iter()).all(|(a, b)| a == b)
            }
            _ => false,
        }
    }
}

impl fmt::Display for FeedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        match &self.repr {
            ErrorRepr::Single(payload) => {
                let location = payload.location;
                write!(
                    f,
                    "[{:?}] {} @ {}:{}:{}",
                    payload.kind,
                    payload.description,
                    location.file(),
                    location.line(),
                    location.column()
                )?;

                if let Some(detail) = payload.detail.as_deref() {
                    write!(f, "\n  Detail: {detail}")?;
                }

                Ok(())
            }
            ErrorRepr::Many { errors, location } => {
                let count = errors.len();
                write!(
                    f,
                    "[Many] {} error{} aggregated @ {}:{}:{}",
                    count,
                    if count == 1 { "" } else { "s" },
                    location.file(),
                    location.line(),
                    location.column()
                )?;

                for (index, error) in errors.iter().enumerate() {
                    let rendered = format!("{error}");
                    for (line_index, line) in rendered.lines().enumerate() {
                        if line_index == 0 {
                            write!(f, "\n  {}. {}", index + 1, line)?;
                        } else {
                            write!(f, "\n     {line}")?;
                        }
                    }
                }

                Ok(())
            }
        }
    }
}

impl error::Error for FeedError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match &self.repr {
            ErrorRepr::Single(payload) => payload
                .source
                .as_ref()
                .map(|source| source as &(dyn error::Error + 'static)),
            // Aggregated errors forward the first contained error.
            ErrorRepr::Many { errors, .. } => errors
                .first()
                .map(|error| error as &(dyn error::Error + 'static)),
        }
    }
}

/// Creates a [`FeedError`] from an error kind and static description.
impl From<(ErrorKind, &'static str)> for FeedError {
    #[track_caller]
    fn from((kind, desc): (ErrorKind, &'static str)) -> FeedError {
        FeedError::from_components(kind, Cow::Borrowed(desc), None, None)
    }
}

/// Creates a [`FeedError`] from an error kind, static description, and detail.
impl<D> From<(ErrorKind, &'static str, D)> for FeedError
where
    D: Into<Cow<'static, str>>,
{
    #[track_caller]
    fn from((kind, desc, detail): (ErrorKind, &'static str, D)) -> FeedError {
        FeedError::from_components(kind, Cow::Borrowed(desc), Some(detail.into()), None)
    }
}

/// Aggregates a vector of errors into one [`FeedError`].
///
/// A vector with exactly one element unwraps to that error directly.
impl<E> From<Vec<E>> for FeedError
where
    E: Into<FeedError>,
{
    #[track_caller]
    fn from(errors: Vec<E>) -> FeedError {
        let location = Location::caller();

        let mut errors: Vec<FeedError> = errors.into_iter().map(Into::into).collect();

        if errors.len() == 1 {
            return errors.pop().expect("just checked length is 1");
        }

        FeedError {
            repr: ErrorRepr::Many { errors, location },
        }
    }
}

/// Converts [`std::io::Error`] to [`FeedError`] with [`ErrorKind::IoError`].
impl From<std::io::Error> for FeedError {
    #[track_caller]
    fn from(err: std::io::Error) -> FeedError {
        let detail = err.to_string();
        FeedError::from_components(
            ErrorKind::IoError,
            Cow::Borrowed("I/O operation failed"),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}

/// Converts [`serde_json::Error`] to [`FeedError`] classified by category.
impl From<serde_json::Error> for FeedError {
    #[track_caller]
    fn from(err: serde_json::Error) -> FeedError {
        let (kind, description) = match err.classify() {
            serde_json::error::Category::Io => (ErrorKind::IoError, "JSON I/O operation failed"),
            serde_json::error::Category::Syntax
            | serde_json::error::Category::Data
            | serde_json::error::Category::Eof => (
                ErrorKind::DeserializationError,
                "JSON deserialization failed",
            ),
        };

        let detail = err.to_string();
        FeedError::from_components(
            kind,
            Cow::Borrowed(description),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}

/// Converts [`sqlx::Error`] to [`FeedError`] classified by variant.
///
/// Defaults to the source side; feed-table writes wrap their errors with
/// [`ErrorKind::FeedQueryFailed`] explicitly at the callsite.
impl From<sqlx::Error> for FeedError {
    #[track_caller]
    fn from(err: sqlx::Error) -> FeedError {
        let kind = match &err {
            sqlx::Error::Io(_) => ErrorKind::IoError,
            sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut => {
                ErrorKind::SourceConnectionFailed
            }
            _ => ErrorKind::SourceQueryFailed,
        };

        let detail = err.to_string();
        FeedError::from_components(
            kind,
            Cow::Borrowed("Database operation failed"),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed_error;

    #[test]
    fn single_error_exposes_kind_and_detail() {
        let err = feed_error!(
            ErrorKind::SourceQueryFailed,
            "Query failed",
            "relation does not exist"
        );

        assert_eq!(err.kind(), ErrorKind::SourceQueryFailed);
        assert_eq!(err.detail(), Some("relation does not exist"));
    }

    #[test]
    fn errors_compare_by_kind() {
        let a = feed_error!(ErrorKind::MalformedRecord, "Bad row", "row 1");
        let b = feed_error!(ErrorKind::MalformedRecord, "Bad row", "row 2");
        let c = feed_error!(ErrorKind::ConfigError, "Bad config");

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn single_element_vector_unwraps() {
        let err: FeedError = vec![feed_error!(ErrorKind::InvalidState, "Oops")].into();

        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert_eq!(err.kinds().len(), 1);
    }

    #[test]
    fn aggregated_errors_flatten_kinds() {
        let err: FeedError = vec![
            feed_error!(ErrorKind::SourceQueryFailed, "First"),
            feed_error!(ErrorKind::FeedQueryFailed, "Second"),
        ]
        .into();

        assert_eq!(err.kind(), ErrorKind::SourceQueryFailed);
        assert_eq!(
            err.kinds(),
            vec![ErrorKind::SourceQueryFailed, ErrorKind::FeedQueryFailed]
        );
    }

    #[test]
    fn with_source_is_exposed_through_error_trait() {
        use std::error::Error;

        let io = std::io::Error::other("disk on fire");
        let err = feed_error!(ErrorKind::IoError, "I/O failed").with_source(io);

        assert!(err.source().is_some());
    }
}
