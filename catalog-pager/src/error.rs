/// A classified failure from the remote collection service (or from the cache itself).
///
/// The classification drives the retry policy: [`FetchError::NotFound`] is terminal, everything
/// else is treated as transient.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// The remote resource does not exist (HTTP-like status 404).
    #[error("not found")]
    NotFound,

    /// Any other failure. `status` is `None` when no response was received at all.
    #[error("request failed (status {status:?}): {message}")]
    Transient {
        status: Option<u16>,
        message: String,
    },

    /// The query is switched off (e.g. a category list with an empty filter) and must not run.
    #[error("query is disabled")]
    Disabled,

    /// A cache key was reused for a different value type.
    #[error("cache key {key} holds a value of a different type")]
    TypeMismatch { key: String },
}

impl FetchError {
    /// Classifies a failed response by its status code.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        if status == 404 {
            Self::NotFound
        } else {
            Self::Transient {
                status: Some(status),
                message: message.into(),
            }
        }
    }

    /// A failure without a response (connection reset, decode error, ...).
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transient {
            status: None,
            message: message.into(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::NotFound => Some(404),
            Self::Transient { status, .. } => *status,
            Self::Disabled | Self::TypeMismatch { .. } => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    /// Whether the caller-side retry policy may try again after this error.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}

pub type FetchResult<T> = Result<T, FetchError>;

/// Maps [`FetchError::NotFound`] to `Ok(None)`, for lookups where a missing resource is an
/// expected, displayable outcome.
pub trait FetchResultExt<T> {
    fn found(self) -> FetchResult<Option<T>>;
}

impl<T> FetchResultExt<T> for FetchResult<T> {
    fn found(self) -> FetchResult<Option<T>> {
        match self {
            Ok(value) => Ok(Some(value)),
            Err(FetchError::NotFound) => Ok(None),
            Err(err) => Err(err),
        }
    }
}
