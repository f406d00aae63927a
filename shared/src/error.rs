use strum::{AsRefStr, Display};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum EntityKind {
    Team,
    Contributor,
}

/// Coarse classification the chat layer uses to pick a user-facing reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCategory {
    NotFound,
    Upstream,
    InvalidInput,
    Internal,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("upstream responded with HTTP {status}")]
    Upstream { status: u16 },

    #[error("malformed upstream data: {0}")]
    MalformedData(String),

    #[error("{kind} `{key}` not found")]
    NotFound { kind: EntityKind, key: String },

    #[error("invalid page number {0}, pages start at 1")]
    InvalidPage(i64),

    #[cfg(feature = "client")]
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl Error {
    pub fn not_found(kind: EntityKind, key: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            key: key.into(),
        }
    }

    pub fn category(&self) -> FailureCategory {
        match self {
            Error::Upstream { status: 404 } | Error::NotFound { .. } => FailureCategory::NotFound,
            Error::Upstream { .. } => FailureCategory::Upstream,
            Error::InvalidPage(_) => FailureCategory::InvalidInput,
            Error::MalformedData(_) => FailureCategory::Internal,
            #[cfg(feature = "client")]
            Error::Transport(_) => FailureCategory::Internal,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::MalformedData(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_404_is_reported_as_not_found() {
        assert_eq!(
            Error::Upstream { status: 404 }.category(),
            FailureCategory::NotFound
        );
        assert_eq!(
            Error::Upstream { status: 500 }.category(),
            FailureCategory::Upstream
        );
        assert_eq!(
            Error::not_found(EntityKind::Team, "alpha").category(),
            FailureCategory::NotFound
        );
        assert_eq!(
            Error::InvalidPage(0).category(),
            FailureCategory::InvalidInput
        );
    }

    #[test]
    fn not_found_message_names_the_entity() {
        let error = Error::not_found(EntityKind::Contributor, "octocat");
        assert_eq!(error.to_string(), "contributor `octocat` not found");
    }
}
