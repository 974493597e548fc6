use thiserror::Error;

/// Boxed error returned by the session and metadata collaborators
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort region resolution
///
/// The instance metadata service being unreachable is not one of them; that case
/// resolves to [`DEFAULT_REGION`](crate::DEFAULT_REGION).
#[derive(Debug, Error)]
pub enum Error {
  /// Environment and shared configuration could not be loaded
  #[error("got error when starting session")]
  Session(#[source] BoxError),

  /// The metadata service reported itself available but the region query failed
  #[error("unable to retrieve region from instance metadata")]
  MetadataQuery(#[source] BoxError),

  /// The metadata endpoint override is not a valid URI
  #[error("invalid instance metadata endpoint `{endpoint}`")]
  InvalidEndpoint {
    endpoint: String,
    #[source]
    source: BoxError,
  },

  /// The HTTP client for the metadata service could not be built
  #[error("unable to build instance metadata client")]
  Client(#[source] BoxError),
}

#[cfg(test)]
mod tests {
  use std::error::Error as _;

  use super::*;

  #[test]
  fn it_keeps_the_cause_as_source() {
    let err = Error::MetadataQuery("connection reset".into());

    assert_eq!(err.to_string(), "unable to retrieve region from instance metadata");
    assert_eq!(err.source().unwrap().to_string(), "connection reset");
  }
}
