//! Crate error type.
//!
//! Bad client input is never an error; these cover the infrastructure around
//! the relay.

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("chat hub is no longer running")]
    HubUnavailable,

    #[error("invalid configuration: {0}")]
    Config(#[from] Box<figment::Error>),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

impl From<figment::Error> for RelayError {
    fn from(err: figment::Error) -> Self {
        RelayError::Config(Box::new(err))
    }
}

pub type Result<T, E = RelayError> = std::result::Result<T, E>;
