use reqwest::{Method, StatusCode};
use thiserror::Error;

use crate::dao::storage::StorageError;

pub type CouchResult<T> = Result<T, CouchDaoError>;

/// CouchDB failures, keyed by the HTTP path that was being accessed.
#[derive(Debug, Error)]
pub enum CouchDaoError {
    #[error("missing CouchDB environment variable `{var}`")]
    MissingEnvVar { var: &'static str },
    #[error("failed to build CouchDB client")]
    ClientBuilder {
        #[source]
        source: reqwest::Error,
    },
    /// The server could not be reached or the body could not be read.
    #[error("CouchDB {method} `{path}` failed")]
    Transport {
        method: Method,
        path: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("CouchDB {method} `{path}` answered {status}")]
    Status {
        method: Method,
        path: String,
        status: StatusCode,
    },
    #[error("CouchDB document `{doc_id}` is not an object")]
    MalformedDocument { doc_id: String },
}

impl From<CouchDaoError> for StorageError {
    fn from(err: CouchDaoError) -> Self {
        StorageError::unavailable(err.to_string(), err)
    }
}
