use mongodb::error::Error as MongoError;
use thiserror::Error;
use uuid::Uuid;

use crate::dao::storage::StorageError;

pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

#[derive(Debug, Error)]
pub enum MongoDaoError {
    #[error("missing MongoDB environment variable `{var}`")]
    MissingEnvVar { var: &'static str },
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        uri: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        attempts: u32,
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping health check failed")]
    HealthPing {
        #[source]
        source: MongoError,
    },
    #[error("failed to save `{id}` in `{collection}`")]
    Save {
        collection: &'static str,
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to load `{id}` from `{collection}`")]
    Load {
        collection: &'static str,
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to list `{collection}`")]
    List {
        collection: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("failed to delete `{id}` from `{collection}`")]
    Delete {
        collection: &'static str,
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("document `{id}` in `{collection}` is not an object")]
    MalformedDocument { collection: &'static str, id: Uuid },
}

impl From<MongoDaoError> for StorageError {
    fn from(err: MongoDaoError) -> Self {
        StorageError::unavailable(err.to_string(), err)
    }
}
