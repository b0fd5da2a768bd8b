mod config;
mod connection;
mod error;
mod store;

pub use config::MongoConfig;
pub use error::MongoDaoError;
pub use store::MongoStore;
