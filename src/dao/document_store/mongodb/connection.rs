use std::time::Duration;

use mongodb::{Client, Database, bson::doc};
use tokio::time::sleep;
use tracing::debug;

use super::{
    config::MongoConfig,
    error::{MongoDaoError, MongoResult},
};

/// Short retry for a server that is still starting; longer outages are the
/// storage supervisor's job.
const PING_ATTEMPTS: u32 = 3;
const PING_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Open a client on the configured database and wait for it to answer `ping`.
pub async fn establish_connection(config: &MongoConfig) -> MongoResult<Database> {
    let client = Client::with_options(config.options.clone())
        .map_err(|source| MongoDaoError::ClientConstruction { source })?;
    let database = client.database(&config.database_name);

    let mut attempts = 0;
    loop {
        attempts += 1;
        match database.run_command(doc! { "ping": 1 }).await {
            Ok(_) => return Ok(database),
            Err(source) if attempts >= PING_ATTEMPTS => {
                return Err(MongoDaoError::InitialPing { attempts, source });
            }
            Err(err) => {
                debug!(attempts, error = %err, "mongodb ping failed; retrying");
                sleep(PING_RETRY_DELAY).await;
            }
        }
    }
}
