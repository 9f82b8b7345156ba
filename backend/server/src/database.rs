//! # Redis
//!
//! Document store backing the server. Layout and batching live in
//! [`ledger::store::database`], this only wires it to the config.
use std::sync::Arc;

use ledger::store::{DocumentStore, StoreError, database::RedisStore};
use tracing::info;

use crate::config::Config;

pub async fn init_store(config: &Config) -> Result<Arc<dyn DocumentStore>, StoreError> {
    info!("Connecting to Redis at {}", config.redis_url);
    let store = RedisStore::connect(&config.redis_url, config.redis_prefix.as_str()).await?;
    info!("Redis ready, keys under {}:*", config.redis_prefix);

    Ok(Arc::new(store))
}
