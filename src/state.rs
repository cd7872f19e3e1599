use std::sync::Arc;

use meilisearch_sdk::client::Client;

use super::{config::Config, store::init_store};

pub struct AppState {
    pub config: Config,
    pub meili_client: Arc<Client>,
}

impl AppState {
    pub async fn new() -> Arc<Self> {
        let config = Config::load();

        let meili_client = init_store(&config.meili_url, &config.meili_key).await;

        Arc::new(Self {
            config,
            meili_client,
        })
    }
}
