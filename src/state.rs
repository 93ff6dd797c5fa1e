use std::sync::Arc;

use crate::{config::Config, database::Store, images::ImageStore};

/// Process-wide handles, built once at startup and injected into handlers
/// through axum state. No ambient globals.
pub struct AppState {
    pub config: Config,
    pub store: Store,
    pub images: ImageStore,
}

impl AppState {
    pub async fn new() -> Arc<Self> {
        let config = Config::load();

        let store = Store::connect(config.redis_url.as_deref()).await;

        let images = ImageStore::new(&config.images_dir, &config.public_url);
        images
            .prepare()
            .await
            .expect("Failed to create image directory");

        Arc::new(Self {
            config,
            store,
            images,
        })
    }
}

#[cfg(test)]
impl AppState {
    pub fn for_tests(images_dir: &std::path::Path) -> Arc<Self> {
        let config = Config::for_tests();
        let images = ImageStore::new(images_dir, &config.public_url);

        Arc::new(Self {
            config,
            store: Store::memory(),
            images,
        })
    }
}
