use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use super::{
    off::{found_product, image_url, ProductDatabase},
    repo::IngredientStore,
};
use crate::{storage::image_key, storage::StorageClient, tasks::TaskHandler};

#[derive(Debug, Deserialize)]
struct FetchImageArgs {
    ingredient_id: i64,
}

/// Background job: copies the front image of an Open Food Facts product
/// into object storage and links it to the ingredient.
pub struct FetchIngredientImage {
    pub store: Arc<dyn IngredientStore>,
    pub products: Arc<dyn ProductDatabase>,
    pub storage: Arc<dyn StorageClient>,
}

impl FetchIngredientImage {
    pub async fn fetch(&self, ingredient_id: i64) -> anyhow::Result<bool> {
        let Some(ingredient) = self.store.get(ingredient_id).await? else {
            info!(ingredient_id, "ingredient vanished, no image to fetch");
            return Ok(false);
        };
        if self.store.image_for(ingredient_id).await?.is_some() {
            return Ok(false);
        }
        let Some(code) = ingredient.code.as_deref() else {
            info!(ingredient_id, "ingredient has no barcode, no image to fetch");
            return Ok(false);
        };

        let response = self.products.get_product(code).await?;
        let Some(url) = found_product(&response).and_then(image_url) else {
            info!(ingredient_id, %code, "no image available at source");
            return Ok(false);
        };

        let (body, content_type) = self.products.fetch_image(url).await?;
        let key = image_key(ingredient.uuid, Uuid::new_v4(), &content_type);
        self.storage
            .put_object(&key, body, &content_type)
            .await
            .with_context(|| format!("put_object {key}"))?;
        self.store
            .insert_image(ingredient_id, &key, Some(url))
            .await?;
        info!(ingredient_id, %key, "ingredient image stored");
        Ok(true)
    }
}

#[async_trait]
impl TaskHandler for FetchIngredientImage {
    async fn run(&self, args: Value) -> anyhow::Result<()> {
        let args: FetchImageArgs =
            serde_json::from_value(args).context("fetch_ingredient_image arguments")?;
        self.fetch(args.ingredient_id).await.map(|_| ())
    }
}
