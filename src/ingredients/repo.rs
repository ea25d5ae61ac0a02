use anyhow::Context;
use async_trait::async_trait;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use super::model::{Ingredient, IngredientData, Language};

pub const DEFAULT_LANGUAGE: &str = "en";

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct IngredientImage {
    pub id: Uuid,
    pub ingredient_id: i64,
    pub s3_key: String,
    pub source_url: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created: OffsetDateTime,
}

/// Where acceptance mails for a submission author go.
#[derive(Debug, Clone, FromRow)]
pub struct AuthorContact {
    pub email: String,
    pub notification_language: String,
}

#[async_trait]
pub trait IngredientStore: Send + Sync {
    async fn get(&self, id: i64) -> anyhow::Result<Option<Ingredient>>;
    async fn find_by_code(&self, code: &str) -> anyhow::Result<Option<Ingredient>>;
    async fn insert(&self, data: &IngredientData) -> anyhow::Result<Ingredient>;
    async fn update(&self, id: i64, data: &IngredientData) -> anyhow::Result<Option<Ingredient>>;

    async fn language(&self, short_name: &str) -> anyhow::Result<Option<Language>>;

    async fn image_for(&self, ingredient_id: i64) -> anyhow::Result<Option<IngredientImage>>;
    async fn insert_image(
        &self,
        ingredient_id: i64,
        s3_key: &str,
        source_url: Option<&str>,
    ) -> anyhow::Result<IngredientImage>;

    async fn author_contact(&self, username: &str) -> anyhow::Result<Option<AuthorContact>>;
}

/// Language for a source language tag, falling back to the default language.
pub async fn load_language(store: &dyn IngredientStore, tag: &str) -> anyhow::Result<Language> {
    let short_name = tag.trim().to_lowercase();
    if let Some(language) = store.language(&short_name).await? {
        return Ok(language);
    }
    store
        .language(DEFAULT_LANGUAGE)
        .await?
        .with_context(|| format!("default language {DEFAULT_LANGUAGE} missing"))
}

const INGREDIENT_COLUMNS: &str = r#"
    id, uuid, language_id, name, common_name, brand, energy, protein, carbohydrates,
    carbohydrates_sugar, fat, fat_saturated, fibres, sodium, code, source_name,
    source_url, last_imported, license_author, status, created, last_update
"#;

#[derive(Clone)]
pub struct PgIngredientStore {
    db: PgPool,
}

impl PgIngredientStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl IngredientStore for PgIngredientStore {
    async fn get(&self, id: i64) -> anyhow::Result<Option<Ingredient>> {
        let sql = format!("SELECT {INGREDIENT_COLUMNS} FROM ingredients WHERE id = $1");
        sqlx::query_as::<_, Ingredient>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .context("get ingredient")
    }

    async fn find_by_code(&self, code: &str) -> anyhow::Result<Option<Ingredient>> {
        let sql = format!(
            "SELECT {INGREDIENT_COLUMNS} FROM ingredients WHERE code = $1 ORDER BY id LIMIT 1"
        );
        sqlx::query_as::<_, Ingredient>(&sql)
            .bind(code)
            .fetch_optional(&self.db)
            .await
            .context("find ingredient by code")
    }

    async fn insert(&self, d: &IngredientData) -> anyhow::Result<Ingredient> {
        let sql = format!(
            r#"
            INSERT INTO ingredients (
                uuid, language_id, name, common_name, brand, energy, protein, carbohydrates,
                carbohydrates_sugar, fat, fat_saturated, fibres, sodium, code, source_name,
                source_url, last_imported, license_author, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
            RETURNING {INGREDIENT_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Ingredient>(&sql)
            .bind(Uuid::new_v4())
            .bind(d.language_id)
            .bind(&d.name)
            .bind(&d.common_name)
            .bind(&d.brand)
            .bind(d.energy)
            .bind(d.protein)
            .bind(d.carbohydrates)
            .bind(d.carbohydrates_sugar)
            .bind(d.fat)
            .bind(d.fat_saturated)
            .bind(d.fibres)
            .bind(d.sodium)
            .bind(&d.code)
            .bind(&d.source_name)
            .bind(&d.source_url)
            .bind(d.last_imported)
            .bind(&d.license_author)
            .bind(d.status)
            .fetch_one(&self.db)
            .await
            .context("insert ingredient")
    }

    async fn update(&self, id: i64, d: &IngredientData) -> anyhow::Result<Option<Ingredient>> {
        let sql = format!(
            r#"
            UPDATE ingredients SET
                language_id = $2, name = $3, common_name = $4, brand = $5, energy = $6,
                protein = $7, carbohydrates = $8, carbohydrates_sugar = $9, fat = $10,
                fat_saturated = $11, fibres = $12, sodium = $13, code = $14, source_name = $15,
                source_url = $16, last_imported = $17, license_author = $18, status = $19,
                last_update = now()
            WHERE id = $1
            RETURNING {INGREDIENT_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Ingredient>(&sql)
            .bind(id)
            .bind(d.language_id)
            .bind(&d.name)
            .bind(&d.common_name)
            .bind(&d.brand)
            .bind(d.energy)
            .bind(d.protein)
            .bind(d.carbohydrates)
            .bind(d.carbohydrates_sugar)
            .bind(d.fat)
            .bind(d.fat_saturated)
            .bind(d.fibres)
            .bind(d.sodium)
            .bind(&d.code)
            .bind(&d.source_name)
            .bind(&d.source_url)
            .bind(d.last_imported)
            .bind(&d.license_author)
            .bind(d.status)
            .fetch_optional(&self.db)
            .await
            .context("update ingredient")
    }

    async fn language(&self, short_name: &str) -> anyhow::Result<Option<Language>> {
        sqlx::query_as::<_, Language>(
            "SELECT id, short_name, full_name FROM languages WHERE short_name = $1",
        )
        .bind(short_name)
        .fetch_optional(&self.db)
        .await
        .context("load language")
    }

    async fn image_for(&self, ingredient_id: i64) -> anyhow::Result<Option<IngredientImage>> {
        sqlx::query_as::<_, IngredientImage>(
            r#"
            SELECT id, ingredient_id, s3_key, source_url, created
              FROM ingredient_images
             WHERE ingredient_id = $1
            "#,
        )
        .bind(ingredient_id)
        .fetch_optional(&self.db)
        .await
        .context("get ingredient image")
    }

    async fn insert_image(
        &self,
        ingredient_id: i64,
        s3_key: &str,
        source_url: Option<&str>,
    ) -> anyhow::Result<IngredientImage> {
        sqlx::query_as::<_, IngredientImage>(
            r#"
            INSERT INTO ingredient_images (id, ingredient_id, s3_key, source_url)
            VALUES ($1, $2, $3, $4)
            RETURNING id, ingredient_id, s3_key, source_url, created
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(ingredient_id)
        .bind(s3_key)
        .bind(source_url)
        .fetch_one(&self.db)
        .await
        .context("insert ingredient image")
    }

    async fn author_contact(&self, username: &str) -> anyhow::Result<Option<AuthorContact>> {
        sqlx::query_as::<_, AuthorContact>(
            "SELECT email, notification_language FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.db)
        .await
        .context("load author contact")
    }
}
