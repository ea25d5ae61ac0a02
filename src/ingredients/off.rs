//! Open Food Facts lookup by barcode.
//!
//! The product payload is loosely structured JSON; extraction reads the keys
//! it needs and treats any missing required key as "no result".

use anyhow::Context;
use async_trait::async_trait;
use serde_json::Value;
use time::OffsetDateTime;
use tracing::debug;

use super::model::{IngredientData, Language, SubmissionStatus, KJ_PER_KCAL, OPEN_FOOD_FACTS};

/// `status` value of a product lookup that found something.
pub const OFF_SEARCH_PRODUCT_FOUND: i64 = 1;

/// Column width of the imported text fields.
const MAX_TEXT_LEN: usize = 200;

#[async_trait]
pub trait ProductDatabase: Send + Sync {
    /// Raw lookup response, `{"status": .., "product": {..}}`.
    async fn get_product(&self, code: &str) -> anyhow::Result<Value>;

    /// Downloads a product image.
    async fn fetch_image(&self, url: &str) -> anyhow::Result<(bytes::Bytes, String)>;
}

#[derive(Clone)]
pub struct OpenFoodFactsClient {
    http: reqwest::Client,
    base_url: String,
}

impl OpenFoodFactsClient {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("nutriboard/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("build http client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ProductDatabase for OpenFoodFactsClient {
    async fn get_product(&self, code: &str) -> anyhow::Result<Value> {
        let url = format!("{}/api/v2/product/{}.json", self.base_url, code);
        debug!(%url, "open food facts lookup");
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("GET {url}"))?;

        // unknown products come back as 404 with a regular status body
        let body = response
            .json::<Value>()
            .await
            .with_context(|| format!("decode {url}"))?;
        Ok(body)
    }

    async fn fetch_image(&self, url: &str) -> anyhow::Result<(bytes::Bytes, String)> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .with_context(|| format!("GET {url}"))?;
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("image/jpeg")
            .to_string();
        let body = response.bytes().await.context("read image body")?;
        Ok((body, content_type))
    }
}

/// The product object of a lookup response, if the product was found.
pub fn found_product(response: &Value) -> Option<&Value> {
    let status = response.get("status").and_then(Value::as_i64)?;
    if status != OFF_SEARCH_PRODUCT_FOUND {
        return None;
    }
    response.get("product").filter(|p| p.is_object())
}

/// Builds ingredient data from an Open Food Facts product. Returns `None`
/// when a required key is missing or the code, name or common name does not
/// fit its column. An oversized brand is dropped.
pub fn extract_info_from_off(product: &Value, language: &Language) -> Option<IngredientData> {
    let nutriments = product.get("nutriments")?;
    let code = fitting(text(product, "code")?)?;
    let name = match text(product, "product_name") {
        Some(name) => fitting(name)?,
        None => String::new(),
    };
    let common_name = match text(product, "generic_name") {
        Some(common_name) => Some(fitting(common_name)?),
        None => None,
    };

    let energy = match number(nutriments, "energy-kcal_100g") {
        Some(kcal) => kcal,
        None => number(nutriments, "energy-kj_100g")? / KJ_PER_KCAL,
    };
    let protein = number(nutriments, "proteins_100g")?;
    let carbohydrates = number(nutriments, "carbohydrates_100g")?;
    let fat = number(nutriments, "fat_100g")?;

    let authors = product
        .get("editors_tags")
        .and_then(Value::as_array)
        .map(|tags| {
            tags.iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        })
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "open food facts".to_string());

    Some(IngredientData {
        language_id: language.id,
        name,
        common_name,
        brand: text(product, "brands").and_then(fitting),
        energy: energy.round() as i32,
        protein,
        carbohydrates,
        carbohydrates_sugar: number(nutriments, "sugars_100g"),
        fat,
        fat_saturated: number(nutriments, "saturated-fat_100g"),
        fibres: number(nutriments, "fiber_100g"),
        sodium: number(nutriments, "sodium_100g"),
        source_url: Some(format!(
            "https://world.openfoodfacts.org/api/v2/product/{code}.json"
        )),
        code: Some(code),
        source_name: Some(OPEN_FOOD_FACTS.to_string()),
        last_imported: Some(OffsetDateTime::now_utc()),
        license_author: Some(authors),
        status: SubmissionStatus::Accepted,
    })
}

/// Language tag of a product, `lang` key.
pub fn product_language(product: &Value) -> Option<&str> {
    product.get("lang").and_then(Value::as_str)
}

pub fn image_url(product: &Value) -> Option<&str> {
    product
        .get("image_front_url")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

fn text(value: &Value, key: &str) -> Option<String> {
    let raw = value.get(key)?;
    let s = match raw {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!s.is_empty()).then_some(s)
}

fn fitting(s: String) -> Option<String> {
    if s.chars().count() > MAX_TEXT_LEN {
        debug!(len = s.chars().count(), "text too long for column");
        return None;
    }
    Some(s)
}

// numbers sometimes arrive as strings
fn number(value: &Value, key: &str) -> Option<f64> {
    match value.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
