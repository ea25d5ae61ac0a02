use serde::Serialize;
use uuid::Uuid;

use super::model::{Ingredient, SubmissionStatus};

#[derive(Debug, Serialize)]
pub struct IngredientResponse {
    pub id: i64,
    pub uuid: Uuid,
    pub url: String,
    pub name: String,
    pub common_name: Option<String>,
    pub brand: Option<String>,
    pub energy: i32,
    pub energy_kilojoule: f64,
    pub protein: f64,
    pub carbohydrates: f64,
    pub carbohydrates_sugar: Option<f64>,
    pub fat: f64,
    pub fat_saturated: Option<f64>,
    pub fibres: Option<f64>,
    pub sodium: Option<f64>,
    pub code: Option<String>,
    pub source_name: Option<String>,
    pub source_url: Option<String>,
    pub off_link: Option<String>,
    pub license_author: Option<String>,
    pub status: SubmissionStatus,
}

impl From<Ingredient> for IngredientResponse {
    fn from(i: Ingredient) -> Self {
        Self {
            url: i.absolute_url(),
            energy_kilojoule: i.energy_kilojoule(),
            off_link: i.off_link(),
            id: i.id,
            uuid: i.uuid,
            name: i.name,
            common_name: i.common_name,
            brand: i.brand,
            energy: i.energy,
            protein: i.protein,
            carbohydrates: i.carbohydrates,
            carbohydrates_sugar: i.carbohydrates_sugar,
            fat: i.fat,
            fat_saturated: i.fat_saturated,
            fibres: i.fibres,
            sodium: i.sodium,
            code: i.code,
            source_name: i.source_name,
            source_url: i.source_url,
            license_author: i.license_author,
            status: i.status,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ImageResponse {
    /// `None` while the image is unknown or still being fetched.
    pub url: Option<String>,
}
