use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

pub const OPEN_FOOD_FACTS: &str = "Open Food Facts";
pub const KJ_PER_KCAL: f64 = 4.184;

/// Review state of user submitted data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[repr(i16)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    Pending = 1,
    Accepted = 2,
    Declined = 3,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Language {
    pub id: i64,
    pub short_name: String,
    pub full_name: String,
}

/// An ingredient, with approximate nutrition values per 100g of product.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Ingredient {
    pub id: i64,
    /// Identifies the ingredient across installations.
    pub uuid: Uuid,
    pub language_id: i64,
    pub name: String,
    pub common_name: Option<String>,
    pub brand: Option<String>,
    /// kcal
    pub energy: i32,
    pub protein: f64,
    pub carbohydrates: f64,
    pub carbohydrates_sugar: Option<f64>,
    pub fat: f64,
    pub fat_saturated: Option<f64>,
    pub fibres: Option<f64>,
    pub sodium: Option<f64>,
    /// Id in the source database, e.g. a barcode
    pub code: Option<String>,
    pub source_name: Option<String>,
    pub source_url: Option<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_imported: Option<OffsetDateTime>,
    pub license_author: Option<String>,
    pub status: SubmissionStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub last_update: OffsetDateTime,
}

/// Validated, persistable field set of an ingredient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngredientData {
    pub language_id: i64,
    pub name: String,
    pub common_name: Option<String>,
    pub brand: Option<String>,
    pub energy: i32,
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
    pub last_imported: Option<OffsetDateTime>,
    pub license_author: Option<String>,
    pub status: SubmissionStatus,
}

impl Ingredient {
    pub fn data(&self) -> IngredientData {
        IngredientData {
            language_id: self.language_id,
            name: self.name.clone(),
            common_name: self.common_name.clone(),
            brand: self.brand.clone(),
            energy: self.energy,
            protein: self.protein,
            carbohydrates: self.carbohydrates,
            carbohydrates_sugar: self.carbohydrates_sugar,
            fat: self.fat,
            fat_saturated: self.fat_saturated,
            fibres: self.fibres,
            sodium: self.sodium,
            code: self.code.clone(),
            source_name: self.source_name.clone(),
            source_url: self.source_url.clone(),
            last_imported: self.last_imported,
            license_author: self.license_author.clone(),
            status: self.status,
        }
    }

    /// Energy in kJ rounded to two places, 0 when no energy is set.
    pub fn energy_kilojoule(&self) -> f64 {
        if self.energy == 0 {
            return 0.0;
        }
        (f64::from(self.energy) * KJ_PER_KCAL * 100.0).round() / 100.0
    }

    pub fn off_link(&self) -> Option<String> {
        if self.source_name.as_deref() != Some(OPEN_FOOD_FACTS) {
            return None;
        }
        self.code
            .as_deref()
            .map(|code| format!("https://world.openfoodfacts.org/product/{code}/"))
    }

    /// Canonical path of the ingredient. Names made only of non-ascii
    /// characters have an empty slug, those get the id-only path.
    pub fn absolute_url(&self) -> String {
        let slug = slugify(&self.name);
        if slug.is_empty() {
            format!("/ingredients/{}", self.id)
        } else {
            format!("/ingredients/{}/{}", self.id, slug)
        }
    }
}

/// Compares two ingredients on their nutritional values and name, not on identity.
pub fn values_equal(a: &Ingredient, b: &Ingredient) -> bool {
    a.carbohydrates == b.carbohydrates
        && a.carbohydrates_sugar == b.carbohydrates_sugar
        && a.created == b.created
        && a.energy == b.energy
        && a.fat == b.fat
        && a.fat_saturated == b.fat_saturated
        && a.fibres == b.fibres
        && a.name == b.name
        && a.protein == b.protein
        && a.sodium == b.sodium
}

pub fn slugify(value: &str) -> String {
    lazy_static! {
        static ref NON_WORD: Regex = Regex::new(r"[^a-z0-9\s-]").unwrap();
        static ref SEPARATORS: Regex = Regex::new(r"[-\s]+").unwrap();
    }
    let ascii: String = value
        .chars()
        .filter(char::is_ascii)
        .collect::<String>()
        .to_lowercase();
    let cleaned = NON_WORD.replace_all(&ascii, "");
    SEPARATORS
        .replace_all(cleaned.trim(), "-")
        .trim_matches('-')
        .to_string()
}
