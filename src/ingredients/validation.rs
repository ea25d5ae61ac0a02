use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::model::{IngredientData, SubmissionStatus};

/// How much the energy calculated from protein, carbohydrates and fat may
/// deviate from the declared energy, in percent.
pub const ENERGY_APPROXIMATION: u32 = 15;

pub const ENERGY_FACTOR_PROTEIN: f64 = 4.0;
pub const ENERGY_FACTOR_CARBOHYDRATES: f64 = 4.0;
pub const ENERGY_FACTOR_FAT: f64 = 9.0;

const NAME_MIN_LEN: usize = 3;
const NAME_MAX_LEN: usize = 200;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error(
        "The total energy ({energy}kcal) is not the approximate sum of the energy provided \
         by protein, carbohydrates and fat ({}kcal +/-{tolerance}%)",
        display_kcal(.calculated)
    )]
    EnergyMismatch {
        energy: i32,
        calculated: f64,
        tolerance: u32,
    },

    #[error("{field}: {message}")]
    Field {
        field: &'static str,
        message: String,
    },
}

/// Two decimal places, without float noise like `1.2000000000000002`.
fn display_kcal(value: &f64) -> f64 {
    (value * 100.0).round() / 100.0
}

impl ValidationError {
    fn field(field: &'static str, message: impl Into<String>) -> Self {
        Self::Field {
            field,
            message: message.into(),
        }
    }
}

/// All problems found in one submission.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValidationErrors(pub Vec<ValidationError>);

impl ValidationErrors {
    pub fn messages(&self) -> Vec<String> {
        self.0.iter().map(ToString::to_string).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push(&mut self, error: ValidationError) {
        self.0.push(error);
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.messages().join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

impl From<ValidationError> for ValidationErrors {
    fn from(error: ValidationError) -> Self {
        Self(vec![error])
    }
}

/// Inputs of the energy sanity check. `None` means unknown.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnergyCheck {
    pub energy: Option<i32>,
    pub protein: Option<f64>,
    pub carbohydrates: Option<f64>,
    pub fat: Option<f64>,
}

impl EnergyCheck {
    /// kcal per 100g from macronutrients, unknown values count as zero.
    pub fn calculated(&self) -> f64 {
        self.protein.unwrap_or(0.0) * ENERGY_FACTOR_PROTEIN
            + self.carbohydrates.unwrap_or(0.0) * ENERGY_FACTOR_CARBOHYDRATES
            + self.fat.unwrap_or(0.0) * ENERGY_FACTOR_FAT
    }
}

/// Broad sanity check of the declared energy against protein (4kcal/g),
/// carbohydrates (4kcal/g) and fat (9kcal/g). Unknown energy is not checked.
pub fn check_energy(input: &EnergyCheck) -> Result<(), ValidationError> {
    let Some(energy) = input.energy else {
        return Ok(());
    };

    let calculated = input.calculated();
    let tolerance = f64::from(ENERGY_APPROXIMATION) / 100.0;
    let upper = f64::from(energy) * (1.0 + tolerance);
    let lower = f64::from(energy) * (1.0 - tolerance);

    if lower < calculated && calculated < upper {
        Ok(())
    } else {
        Err(ValidationError::EnergyMismatch {
            energy,
            calculated,
            tolerance: ENERGY_APPROXIMATION,
        })
    }
}

/// Submitted ingredient form. Every field may be missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngredientDraft {
    pub name: Option<String>,
    pub common_name: Option<String>,
    pub brand: Option<String>,
    pub energy: Option<i32>,
    pub protein: Option<f64>,
    pub carbohydrates: Option<f64>,
    pub carbohydrates_sugar: Option<f64>,
    pub fat: Option<f64>,
    pub fat_saturated: Option<f64>,
    pub fibres: Option<f64>,
    pub sodium: Option<f64>,
    pub license_author: Option<String>,
    pub source_url: Option<String>,
    /// Language tag such as `en`; the default language when missing.
    pub language: Option<String>,
}

impl IngredientDraft {
    pub fn energy_check(&self) -> EnergyCheck {
        EnergyCheck {
            energy: self.energy,
            protein: self.protein,
            carbohydrates: self.carbohydrates,
            fat: self.fat,
        }
    }

    /// Runs every field check plus the energy check and returns the data
    /// ready to be stored, in pending state. Nothing is trusted from a
    /// previous version of the record.
    pub fn clean(&self, language_id: i64) -> Result<IngredientData, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let name = self.name.as_deref().map(str::trim).unwrap_or_default();
        let name_len = name.chars().count();
        if name.is_empty() {
            errors.push(ValidationError::field("name", "This field is required."));
        } else if name_len < NAME_MIN_LEN {
            errors.push(ValidationError::field(
                "name",
                format!("Ensure this value has at least {NAME_MIN_LEN} characters."),
            ));
        } else if name_len > NAME_MAX_LEN {
            errors.push(ValidationError::field(
                "name",
                format!("Ensure this value has at most {NAME_MAX_LEN} characters."),
            ));
        }

        if let Some(energy) = self.energy {
            if energy < 0 {
                errors.push(ValidationError::field("energy", "Must not be negative."));
            }
        }

        let required = [
            ("energy", self.energy.map(f64::from)),
            ("protein", self.protein),
            ("carbohydrates", self.carbohydrates),
            ("fat", self.fat),
        ];
        for (field, value) in required {
            if value.is_none() {
                errors.push(ValidationError::field(field, "This field is required."));
            }
        }

        let per_100g = [
            ("protein", self.protein),
            ("carbohydrates", self.carbohydrates),
            ("carbohydrates_sugar", self.carbohydrates_sugar),
            ("fat", self.fat),
            ("fat_saturated", self.fat_saturated),
            ("fibres", self.fibres),
            ("sodium", self.sodium),
        ];
        for (field, value) in per_100g {
            if let Some(v) = value {
                if !(0.0..=100.0).contains(&v) {
                    errors.push(ValidationError::field(
                        field,
                        "Ensure this value is between 0 and 100.",
                    ));
                }
            }
        }

        if let Err(e) = check_energy(&self.energy_check()) {
            errors.push(e);
        }

        match (self.energy, self.protein, self.carbohydrates, self.fat) {
            (Some(energy), Some(protein), Some(carbohydrates), Some(fat)) if errors.is_empty() => {
                Ok(IngredientData {
                    language_id,
                    name: name.to_string(),
                    common_name: non_blank(&self.common_name),
                    brand: non_blank(&self.brand),
                    energy,
                    protein,
                    carbohydrates,
                    carbohydrates_sugar: self.carbohydrates_sugar,
                    fat,
                    fat_saturated: self.fat_saturated,
                    fibres: self.fibres,
                    sodium: self.sodium,
                    code: None,
                    source_name: None,
                    source_url: non_blank(&self.source_url),
                    last_imported: None,
                    license_author: non_blank(&self.license_author),
                    status: SubmissionStatus::Pending,
                })
            }
            _ => Err(errors),
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn check(energy: Option<i32>, protein: f64, carbohydrates: f64, fat: f64) -> EnergyCheck {
        EnergyCheck {
            energy,
            protein: Some(protein),
            carbohydrates: Some(carbohydrates),
            fat: Some(fat),
        }
    }

    fn draft() -> IngredientDraft {
        IngredientDraft {
            name: Some("Oat flakes".into()),
            energy: Some(370),
            protein: Some(13.5),
            carbohydrates: Some(58.7),
            fat: Some(7.0),
            ..Default::default()
        }
    }

    #[test]
    fn declared_energy_too_high_fails_with_message() {
        let err = check_energy(&check(Some(100), 5.0, 10.0, 2.0)).unwrap_err();
        assert_eq!(
            err,
            ValidationError::EnergyMismatch {
                energy: 100,
                calculated: 78.0,
                tolerance: 15
            }
        );
        let msg = err.to_string();
        assert!(msg.contains("(100kcal)"), "{msg}");
        assert!(msg.contains("(78kcal +/-15%)"), "{msg}");
    }

    #[test]
    fn message_rounds_calculated_energy() {
        let err = check_energy(&check(Some(5000), 0.1, 0.2, 0.0)).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("(1.2kcal +/-15%)"), "{msg}");
    }

    #[test]
    fn energy_within_band_passes() {
        assert!(check_energy(&check(Some(80), 5.0, 10.0, 2.0)).is_ok());
    }

    #[test]
    fn unknown_energy_is_not_checked() {
        assert!(check_energy(&check(None, 50.0, 50.0, 50.0)).is_ok());
    }

    #[test]
    fn unknown_macros_count_as_zero() {
        let input = EnergyCheck {
            energy: Some(90),
            fat: Some(10.0),
            ..Default::default()
        };
        assert_eq!(input.calculated(), 90.0);
        assert!(check_energy(&input).is_ok());
    }

    #[test]
    fn zero_energy_always_fails() {
        assert!(check_energy(&check(Some(0), 1.0, 0.0, 0.0)).is_err());
        assert!(check_energy(&check(Some(0), 0.0, 0.0, 0.0)).is_err());
    }

    #[test]
    fn clean_accepts_plausible_draft() {
        let data = draft().clean(1).unwrap();
        assert_eq!(data.name, "Oat flakes");
        assert_eq!(data.language_id, 1);
        assert_eq!(data.status, SubmissionStatus::Pending);
    }

    #[test]
    fn clean_collects_all_errors() {
        let bad = IngredientDraft {
            name: Some("ab".into()),
            energy: Some(100),
            protein: Some(120.0),
            carbohydrates: None,
            fat: Some(1.0),
            ..Default::default()
        };
        let errors = bad.clean(1).unwrap_err();
        let messages = errors.messages();
        assert!(messages.iter().any(|m| m.starts_with("name:")));
        assert!(messages.iter().any(|m| m == "carbohydrates: This field is required."));
        assert!(messages
            .iter()
            .any(|m| m == "protein: Ensure this value is between 0 and 100."));
        assert!(errors
            .0
            .iter()
            .any(|e| matches!(e, ValidationError::EnergyMismatch { .. })));
    }

    #[test]
    fn clean_rejects_energy_mismatch_alone() {
        let mut d = draft();
        d.energy = Some(900);
        let errors = d.clean(1).unwrap_err();
        assert_eq!(errors.0.len(), 1);
    }

    #[test]
    fn clean_trims_optional_text() {
        let mut d = draft();
        d.brand = Some("   ".into());
        d.common_name = Some(" oats ".into());
        let data = d.clean(1).unwrap();
        assert_eq!(data.brand, None);
        assert_eq!(data.common_name.as_deref(), Some("oats"));
    }

    proptest! {
        #[test]
        fn passes_iff_within_band(
            energy in proptest::option::of(0i32..1000),
            protein in 0.0f64..100.0,
            carbohydrates in 0.0f64..100.0,
            fat in 0.0f64..100.0,
        ) {
            let input = check(energy, protein, carbohydrates, fat);
            let computed = 4.0 * protein + 4.0 * carbohydrates + 9.0 * fat;
            let expected = match energy {
                None => true,
                Some(e) => {
                    let e = f64::from(e);
                    e * (1.0 - 0.15) < computed && computed < e * (1.0 + 0.15)
                }
            };
            prop_assert_eq!(check_energy(&input).is_ok(), expected);
        }

        #[test]
        fn zero_energy_with_positive_macro_fails(protein in 0.001f64..100.0) {
            prop_assert!(check_energy(&check(Some(0), protein, 0.0, 0.0)).is_err());
        }
    }
}
