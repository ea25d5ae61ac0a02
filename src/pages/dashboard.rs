//! Aggregation behind the dashboard page: current workout, latest nutrition
//! plan with its values, and recent body weight.

use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::{Date, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use super::repo;
use crate::ingredients::validation::{
    ENERGY_FACTOR_CARBOHYDRATES, ENERGY_FACTOR_FAT, ENERGY_FACTOR_PROTEIN,
};

pub const DAYS_OF_WEEK: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];
pub const REST_DAY: &str = "Rest day";
pub const LAST_WEIGHT_ENTRIES: usize = 5;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Workout {
    pub id: i64,
    pub name: String,
    pub creation_date: Date,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Schedule {
    pub id: i64,
    pub name: String,
    pub start_date: Date,
    pub is_loop: bool,
}

#[derive(Debug, Clone, FromRow)]
pub struct ScheduleStep {
    pub workout_id: i64,
    pub duration_weeks: i32,
}

/// A workout day and one weekday (1 = Monday) it is trained on.
#[derive(Debug, Clone, FromRow)]
pub struct WorkoutDay {
    pub weekday: i16,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct NutritionPlan {
    pub id: i64,
    pub description: String,
    #[serde(with = "time::serde::rfc3339")]
    pub creation_date: OffsetDateTime,
}

/// One ingredient of a plan meal with the planned amount.
#[derive(Debug, Clone, FromRow)]
pub struct PlanItem {
    pub amount_grams: f64,
    pub energy: i32,
    pub protein: f64,
    pub carbohydrates: f64,
    pub carbohydrates_sugar: Option<f64>,
    pub fat: f64,
    pub fat_saturated: Option<f64>,
    pub fibres: Option<f64>,
    pub sodium: Option<f64>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct WeightEntry {
    pub date: Date,
    pub weight: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WeightSummary {
    pub date: Date,
    pub weight: f64,
    /// Change against the next older entry.
    pub weight_diff: Option<f64>,
    pub day_diff: Option<i64>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WeekdayRow {
    pub day_of_week: &'static str,
    pub description: String,
    pub has_workout: bool,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct NutritionTotals {
    pub energy: f64,
    pub protein: f64,
    pub carbohydrates: f64,
    pub carbohydrates_sugar: f64,
    pub fat: f64,
    pub fat_saturated: f64,
    pub fibres: f64,
    pub sodium: f64,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct MacroValues {
    pub protein: f64,
    pub carbohydrates: f64,
    pub fat: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NutritionalValues {
    pub total: NutritionTotals,
    /// Share of the total energy.
    pub percent: MacroValues,
    /// Grams per kg of the latest body weight.
    pub per_kg: Option<MacroValues>,
}

#[derive(Debug, Serialize)]
pub struct Dashboard {
    pub current_workout: Option<Workout>,
    pub schedule: Option<Schedule>,
    pub plan: Option<NutritionPlan>,
    pub weight: Option<WeightEntry>,
    pub last_weight_entries: Vec<WeightSummary>,
    pub weekdays: Vec<WeekdayRow>,
    pub nutritional_info: Option<NutritionalValues>,
}

/// Index of the schedule step running on `today`. Each step lasts its
/// duration in weeks, counted from `start`. Loop schedules start over after
/// the last step; other schedules stay on their last step.
pub fn current_step_index(
    start: Date,
    today: Date,
    durations: &[i32],
    is_loop: bool,
) -> Option<usize> {
    if durations.is_empty() {
        return None;
    }
    if today < start {
        return Some(0);
    }

    let total_weeks: i64 = durations.iter().map(|d| i64::from((*d).max(1))).sum();
    let mut week = (today - start).whole_days() / 7;
    if week >= total_weeks {
        if !is_loop {
            return Some(durations.len() - 1);
        }
        week %= total_weeks;
    }

    let mut end = 0i64;
    for (index, duration) in durations.iter().enumerate() {
        end += i64::from((*duration).max(1));
        if week < end {
            return Some(index);
        }
    }
    Some(durations.len() - 1)
}

/// `entries` newest first; only the first five are summarised.
pub fn last_entries(entries: &[WeightEntry]) -> Vec<WeightSummary> {
    let recent = &entries[..entries.len().min(LAST_WEIGHT_ENTRIES)];
    recent
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let previous = recent.get(index + 1);
            WeightSummary {
                date: entry.date,
                weight: entry.weight,
                weight_diff: previous.map(|p| entry.weight - p.weight),
                day_diff: previous.map(|p| (entry.date - p.date).whole_days()),
            }
        })
        .collect()
}

/// Seven rows, Monday first. Days without a workout day are rest days.
pub fn weekday_rows(days: &[WorkoutDay]) -> Vec<WeekdayRow> {
    let mut used: [Option<&str>; 7] = [None; 7];
    for day in days {
        if (1..=7).contains(&day.weekday) {
            used[(day.weekday - 1) as usize] = Some(day.description.as_str());
        }
    }

    DAYS_OF_WEEK
        .iter()
        .zip(used)
        .map(|(name, description)| match description {
            Some(description) => WeekdayRow {
                day_of_week: name,
                description: description.to_string(),
                has_workout: true,
            },
            None => WeekdayRow {
                day_of_week: name,
                description: REST_DAY.to_string(),
                has_workout: false,
            },
        })
        .collect()
}

pub fn nutritional_values(items: &[PlanItem], body_weight: Option<f64>) -> NutritionalValues {
    let mut total = NutritionTotals::default();
    for item in items {
        let factor = item.amount_grams / 100.0;
        total.energy += f64::from(item.energy) * factor;
        total.protein += item.protein * factor;
        total.carbohydrates += item.carbohydrates * factor;
        total.carbohydrates_sugar += item.carbohydrates_sugar.unwrap_or(0.0) * factor;
        total.fat += item.fat * factor;
        total.fat_saturated += item.fat_saturated.unwrap_or(0.0) * factor;
        total.fibres += item.fibres.unwrap_or(0.0) * factor;
        total.sodium += item.sodium.unwrap_or(0.0) * factor;
    }

    let percent = if total.energy > 0.0 {
        MacroValues {
            protein: total.protein * ENERGY_FACTOR_PROTEIN / total.energy * 100.0,
            carbohydrates: total.carbohydrates * ENERGY_FACTOR_CARBOHYDRATES / total.energy
                * 100.0,
            fat: total.fat * ENERGY_FACTOR_FAT / total.energy * 100.0,
        }
    } else {
        MacroValues::default()
    };

    let per_kg = body_weight.filter(|w| *w > 0.0).map(|w| MacroValues {
        protein: total.protein / w,
        carbohydrates: total.carbohydrates / w,
        fat: total.fat / w,
    });

    NutritionalValues {
        total,
        percent,
        per_kg,
    }
}

/// Everything the dashboard shows for `user_id` on `today`.
pub async fn load(db: &PgPool, user_id: Uuid, today: Date) -> anyhow::Result<Dashboard> {
    let (current_workout, schedule) = match repo::active_schedule(db, user_id).await? {
        Some(schedule) => {
            let steps = repo::schedule_steps(db, schedule.id).await?;
            let durations: Vec<i32> = steps.iter().map(|s| s.duration_weeks).collect();
            let workout = match current_step_index(
                schedule.start_date,
                today,
                &durations,
                schedule.is_loop,
            ) {
                Some(index) => repo::workout(db, steps[index].workout_id).await?,
                None => None,
            };
            (workout, Some(schedule))
        }
        None => (repo::latest_workout(db, user_id).await?, None),
    };

    let weekdays = match &current_workout {
        Some(workout) => weekday_rows(&repo::workout_days(db, workout.id).await?),
        None => weekday_rows(&[]),
    };

    let entries = repo::weight_entries(db, user_id, LAST_WEIGHT_ENTRIES as i64).await?;
    let weight = entries.first().cloned();

    let plan = repo::latest_plan(db, user_id).await?;
    let nutritional_info = match &plan {
        Some(plan) => {
            let items = repo::plan_items(db, plan.id).await?;
            Some(nutritional_values(&items, weight.as_ref().map(|w| w.weight)))
        }
        None => None,
    };

    debug!(%user_id, has_plan = plan.is_some(), "dashboard loaded");
    Ok(Dashboard {
        current_workout,
        schedule,
        plan,
        weight,
        last_weight_entries: last_entries(&entries),
        weekdays,
        nutritional_info,
    })
}
