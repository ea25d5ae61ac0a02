use sqlx::PgPool;
use uuid::Uuid;

use super::dashboard::{
    NutritionPlan, PlanItem, Schedule, ScheduleStep, WeightEntry, Workout, WorkoutDay,
};

pub async fn active_schedule(db: &PgPool, user_id: Uuid) -> anyhow::Result<Option<Schedule>> {
    let row = sqlx::query_as::<_, Schedule>(
        r#"
        SELECT id, name, start_date, is_loop
        FROM schedules
        WHERE user_id = $1 AND is_active
        ORDER BY start_date DESC
        LIMIT 1
    "#,
    )
    .bind(user_id)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

pub async fn schedule_steps(db: &PgPool, schedule_id: i64) -> anyhow::Result<Vec<ScheduleStep>> {
    let rows = sqlx::query_as::<_, ScheduleStep>(
        r#"
        SELECT workout_id, duration_weeks
        FROM schedule_steps
        WHERE schedule_id = $1
        ORDER BY step_order, id
    "#,
    )
    .bind(schedule_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn workout(db: &PgPool, workout_id: i64) -> anyhow::Result<Option<Workout>> {
    let row = sqlx::query_as::<_, Workout>(
        r#"
        SELECT id, name, creation_date
        FROM workouts
        WHERE id = $1
    "#,
    )
    .bind(workout_id)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

pub async fn latest_workout(db: &PgPool, user_id: Uuid) -> anyhow::Result<Option<Workout>> {
    let row = sqlx::query_as::<_, Workout>(
        r#"
        SELECT id, name, creation_date
        FROM workouts
        WHERE user_id = $1
        ORDER BY creation_date DESC, id DESC
        LIMIT 1
    "#,
    )
    .bind(user_id)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

pub async fn workout_days(db: &PgPool, workout_id: i64) -> anyhow::Result<Vec<WorkoutDay>> {
    let rows = sqlx::query_as::<_, WorkoutDay>(
        r#"
        SELECT w.weekday, d.description
        FROM workout_days d
        JOIN workout_day_weekdays w ON w.day_id = d.id
        WHERE d.workout_id = $1
        ORDER BY d.id, w.weekday
    "#,
    )
    .bind(workout_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn latest_plan(db: &PgPool, user_id: Uuid) -> anyhow::Result<Option<NutritionPlan>> {
    let row = sqlx::query_as::<_, NutritionPlan>(
        r#"
        SELECT id, description, creation_date
        FROM nutrition_plans
        WHERE user_id = $1
        ORDER BY creation_date DESC, id DESC
        LIMIT 1
    "#,
    )
    .bind(user_id)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

pub async fn plan_items(db: &PgPool, plan_id: i64) -> anyhow::Result<Vec<PlanItem>> {
    let rows = sqlx::query_as::<_, PlanItem>(
        r#"
        SELECT it.amount_grams, i.energy, i.protein, i.carbohydrates,
               i.carbohydrates_sugar, i.fat, i.fat_saturated, i.fibres, i.sodium
        FROM plan_meal_items it
        JOIN plan_meals m ON m.id = it.meal_id
        JOIN ingredients i ON i.id = it.ingredient_id
        WHERE m.plan_id = $1
        ORDER BY m.meal_order, it.id
    "#,
    )
    .bind(plan_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

/// Newest first.
pub async fn weight_entries(
    db: &PgPool,
    user_id: Uuid,
    limit: i64,
) -> anyhow::Result<Vec<WeightEntry>> {
    let rows = sqlx::query_as::<_, WeightEntry>(
        r#"
        SELECT date, weight
        FROM weight_entries
        WHERE user_id = $1
        ORDER BY date DESC
        LIMIT $2
    "#,
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(db)
    .await?;
    Ok(rows)
}
