use axum::{
    extract::{Host, Path, State},
    http::{header, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use super::{
    dto::{ImageResponse, IngredientResponse},
    model::SubmissionStatus,
    service::IngredientService,
    validation::IngredientDraft,
};
use crate::{
    auth::extractors::{CurrentUser, MaybeUser},
    error::AppError,
    state::AppState,
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/ingredients/:id", get(get_ingredient))
        .route("/ingredients/:id/image", get(get_image))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/ingredients", post(create_ingredient))
        .route("/ingredients/:id", axum::routing::put(update_ingredient))
        .route("/ingredients/:id/accept", post(accept_ingredient))
        .route("/ingredients/:id/decline", post(decline_ingredient))
        .route("/barcode/:code", post(import_by_barcode))
}

#[instrument(skip(service))]
pub async fn get_ingredient(
    State(service): State<IngredientService>,
    Path(id): Path<i64>,
) -> Result<Json<IngredientResponse>, AppError> {
    let ingredient = service.get_cached(id).await?;
    Ok(Json(ingredient.into()))
}

#[instrument(skip(service, user, draft))]
pub async fn create_ingredient(
    State(service): State<IngredientService>,
    CurrentUser(user): CurrentUser,
    Host(host): Host,
    Json(draft): Json<IngredientDraft>,
) -> Result<(StatusCode, HeaderMap, Json<IngredientResponse>), AppError> {
    let ingredient = service.create(&draft, &user, &host).await?;

    let mut headers = HeaderMap::new();
    if let Ok(location) = format!("/api/v1/ingredients/{}", ingredient.id).parse() {
        headers.insert(header::LOCATION, location);
    }
    Ok((StatusCode::CREATED, headers, Json(ingredient.into())))
}

#[instrument(skip(service, user, draft))]
pub async fn update_ingredient(
    State(service): State<IngredientService>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Json(draft): Json<IngredientDraft>,
) -> Result<Json<IngredientResponse>, AppError> {
    let ingredient = service.update(id, &draft, &user).await?;
    Ok(Json(ingredient.into()))
}

#[instrument(skip(service, user))]
pub async fn accept_ingredient(
    State(service): State<IngredientService>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<IngredientResponse>, AppError> {
    let ingredient = service
        .set_status(id, SubmissionStatus::Accepted, &user)
        .await?;
    Ok(Json(ingredient.into()))
}

#[instrument(skip(service, user))]
pub async fn decline_ingredient(
    State(service): State<IngredientService>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<IngredientResponse>, AppError> {
    let ingredient = service
        .set_status(id, SubmissionStatus::Declined, &user)
        .await?;
    Ok(Json(ingredient.into()))
}

/// Local ingredient for a barcode, imported from Open Food Facts if needed.
#[instrument(skip(service, _user))]
pub async fn import_by_barcode(
    State(service): State<IngredientService>,
    _user: CurrentUser,
    Path(code): Path<String>,
) -> Result<Json<IngredientResponse>, AppError> {
    let code = code.trim();
    if code.is_empty() || !code.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::BadRequest("barcode must be numeric".into()));
    }
    match service.find_or_import(code).await? {
        Some(ingredient) => Ok(Json(ingredient.into())),
        None => Err(AppError::NotFound),
    }
}

#[instrument(skip(service, user))]
pub async fn get_image(
    State(service): State<IngredientService>,
    MaybeUser(user): MaybeUser,
    Path(id): Path<i64>,
) -> Result<Json<ImageResponse>, AppError> {
    let url = service.get_image(id, user.as_ref()).await?;
    Ok(Json(ImageResponse { url }))
}
