use axum::{
    extract::State,
    response::Redirect,
    routing::get,
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{info, instrument};

use super::{
    dashboard::{self, Dashboard},
    feedback::{
        render_message, FeedbackForm, FeedbackInitial, FeedbackSent, FEEDBACK_REDIRECT,
        FEEDBACK_SENT, FEEDBACK_SUBJECT,
    },
};
use crate::{
    auth::extractors::{CurrentUser, MaybeUser},
    error::AppError,
    mail::{EmailMessage, Recipients},
    state::AppState,
};

pub const DASHBOARD_URL: &str = "/api/v1/dashboard";
pub const FEATURES_URL: &str = "/api/v1/software/features";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/dashboard", get(get_dashboard))
        .route("/feedback", get(feedback_form).post(send_feedback))
}

/// Signed-in users land on the dashboard. A missing, expired or malformed
/// token is treated as anonymous.
pub async fn index(user: Result<MaybeUser, AppError>) -> Redirect {
    match user {
        Ok(MaybeUser(Some(_))) => Redirect::to(DASHBOARD_URL),
        _ => Redirect::to(FEATURES_URL),
    }
}

#[instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn get_dashboard(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Dashboard>, AppError> {
    let today = OffsetDateTime::now_utc().date();
    let dashboard = dashboard::load(&state.db, user.user_id, today).await?;
    Ok(Json(dashboard))
}

pub async fn feedback_form(MaybeUser(user): MaybeUser) -> Json<FeedbackInitial> {
    Json(FeedbackInitial {
        contact: user.map(|u| u.email),
    })
}

#[instrument(skip(state, user, form))]
pub async fn send_feedback(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Json(form): Json<FeedbackForm>,
) -> Result<Json<FeedbackSent>, AppError> {
    let form = form.clean()?;
    let message = EmailMessage {
        subject: FEEDBACK_SUBJECT.into(),
        body: render_message(&form, user.as_ref()),
        from: state.config.mail.email_from.clone(),
        to: Recipients::Admins,
    };
    state.mailer.send(message).await?;
    info!(anonymous = user.is_none(), "feedback sent to admins");

    Ok(Json(FeedbackSent {
        message: FEEDBACK_SENT,
        redirect: FEEDBACK_REDIRECT,
    }))
}
