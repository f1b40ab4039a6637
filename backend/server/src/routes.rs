use std::sync::Arc;

use axum::{Json, extract::State as AxumState, http::StatusCode, response::IntoResponse};
use ledger::{
    auth::LoginResponse,
    ballot,
    models::{Nomination, NominationInput, NominationPatch, Person, ResultEntry, Role, Selection, Stats, StoredSelection, User},
    nominations::{self, ImportReport},
    results,
    users::{self, IssuedCredential},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::{
    error::AppError,
    extract::{AdminUser, AuthUser, PathParams, Payload},
    state::State,
};

type AppState = AxumState<Arc<State>>;

#[derive(Deserialize)]
pub struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    username: String,
    password: String,
    role: Role,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    current_password: String,
    new_password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupRequest {
    setup_key: String,
    admin_username: String,
    admin_password: String,
    #[serde(default)]
    committee: Vec<String>,
}

#[derive(Serialize)]
pub struct SetupResponse {
    message: &'static str,
    credentials: Vec<IssuedCredential>,
    warning: &'static str,
}

#[derive(Deserialize)]
pub struct BallotRequest {
    selections: Vec<Selection>,
}

#[derive(Deserialize)]
pub struct ImportRequest {
    nominations: Vec<Value>,
}

#[derive(Serialize)]
pub struct ImportResponse {
    message: &'static str,
    #[serde(flatten)]
    report: ImportReport,
}

pub async fn health_handler() -> impl IntoResponse {
    Json(json!({ "status": "ok", "message": "Hall of Fame Nominations API" }))
}

pub async fn login_handler(
    AxumState(state): AppState,
    Payload(payload): Payload<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let response = state
        .auth
        .login(&state.store, &payload.username, &payload.password)
        .await?;

    Ok(Json(response))
}

pub async fn register_handler(
    AxumState(state): AppState,
    AdminUser(admin): AdminUser,
    Payload(payload): Payload<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let id = users::create_user(&state.store, &payload.username, &payload.password, payload.role).await?;
    info!("{} registered {}", admin.username, payload.username);

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "User created successfully", "userId": id })),
    ))
}

pub async fn change_password_handler(
    AxumState(state): AppState,
    AuthUser(user): AuthUser,
    Payload(payload): Payload<ChangePasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    users::change_password(
        &state.store,
        user.id,
        &payload.current_password,
        &payload.new_password,
    )
    .await?;

    Ok(Json(json!({ "message": "Password changed successfully" })))
}

pub async fn setup_handler(
    AxumState(state): AppState,
    Payload(payload): Payload<SetupRequest>,
) -> Result<Json<SetupResponse>, AppError> {
    if payload.setup_key != state.config.setup_key {
        warn!("Setup attempted with an invalid key");
        return Err(AppError::Forbidden("Invalid setup key".to_string()));
    }

    let credentials = users::setup(
        &state.store,
        &payload.admin_username,
        &payload.admin_password,
        &payload.committee,
    )
    .await?;

    Ok(Json(SetupResponse {
        message: "Setup completed successfully!",
        credentials,
        warning: "Save these credentials securely!",
    }))
}

pub async fn list_nominations_handler(
    AxumState(state): AppState,
    _: AuthUser,
) -> Result<Json<Vec<Nomination>>, AppError> {
    Ok(Json(nominations::list_all(&state.store).await?))
}

pub async fn get_nomination_handler(
    AxumState(state): AppState,
    _: AuthUser,
    PathParams(id): PathParams<i64>,
) -> Result<Json<Nomination>, AppError> {
    Ok(Json(nominations::get(&state.store, id).await?))
}

pub async fn create_nomination_handler(
    AxumState(state): AppState,
    AdminUser(admin): AdminUser,
    Payload(input): Payload<NominationInput>,
) -> Result<impl IntoResponse, AppError> {
    let nomination = nominations::create(&state.store, &admin, input).await?;

    Ok((StatusCode::CREATED, Json(nomination)))
}

pub async fn update_nomination_handler(
    AxumState(state): AppState,
    AdminUser(admin): AdminUser,
    PathParams(id): PathParams<i64>,
    Payload(patch): Payload<NominationPatch>,
) -> Result<Json<Nomination>, AppError> {
    Ok(Json(nominations::update(&state.store, &admin, id, patch).await?))
}

pub async fn delete_nomination_handler(
    AxumState(state): AppState,
    AdminUser(admin): AdminUser,
    PathParams(id): PathParams<i64>,
) -> Result<impl IntoResponse, AppError> {
    nominations::delete(&state.store, &admin, id).await?;

    Ok(Json(json!({ "message": "Nomination deleted successfully" })))
}

pub async fn people_handler(
    AxumState(state): AppState,
    _: AuthUser,
) -> Result<Json<Vec<Person>>, AppError> {
    Ok(Json(results::grouped_people(&state.store).await?))
}

/// An unknown person is an empty list, not a 404.
pub async fn person_nominations_handler(
    AxumState(state): AppState,
    _: AuthUser,
    PathParams((name, year)): PathParams<(String, String)>,
) -> Result<Json<Vec<Nomination>>, AppError> {
    Ok(Json(nominations::list_by_person(&state.store, &name, &year).await?))
}

pub async fn yearless_person_nominations_handler(
    AxumState(state): AppState,
    _: AuthUser,
    PathParams(name): PathParams<String>,
) -> Result<Json<Vec<Nomination>>, AppError> {
    Ok(Json(nominations::list_by_person(&state.store, &name, "").await?))
}

pub async fn my_selections_handler(
    AxumState(state): AppState,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<StoredSelection>>, AppError> {
    Ok(Json(ballot::get_selections(&state.store, user.id).await?))
}

pub async fn ballot_handler(
    AxumState(state): AppState,
    AuthUser(user): AuthUser,
    Payload(payload): Payload<BallotRequest>,
) -> Result<impl IntoResponse, AppError> {
    let count = ballot::replace_selections(&state.store, user.id, &payload.selections).await?;

    Ok(Json(json!({ "message": "Ballot saved successfully", "count": count })))
}

pub async fn results_handler(
    AxumState(state): AppState,
    _: AuthUser,
) -> Result<Json<Vec<ResultEntry>>, AppError> {
    Ok(Json(results::results(&state.store).await?))
}

pub async fn stats_handler(
    AxumState(state): AppState,
    AuthUser(user): AuthUser,
) -> Result<Json<Stats>, AppError> {
    Ok(Json(results::stats(&state.store, user.id).await?))
}

pub async fn list_users_handler(
    AxumState(state): AppState,
    _: AdminUser,
) -> Result<Json<Vec<User>>, AppError> {
    Ok(Json(users::list_users(&state.store).await?))
}

pub async fn delete_user_handler(
    AxumState(state): AppState,
    AdminUser(admin): AdminUser,
    PathParams(id): PathParams<i64>,
) -> Result<impl IntoResponse, AppError> {
    users::delete_user(&state.store, &admin, id).await?;

    Ok(Json(json!({ "message": "User deleted successfully" })))
}

/// Rows are parsed one at a time so a malformed row is reported, not fatal.
pub async fn import_handler(
    AxumState(state): AppState,
    AdminUser(admin): AdminUser,
    Payload(payload): Payload<ImportRequest>,
) -> Result<Json<ImportResponse>, AppError> {
    let rows = payload
        .nominations
        .into_iter()
        .map(|row| serde_json::from_value::<NominationInput>(row).map_err(|e| e.to_string()));

    let report = nominations::bulk_import(&state.store, &admin, rows).await?;

    Ok(Json(ImportResponse {
        message: "Import completed",
        report,
    }))
}
