//! User endpoints
//!
//! Same shape as the todo endpoints under `/api/users`. Passwords are
//! accepted on create only and never appear in a response.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{non_empty, text};
use crate::db::Store;
use crate::error::AppError;
use crate::http::error::ApiError;
use crate::http::extractors::{JsonBody, ListParams};
use crate::http::response;
use crate::http::transaction::with_transaction;
use crate::models::user::InvalidGender;
use crate::models::{Gender, NewUser, User, UserChanges};
use crate::services::UserService;
use crate::state::AppState;
use crate::validation::{FieldRules, Rule, Validate, Validator};

/// `POST /api/users` body
#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub gender: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

impl Validate for CreateUserRequest {
    fn fields(&self) -> Vec<FieldRules<'_>> {
        vec![
            FieldRules::new("full_name", text(&self.full_name), &[Rule::Required]),
            FieldRules::new("gender", text(&self.gender), &[Rule::Required, Rule::Gender]),
            FieldRules::new("email", text(&self.email), &[Rule::Required, Rule::Email]),
            FieldRules::new(
                "password",
                text(&self.password),
                &[Rule::Required, Rule::Min(6)],
            ),
            FieldRules::new("phone", text(&self.phone), &[Rule::Required, Rule::Phone]),
        ]
    }
}

impl TryFrom<CreateUserRequest> for NewUser {
    type Error = AppError;

    fn try_from(req: CreateUserRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            gender: parse_gender(req.gender.as_deref().unwrap_or_default())?,
            full_name: req.full_name.unwrap_or_default(),
            phone: req.phone.unwrap_or_default(),
            email: req.email.unwrap_or_default(),
            password: req.password.unwrap_or_default(),
        })
    }
}

/// `PUT /api/users/{id}` body; every field optional
#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub gender: Option<String>,
    pub email: Option<String>,
}

impl Validate for UpdateUserRequest {
    fn fields(&self) -> Vec<FieldRules<'_>> {
        vec![
            FieldRules::new("full_name", text(&self.full_name), &[]),
            FieldRules::new("gender", text(&self.gender), &[Rule::Gender]),
            FieldRules::new("email", text(&self.email), &[Rule::Email]),
            FieldRules::new("phone", text(&self.phone), &[Rule::Phone]),
        ]
    }
}

impl TryFrom<UpdateUserRequest> for UserChanges {
    type Error = AppError;

    fn try_from(req: UpdateUserRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            gender: non_empty(req.gender)
                .map(|g| parse_gender(&g))
                .transpose()?,
            full_name: non_empty(req.full_name),
            phone: non_empty(req.phone),
            email: non_empty(req.email),
        })
    }
}

fn parse_gender(raw: &str) -> Result<Gender, AppError> {
    raw.parse()
        .map_err(|e: InvalidGender| AppError::bad_request(e.to_string()))
}

/// User as returned by the API
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub full_name: String,
    pub phone: String,
    pub gender: Gender,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            full_name: user.full_name,
            phone: user.phone,
            gender: user.gender,
            email: user.email,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

async fn list_users<D: Store>(
    State(state): State<AppState<D>>,
    params: ListParams,
) -> Result<Response, ApiError> {
    let page = state
        .users
        .list(None, params.page_request(), params.search())
        .await?;
    Ok(response::paginated(
        "Users fetched successfully",
        page.map(UserResponse::from),
    ))
}

async fn get_user<D: Store>(
    State(state): State<AppState<D>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let user = state.users.get_by_id(None, &id).await?;
    Ok(response::with_data(
        StatusCode::OK,
        "User fetched successfully",
        UserResponse::from(user),
    ))
}

async fn create_user<D: Store>(
    State(AppState { store, users, .. }): State<AppState<D>>,
    JsonBody(req): JsonBody<CreateUserRequest>,
) -> Response {
    with_transaction(&store, |mut tx| async move {
        let result = create(&users, &mut tx, req).await;
        (tx, result)
    })
    .await
}

async fn create<D: Store>(
    users: &UserService<D>,
    tx: &mut D::Tx,
    req: CreateUserRequest,
) -> Result<Response, ApiError> {
    Validator::users().validate(&req)?;
    let user = users.create(Some(tx), req.try_into()?).await?;
    Ok(response::with_data(
        StatusCode::CREATED,
        "User Created Successfully",
        UserResponse::from(user),
    ))
}

async fn update_user<D: Store>(
    State(AppState { store, users, .. }): State<AppState<D>>,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<UpdateUserRequest>,
) -> Response {
    with_transaction(&store, |mut tx| async move {
        let result = update(&users, &mut tx, &id, req).await;
        (tx, result)
    })
    .await
}

async fn update<D: Store>(
    users: &UserService<D>,
    tx: &mut D::Tx,
    id: &str,
    req: UpdateUserRequest,
) -> Result<Response, ApiError> {
    Validator::users().validate(&req)?;
    let user = users.update(Some(tx), id, req.try_into()?).await?;
    Ok(response::with_data(
        StatusCode::OK,
        "User updated successfully",
        UserResponse::from(user),
    ))
}

async fn delete_user<D: Store>(
    State(AppState { store, users, .. }): State<AppState<D>>,
    Path(id): Path<String>,
) -> Response {
    with_transaction(&store, |mut tx| async move {
        let result = users
            .delete(Some(&mut tx), &id)
            .await
            .map(|()| response::message_only(StatusCode::OK, "User deleted successfully"))
            .map_err(ApiError::from);
        (tx, result)
    })
    .await
}

/// User routes
pub fn router<D: Store>() -> Router<AppState<D>> {
    Router::new()
        .route("/api/users", get(list_users::<D>).post(create_user::<D>))
        .route(
            "/api/users/{id}",
            get(get_user::<D>)
                .put(update_user::<D>)
                .delete(delete_user::<D>),
        )
}
