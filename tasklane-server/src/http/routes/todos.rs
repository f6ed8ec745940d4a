//! Todo endpoints
//!
//! - `GET    /api/todos`       paginated list, `?page=&perPage=&search=`
//! - `POST   /api/todos`       create (transactional)
//! - `GET    /api/todos/{id}`  fetch one
//! - `PUT    /api/todos/{id}`  merge-update (transactional)
//! - `DELETE /api/todos/{id}`  delete (transactional)

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
use crate::models::{NewTodo, Todo, TodoChanges, TodoStatus};
use crate::services::TodoService;
use crate::state::AppState;
use crate::validation::{FieldRules, Rule, Validate, Validator};

const TITLE_REQUIRED: &[Rule] = &[Rule::Required, Rule::Min(3), Rule::Max(100)];
const TITLE_OPTIONAL: &[Rule] = &[Rule::Min(3), Rule::Max(100)];
const STATUS: &[Rule] = &[Rule::Required, Rule::Status];

/// `POST /api/todos` body
#[derive(Debug, Deserialize)]
pub struct CreateTodoRequest {
    pub title: Option<String>,
    pub status: Option<String>,
}

impl Validate for CreateTodoRequest {
    fn fields(&self) -> Vec<FieldRules<'_>> {
        vec![
            FieldRules::new("title", text(&self.title), TITLE_REQUIRED),
            FieldRules::new("status", text(&self.status), STATUS),
        ]
    }
}

impl TryFrom<CreateTodoRequest> for NewTodo {
    type Error = AppError;

    fn try_from(req: CreateTodoRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            title: req.title.unwrap_or_default(),
            status: parse_status(req.status.as_deref())?,
        })
    }
}

/// `PUT /api/todos/{id}` body; `status` is always required
#[derive(Debug, Deserialize)]
pub struct UpdateTodoRequest {
    pub title: Option<String>,
    pub status: Option<String>,
}

impl Validate for UpdateTodoRequest {
    fn fields(&self) -> Vec<FieldRules<'_>> {
        vec![
            FieldRules::new("title", text(&self.title), TITLE_OPTIONAL),
            FieldRules::new("status", text(&self.status), STATUS),
        ]
    }
}

impl TryFrom<UpdateTodoRequest> for TodoChanges {
    type Error = AppError;

    fn try_from(req: UpdateTodoRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            title: non_empty(req.title),
            status: Some(parse_status(req.status.as_deref())?),
        })
    }
}

fn parse_status(raw: Option<&str>) -> Result<TodoStatus, AppError> {
    raw.unwrap_or_default()
        .parse()
        .map_err(|e: crate::models::todo::InvalidStatus| AppError::bad_request(e.to_string()))
}

/// Todo as returned by the API
#[derive(Debug, Serialize)]
pub struct TodoResponse {
    pub id: Uuid,
    pub title: String,
    pub status: TodoStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<Todo> for TodoResponse {
    fn from(todo: Todo) -> Self {
        Self {
            id: todo.id,
            title: todo.title,
            status: todo.status,
            created_at: todo.created_at,
            updated_at: todo.updated_at,
        }
    }
}

/// GET /api/todos
async fn list_todos<D: Store>(
    State(state): State<AppState<D>>,
    params: ListParams,
) -> Result<Response, ApiError> {
    let page = state
        .todos
        .list(None, params.page_request(), params.search())
        .await?;
    Ok(response::paginated(
        "Todos fetched successfully",
        page.map(TodoResponse::from),
    ))
}

/// GET /api/todos/{id}
async fn get_todo<D: Store>(
    State(state): State<AppState<D>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let todo = state.todos.get_by_id(None, &id).await?;
    Ok(response::with_data(
        StatusCode::OK,
        "Todo fetched successfully",
        TodoResponse::from(todo),
    ))
}

/// POST /api/todos
async fn create_todo<D: Store>(
    State(AppState { store, todos, .. }): State<AppState<D>>,
    JsonBody(req): JsonBody<CreateTodoRequest>,
) -> Response {
    with_transaction(&store, |mut tx| async move {
        let result = create(&todos, &mut tx, req).await;
        (tx, result)
    })
    .await
}

async fn create<D: Store>(
    todos: &TodoService<D>,
    tx: &mut D::Tx,
    req: CreateTodoRequest,
) -> Result<Response, ApiError> {
    Validator::todos().validate(&req)?;
    let todo = todos.create(Some(tx), req.try_into()?).await?;
    Ok(response::with_data(
        StatusCode::CREATED,
        "Todo Created Successfully",
        TodoResponse::from(todo),
    ))
}

/// PUT /api/todos/{id}
async fn update_todo<D: Store>(
    State(AppState { store, todos, .. }): State<AppState<D>>,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<UpdateTodoRequest>,
) -> Response {
    with_transaction(&store, |mut tx| async move {
        let result = update(&todos, &mut tx, &id, req).await;
        (tx, result)
    })
    .await
}

async fn update<D: Store>(
    todos: &TodoService<D>,
    tx: &mut D::Tx,
    id: &str,
    req: UpdateTodoRequest,
) -> Result<Response, ApiError> {
    Validator::todos().validate(&req)?;
    let todo = todos.update(Some(tx), id, req.try_into()?).await?;
    Ok(response::with_data(
        StatusCode::OK,
        "Todo updated successfully",
        TodoResponse::from(todo),
    ))
}

/// DELETE /api/todos/{id}
async fn delete_todo<D: Store>(
    State(AppState { store, todos, .. }): State<AppState<D>>,
    Path(id): Path<String>,
) -> Response {
    with_transaction(&store, |mut tx| async move {
        let result = todos
            .delete(Some(&mut tx), &id)
            .await
            .map(|()| response::message_only(StatusCode::OK, "Todo deleted successfully"))
            .map_err(ApiError::from);
        (tx, result)
    })
    .await
}

/// Todo routes
pub fn router<D: Store>() -> Router<AppState<D>> {
    Router::new()
        .route("/api/todos", get(list_todos::<D>).post(create_todo::<D>))
        .route(
            "/api/todos/{id}",
            get(get_todo::<D>)
                .put(update_todo::<D>)
                .delete(delete_todo::<D>),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::test_support::{send, test_app};
    use axum::http::Method;
    use serde_json::json;

    #[test]
    fn update_request_blank_title_means_unchanged() {
        let changes = TodoChanges::try_from(UpdateTodoRequest {
            title: Some(String::new()),
            status: Some("completed".into()),
        })
        .unwrap();
        assert_eq!(changes.title, None);
        assert_eq!(changes.status, Some(TodoStatus::Completed));
    }

    #[tokio::test]
    async fn short_title_is_422_and_nothing_is_stored() {
        let app = test_app();
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/todos",
            Some(json!({"title": "ab", "status": "pending"})),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["message"], "Invalid input information");
        assert_eq!(body["errors"][0]["field"], "title");
        assert_eq!(
            body["errors"][0]["message"],
            "Field 'title' is too short (minimum 3 characters)"
        );

        let (_, list) = send(&app, Method::GET, "/api/todos", None).await;
        assert_eq!(list["meta"]["totalItems"], 0);
    }

    #[tokio::test]
    async fn missing_fields_report_every_failure() {
        let app = test_app();
        let (status, body) = send(&app, Method::POST, "/api/todos", Some(json!({}))).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            body["errors"],
            json!([
                {"field": "title", "message": "Field 'title' is 'required'."},
                {"field": "status", "message": "Field 'status' is 'required'."}
            ])
        );
    }

    #[tokio::test]
    async fn todo_lifecycle() {
        let app = test_app();

        let (status, created) = send(
            &app,
            Method::POST,
            "/api/todos",
            Some(json!({"title": "Buy milk", "status": "pending"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["message"], "Todo Created Successfully");
        assert_eq!(created["success"], true);
        assert!(created["data"]["updated_at"].is_null());
        let id = created["data"]["id"].as_str().unwrap().to_owned();
        let path = format!("/api/todos/{id}");

        let (status, fetched) = send(&app, Method::GET, &path, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["data"]["title"], "Buy milk");

        let (status, updated) = send(
            &app,
            Method::PUT,
            &path,
            Some(json!({"title": "", "status": "completed"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["message"], "Todo updated successfully");
        assert_eq!(updated["data"]["title"], "Buy milk");
        assert_eq!(updated["data"]["status"], "completed");
        assert!(updated["data"]["updated_at"].is_string());

        let (status, deleted) = send(&app, Method::DELETE, &path, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            deleted,
            json!({"message": "Todo deleted successfully", "success": true})
        );

        let (status, missing) = send(&app, Method::GET, &path, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(
            missing,
            json!({"message": "Todo not found", "error": "not found", "success": false})
        );
    }

    #[tokio::test]
    async fn update_without_status_is_422() {
        let app = test_app();
        let (_, created) = send(
            &app,
            Method::POST,
            "/api/todos",
            Some(json!({"title": "Walk dog", "status": "pending"})),
        )
        .await;
        let path = format!("/api/todos/{}", created["data"]["id"].as_str().unwrap());

        let (status, body) = send(&app, Method::PUT, &path, Some(json!({"title": "Walk cat"}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["errors"][0]["field"], "status");

        let (_, fetched) = send(&app, Method::GET, &path, None).await;
        assert_eq!(fetched["data"]["title"], "Walk dog");
    }

    #[tokio::test]
    async fn unknown_and_malformed_ids() {
        let app = test_app();

        let (status, _) = send(
            &app,
            Method::DELETE,
            &format!("/api/todos/{}", Uuid::new_v4()),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(&app, Method::GET, "/api/todos/not-a-uuid", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Todo ID is malformed");
    }

    #[tokio::test]
    async fn list_defaults_and_search() {
        let app = test_app();
        for title in ["Buy milk", "Walk dog", "Buy bread"] {
            send(
                &app,
                Method::POST,
                "/api/todos",
                Some(json!({"title": title, "status": "pending"})),
            )
            .await;
        }

        let (status, body) = send(&app, Method::GET, "/api/todos?page=zero&perPage=-1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Todos fetched successfully");
        assert_eq!(
            body["meta"],
            json!({"page": 1, "perPage": 10, "totalPages": 1, "totalItems": 3})
        );

        let (_, body) = send(&app, Method::GET, "/api/todos?search=BUY&perPage=1&page=2", None).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
        assert_eq!(body["data"][0]["title"], "Buy milk");
        assert_eq!(body["meta"]["totalPages"], 2);

        let (status, body) =
            send(&app, Method::GET, "/api/todos?perPage=1&perPage=x&page=2&page=3", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["meta"]["page"], 2);
        assert_eq!(body["meta"]["perPage"], 1);
        assert_eq!(body["data"][0]["title"], "Walk dog");

        let (_, body) = send(&app, Method::GET, "/api/todos?page=9", None).await;
        assert_eq!(body["data"], json!([]));
        assert_eq!(body["meta"]["totalItems"], 0);
        assert_eq!(body["meta"]["totalPages"], 0);
    }

    #[tokio::test]
    async fn whitespace_title_passes_rules_and_is_created() {
        let app = test_app();
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/todos",
            Some(json!({"title": "   ", "status": "pending"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["title"], "   ");
    }

    #[tokio::test]
    async fn malformed_body_is_400() {
        let app = test_app();
        let (status, body) = send(&app, Method::POST, "/api/todos", Some(json!("not an object"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }
}
