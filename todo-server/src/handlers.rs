//! One handler per endpoint.
//!
//! Handlers are stateless: each decodes its input, makes at most one store
//! call and turns the outcome into a response. Every failure is converted
//! to an [`ApiError`] here and never propagates further.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::Html,
    Json,
};
use serde::de::DeserializeOwned;
use tera::{Context, Tera};

use crate::db::TodoStore;
use crate::error::ApiError;
use crate::model::{title_is_valid, CreateTodo, Message, TodoList, UpdateTodo};
use crate::state::AppState;

const HOME_TEMPLATE: &str = "home.tpl";

pub async fn home(State(state): State<AppState>) -> Result<Html<String>, ApiError> {
    let path = state.config.static_dir.join(HOME_TEMPLATE);
    let source = tokio::fs::read_to_string(&path).await.map_err(|e| {
        tracing::error!(path = %path.display(), error = %e, "cannot read template");
        ApiError::Template("Error loading template".into())
    })?;

    let mut tera = Tera::default();
    tera.add_raw_template(HOME_TEMPLATE, &source).map_err(|e| {
        tracing::error!(error = %e, "cannot parse template");
        ApiError::Template("Error loading template".into())
    })?;
    let page = tera.render(HOME_TEMPLATE, &Context::new()).map_err(|e| {
        tracing::error!(error = %e, "cannot render template");
        ApiError::Template("Error rendering template".into())
    })?;
    Ok(Html(page))
}

pub async fn list_todos(State(state): State<AppState>) -> Result<Json<TodoList>, ApiError> {
    let data = state
        .store
        .list_all()
        .await
        .map_err(|e| ApiError::storage("Failed to fetch todos", e))?;
    Ok(Json(TodoList { data }))
}

pub async fn create_todo(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<Message>), ApiError> {
    let input: CreateTodo = decode_body(&body)?;
    if !title_is_valid(&input.title) {
        return Err(ApiError::Validation("The title is required".into()));
    }

    state
        .store
        .insert(&input.title)
        .await
        .map_err(|e| ApiError::storage("Failed to insert todo", e))?;
    Ok((
        StatusCode::CREATED,
        Json(Message::new("Todo created successfully")),
    ))
}

pub async fn update_todo(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<Message>, ApiError> {
    let id = parse_id(&id)?;
    let input: UpdateTodo = decode_body(&body)?;
    if !title_is_valid(&input.title) {
        return Err(ApiError::Validation("The title field is required".into()));
    }

    let affected = state
        .store
        .update(id, &input.title, input.completed)
        .await
        .map_err(|e| ApiError::storage("Failed to update todo", e))?;
    if affected == 0 && state.config.strict_not_found {
        return Err(ApiError::NotFound("Todo not found".into()));
    }
    Ok(Json(Message::new("Todo updated successfully")))
}

pub async fn delete_todo(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Message>, ApiError> {
    let id = parse_id(&id)?;

    let affected = state
        .store
        .delete(id)
        .await
        .map_err(|e| ApiError::storage("Failed to delete todo", e))?;
    if affected == 0 && state.config.strict_not_found {
        return Err(ApiError::NotFound("Todo not found".into()));
    }
    Ok(Json(Message::new("Todo deleted successfully")))
}

/// Decode a JSON body regardless of its declared content type.
fn decode_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| ApiError::decode("Invalid request body", e))
}

fn parse_id(raw: &str) -> Result<i64, ApiError> {
    raw.trim()
        .parse()
        .map_err(|e| ApiError::decode("Invalid todo id", e))
}
