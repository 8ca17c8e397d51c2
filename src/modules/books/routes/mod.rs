//! REST routes for the books module, mounted under `/api/books`.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use url::Url;

use catalog_db::{Pool, Session};
use catalog_http::error::AppError;

use super::models::{Book, BookChanges, NewBook};
use super::service::{self, BookError, DEFAULT_LIMIT, MAX_LIMIT};

impl From<BookError> for AppError {
    fn from(err: BookError) -> Self {
        match err {
            BookError::Validation(message) => {
                AppError::validation(vec![json!({"error": message})], message)
            }
            BookError::NotFound(id) => AppError::not_found(format!("Book {id} not found")),
            BookError::Storage(e) => AppError::Internal(e.into()),
        }
    }
}

pub fn router(pool: Pool) -> Router {
    Router::new()
        .route("/", get(list_books).post(create_book))
        .route("/search", get(search_books))
        .route(
            "/{book_id}",
            get(get_book)
                .put(replace_book)
                .patch(patch_book)
                .delete(delete_book),
        )
        .with_state(pool)
}

#[derive(Debug, Deserialize)]
struct PageParams {
    #[serde(default = "default_limit")]
    limit: i64,
    #[serde(default)]
    offset: i64,
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    query: String,
    #[serde(default = "default_limit")]
    limit: i64,
    #[serde(default)]
    offset: i64,
}

fn default_limit() -> i64 {
    DEFAULT_LIMIT
}

fn check_page(limit: i64, offset: i64) -> Result<(), AppError> {
    if !(1..=MAX_LIMIT).contains(&limit) {
        return Err(AppError::invalid_field(
            "limit",
            format!("limit must be between 1 and {MAX_LIMIT}"),
        ));
    }
    if offset < 0 {
        return Err(AppError::invalid_field("offset", "offset must be >= 0"));
    }
    Ok(())
}

fn check_book_id(path: Result<Path<i64>, PathRejection>) -> Result<i64, AppError> {
    let Path(book_id) = path?;
    if book_id < 1 {
        return Err(AppError::invalid_field("book_id", "book_id must be >= 1"));
    }
    Ok(book_id)
}

fn check_title(title: &str) -> Result<(), AppError> {
    if title.trim().is_empty() {
        return Err(AppError::invalid_field("title", "title required"));
    }
    Ok(())
}

/// Purchase links, when given, must be absolute http(s) URLs.
fn check_link(link: Option<&str>) -> Result<(), AppError> {
    let Some(link) = link else {
        return Ok(());
    };
    match Url::parse(link) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => Ok(()),
        _ => Err(AppError::invalid_field(
            "purchase_link",
            "purchase_link must be an http or https URL",
        )),
    }
}

async fn begin(pool: &Pool) -> Result<Session, AppError> {
    Session::begin(pool)
        .await
        .map_err(|e| AppError::from(BookError::from(e)))
}

async fn list_books(
    State(pool): State<Pool>,
    params: Result<Query<PageParams>, QueryRejection>,
) -> Result<Json<Vec<Book>>, AppError> {
    let Query(params) = params?;
    check_page(params.limit, params.offset)?;

    let mut session = begin(&pool).await?;
    let result = service::list_books(session.conn(), params.limit, params.offset).await;
    Ok(Json(session.finish(result).await?))
}

async fn create_book(
    State(pool): State<Pool>,
    payload: Result<Json<NewBook>, JsonRejection>,
) -> Result<(StatusCode, Json<Book>), AppError> {
    let Json(payload) = payload?;
    check_title(&payload.title)?;
    check_link(payload.purchase_link.as_deref())?;

    let mut session = begin(&pool).await?;
    let result = service::create_book(session.conn(), payload).await;
    Ok((StatusCode::CREATED, Json(session.finish(result).await?)))
}

async fn search_books(
    State(pool): State<Pool>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<Vec<Book>>, AppError> {
    let Query(params) = params?;
    if params.query.is_empty() {
        return Err(AppError::invalid_field("query", "query required"));
    }
    check_page(params.limit, params.offset)?;

    let mut session = begin(&pool).await?;
    let result =
        service::search_books(session.conn(), &params.query, params.limit, params.offset).await;
    Ok(Json(session.finish(result).await?))
}

async fn get_book(
    State(pool): State<Pool>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<Book>, AppError> {
    let book_id = check_book_id(path)?;

    let mut session = begin(&pool).await?;
    let result = service::get_book(session.conn(), book_id).await;
    Ok(Json(session.finish(result).await?))
}

/// Full replacement. Runs through the same partial update as PATCH; the
/// payload simply carries every field.
async fn replace_book(
    State(pool): State<Pool>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<NewBook>, JsonRejection>,
) -> Result<Json<Book>, AppError> {
    let book_id = check_book_id(path)?;
    let Json(payload) = payload?;
    check_title(&payload.title)?;
    check_link(payload.purchase_link.as_deref())?;

    let mut session = begin(&pool).await?;
    let result = service::update_book(session.conn(), book_id, payload.into()).await;
    Ok(Json(session.finish(result).await?))
}

async fn patch_book(
    State(pool): State<Pool>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<BookChanges>, JsonRejection>,
) -> Result<Json<Book>, AppError> {
    let book_id = check_book_id(path)?;
    let Json(changes) = payload?;
    if let Some(title) = &changes.title {
        check_title(title)?;
    }
    check_link(changes.purchase_link.as_deref())?;

    let mut session = begin(&pool).await?;
    let result = service::update_book(session.conn(), book_id, changes).await;
    Ok(Json(session.finish(result).await?))
}

async fn delete_book(
    State(pool): State<Pool>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, AppError> {
    let book_id = check_book_id(path)?;

    let mut session = begin(&pool).await?;
    let result = service::delete_book(session.conn(), book_id).await;
    session.finish(result).await?;
    Ok(StatusCode::NO_CONTENT)
}
