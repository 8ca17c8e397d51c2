//! Tool set for the books module.
//!
//! Each tool checks its required strings, runs the shared business rules
//! inside one [`Session`], and returns plain JSON mappings of the records.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use catalog_db::{Pool, Session};
use catalog_kernel::{ToolDefinition, ToolError, ToolFuture, ToolSet};

use super::models::{Book, BookChanges, NewBook};
use super::service::{self, BookError, DEFAULT_LIMIT};

pub struct BookTools {
    pool: Pool,
}

impl BookTools {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

impl ToolSet for BookTools {
    fn definitions(&self) -> Vec<ToolDefinition> {
        let book_fields = json!({
            "title": { "type": "string", "description": "Title of the book" },
            "author": { "type": ["string", "null"], "description": "Author of the book" },
            "publisher": { "type": ["string", "null"], "description": "Publisher of the book" },
            "purchase_link": { "type": ["string", "null"], "description": "Where to buy the book" }
        });
        let book_id = json!({ "type": "integer", "description": "Id of the book" });
        let limit = json!({ "type": "integer", "default": DEFAULT_LIMIT, "description": "Maximum records to return (1-500)" });
        let offset = json!({ "type": "integer", "default": 0, "description": "Records to skip" });

        let mut update_fields = book_fields.clone();
        update_fields["book_id"] = book_id.clone();
        update_fields["title"]["type"] = json!(["string", "null"]);

        vec![
            ToolDefinition {
                name: "books_add",
                input_schema: json!({
                    "type": "object",
                    "properties": book_fields,
                    "required": ["title"]
                }),
            },
            ToolDefinition {
                name: "books_update",
                input_schema: json!({
                    "type": "object",
                    "properties": update_fields,
                    "required": ["book_id"]
                }),
            },
            ToolDefinition {
                name: "books_delete",
                input_schema: json!({
                    "type": "object",
                    "properties": { "book_id": book_id },
                    "required": ["book_id"]
                }),
            },
            ToolDefinition {
                name: "books_get",
                input_schema: json!({
                    "type": "object",
                    "properties": { "book_id": book_id },
                    "required": ["book_id"]
                }),
            },
            ToolDefinition {
                name: "books_list",
                input_schema: json!({
                    "type": "object",
                    "properties": { "limit": limit, "offset": offset }
                }),
            },
            ToolDefinition {
                name: "books_search",
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "query": { "type": "string", "description": "Keyword matched against title, author and publisher" },
                        "limit": limit,
                        "offset": offset
                    },
                    "required": ["query"]
                }),
            },
        ]
    }

    fn call(&self, name: &str, args: Value) -> Option<ToolFuture> {
        let pool = self.pool.clone();
        match name {
            "books_add" => Some(Box::pin(books_add(pool, args))),
            "books_update" => Some(Box::pin(books_update(pool, args))),
            "books_delete" => Some(Box::pin(books_delete(pool, args))),
            "books_get" => Some(Box::pin(books_get(pool, args))),
            "books_list" => Some(Box::pin(books_list(pool, args))),
            "books_search" => Some(Box::pin(books_search(pool, args))),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct BookIdArgs {
    book_id: i64,
}

#[derive(Debug, Deserialize)]
struct UpdateArgs {
    book_id: i64,
    #[serde(flatten)]
    changes: BookChanges,
}

#[derive(Debug, Deserialize)]
struct ListArgs {
    #[serde(default = "default_limit")]
    limit: i64,
    #[serde(default)]
    offset: i64,
}

#[derive(Debug, Deserialize)]
struct SearchArgs {
    query: String,
    #[serde(default = "default_limit")]
    limit: i64,
    #[serde(default)]
    offset: i64,
}

fn default_limit() -> i64 {
    DEFAULT_LIMIT
}

fn decode<T: DeserializeOwned>(args: Value) -> Result<T, ToolError> {
    serde_json::from_value(args).map_err(|e| ToolError::InvalidArguments(e.to_string()))
}

fn rejected(err: BookError) -> ToolError {
    match err {
        BookError::Storage(e) => ToolError::Internal(e.into()),
        other => ToolError::Rejected(other.to_string()),
    }
}

async fn begin(pool: &Pool) -> Result<Session, ToolError> {
    Session::begin(pool).await.map_err(|e| ToolError::Internal(e.into()))
}

fn to_mapping<T: serde::Serialize>(value: &T) -> Result<Value, ToolError> {
    serde_json::to_value(value).map_err(|e| ToolError::Internal(e.into()))
}

async fn books_add(pool: Pool, args: Value) -> Result<Value, ToolError> {
    let book: NewBook = decode(args)?;
    if book.title.trim().is_empty() {
        return Err(ToolError::Rejected("title required".to_string()));
    }

    let mut session = begin(&pool).await?;
    let result = service::create_book(session.conn(), book).await;
    let book: Book = session.finish(result).await.map_err(rejected)?;
    to_mapping(&book)
}

async fn books_update(pool: Pool, args: Value) -> Result<Value, ToolError> {
    let UpdateArgs { book_id, changes } = decode(args)?;

    let mut session = begin(&pool).await?;
    let result = service::update_book(session.conn(), book_id, changes).await;
    let book = session.finish(result).await.map_err(rejected)?;
    to_mapping(&book)
}

async fn books_delete(pool: Pool, args: Value) -> Result<Value, ToolError> {
    let BookIdArgs { book_id } = decode(args)?;

    let mut session = begin(&pool).await?;
    let result = service::delete_book(session.conn(), book_id).await;
    session.finish(result).await.map_err(rejected)?;
    Ok(json!({ "deleted": true, "id": book_id }))
}

async fn books_get(pool: Pool, args: Value) -> Result<Value, ToolError> {
    let BookIdArgs { book_id } = decode(args)?;

    let mut session = begin(&pool).await?;
    let result = service::get_book(session.conn(), book_id).await;
    let book = session.finish(result).await.map_err(rejected)?;
    to_mapping(&book)
}

async fn books_list(pool: Pool, args: Value) -> Result<Value, ToolError> {
    let ListArgs { limit, offset } = decode(args)?;

    let mut session = begin(&pool).await?;
    let result = service::list_books(session.conn(), limit, offset).await;
    let books = session.finish(result).await.map_err(rejected)?;
    to_mapping(&books)
}

async fn books_search(pool: Pool, args: Value) -> Result<Value, ToolError> {
    let SearchArgs {
        query,
        limit,
        offset,
    } = decode(args)?;
    if query.trim().is_empty() {
        return Err(ToolError::Rejected(
            "query must contain at least one character".to_string(),
        ));
    }

    let mut session = begin(&pool).await?;
    let result = service::search_books(session.conn(), &query, limit, offset).await;
    let books = session.finish(result).await.map_err(rejected)?;
    to_mapping(&books)
}
