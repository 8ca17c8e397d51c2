pub mod models;
pub mod routes;
pub mod service;
pub mod store;
pub mod tools;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use catalog_kernel::{InitCtx, Migration, Module, ToolSet};
use serde_json::{json, Value};

/// Books module: the catalog's only resource
pub struct BooksModule;

impl BooksModule {
    pub const fn new() -> Self {
        Self
    }
}

impl Default for BooksModule {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self, ctx: &InitCtx<'_>) -> Router {
        routes::router(ctx.db.clone())
    }

    fn openapi(&self) -> Option<Value> {
        Some(openapi_fragment())
    }

    fn migrations(&self) -> Vec<Migration> {
        vec![Migration {
            id: "001_init",
            up: r#"
                CREATE TABLE IF NOT EXISTS books (
                    id            INTEGER PRIMARY KEY AUTOINCREMENT,
                    title         TEXT NOT NULL CHECK (length(trim(title)) > 0),
                    author        TEXT,
                    publisher     TEXT,
                    purchase_link TEXT,
                    created_at    TEXT NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_books_title ON books (title);
                CREATE INDEX IF NOT EXISTS idx_books_author ON books (author);
                CREATE INDEX IF NOT EXISTS idx_books_publisher ON books (publisher);
                CREATE INDEX IF NOT EXISTS idx_books_created_at ON books (created_at);
                "#,
        }]
    }

    fn tools(&self, ctx: &InitCtx<'_>) -> Option<Arc<dyn ToolSet>> {
        Some(Arc::new(tools::BookTools::new(ctx.db.clone())))
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

fn json_content(schema: Value) -> Value {
    json!({ "application/json": { "schema": schema } })
}

fn error_response(description: &str) -> Value {
    json!({
        "description": description,
        "content": json_content(json!({ "$ref": "#/components/schemas/ErrorResponse" }))
    })
}

fn book_response(description: &str) -> Value {
    json!({
        "description": description,
        "content": json_content(json!({ "$ref": "#/components/schemas/Book" }))
    })
}

fn book_page_response() -> Value {
    json!({
        "description": "Page of books, newest first",
        "content": json_content(json!({
            "type": "array",
            "items": { "$ref": "#/components/schemas/Book" }
        }))
    })
}

fn paging_parameters() -> Vec<Value> {
    vec![
        json!({
            "name": "limit",
            "in": "query",
            "schema": { "type": "integer", "minimum": 1, "maximum": 500, "default": 100 }
        }),
        json!({
            "name": "offset",
            "in": "query",
            "schema": { "type": "integer", "minimum": 0, "default": 0 }
        }),
    ]
}

fn openapi_fragment() -> Value {
    let book_id = json!({
        "name": "book_id",
        "in": "path",
        "required": true,
        "schema": { "type": "integer", "minimum": 1 }
    });
    let mut search_parameters = vec![json!({
        "name": "query",
        "in": "query",
        "required": true,
        "schema": { "type": "string", "minLength": 1 }
    })];
    search_parameters.extend(paging_parameters());

    let nullable_string = |description: &str| {
        json!({ "type": "string", "nullable": true, "description": description })
    };

    json!({
        "paths": {
            "/": {
                "get": {
                    "summary": "List books",
                    "tags": ["Books"],
                    "parameters": paging_parameters(),
                    "responses": {
                        "200": book_page_response(),
                        "422": error_response("Invalid paging parameters")
                    }
                },
                "post": {
                    "summary": "Create a book",
                    "tags": ["Books"],
                    "requestBody": {
                        "required": true,
                        "content": json_content(json!({ "$ref": "#/components/schemas/NewBook" }))
                    },
                    "responses": {
                        "201": book_response("Created book"),
                        "422": error_response("Validation error")
                    }
                }
            },
            "/search": {
                "get": {
                    "summary": "Search books by title, author or publisher",
                    "tags": ["Books"],
                    "parameters": search_parameters,
                    "responses": {
                        "200": book_page_response(),
                        "422": error_response("Invalid search parameters")
                    }
                }
            },
            "/{book_id}": {
                "get": {
                    "summary": "Get a book",
                    "tags": ["Books"],
                    "parameters": [book_id],
                    "responses": {
                        "200": book_response("The book"),
                        "404": error_response("Book not found"),
                        "422": error_response("Invalid book id")
                    }
                },
                "put": {
                    "summary": "Replace a book",
                    "tags": ["Books"],
                    "parameters": [book_id],
                    "requestBody": {
                        "required": true,
                        "content": json_content(json!({ "$ref": "#/components/schemas/NewBook" }))
                    },
                    "responses": {
                        "200": book_response("Updated book"),
                        "404": error_response("Book not found"),
                        "422": error_response("Validation error")
                    }
                },
                "patch": {
                    "summary": "Update some fields of a book",
                    "tags": ["Books"],
                    "parameters": [book_id],
                    "requestBody": {
                        "required": true,
                        "content": json_content(json!({ "$ref": "#/components/schemas/BookChanges" }))
                    },
                    "responses": {
                        "200": book_response("Updated book"),
                        "404": error_response("Book not found"),
                        "422": error_response("Validation error")
                    }
                },
                "delete": {
                    "summary": "Delete a book",
                    "tags": ["Books"],
                    "parameters": [book_id],
                    "responses": {
                        "204": { "description": "Deleted" },
                        "404": error_response("Book not found"),
                        "422": error_response("Invalid book id")
                    }
                }
            }
        },
        "components": {
            "schemas": {
                "Book": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "integer", "description": "Unique identifier for the book" },
                        "title": { "type": "string", "description": "Title of the book" },
                        "author": nullable_string("Author of the book"),
                        "publisher": nullable_string("Publisher of the book"),
                        "purchase_link": nullable_string("Where the book can be bought"),
                        "created_at": { "type": "string", "format": "date-time" }
                    },
                    "required": ["id", "title", "author", "publisher", "purchase_link", "created_at"]
                },
                "NewBook": {
                    "type": "object",
                    "properties": {
                        "title": { "type": "string", "minLength": 1 },
                        "author": nullable_string("Author of the book"),
                        "publisher": nullable_string("Publisher of the book"),
                        "purchase_link": nullable_string("Where the book can be bought")
                    },
                    "required": ["title"]
                },
                "BookChanges": {
                    "type": "object",
                    "properties": {
                        "title": { "type": "string", "minLength": 1, "nullable": true },
                        "author": nullable_string("Author of the book"),
                        "publisher": nullable_string("Publisher of the book"),
                        "purchase_link": nullable_string("Where the book can be bought")
                    }
                }
            }
        }
    })
}

/// Create a new instance of the books module
pub fn create_module() -> Arc<dyn Module> {
    Arc::new(BooksModule::new())
}

#[cfg(test)]
pub(crate) mod test_support {
    use catalog_db::{connect_in_memory, run_migrations, Pool};
    use catalog_kernel::Module;

    use super::BooksModule;

    /// In-memory pool with the books schema applied
    pub async fn pool() -> Pool {
        let pool = connect_in_memory().await.expect("in-memory pool");
        let migrations: Vec<_> = BooksModule::new()
            .migrations()
            .into_iter()
            .map(|m| ("books".to_string(), m))
            .collect();
        run_migrations(&pool, &migrations)
            .await
            .expect("books migrations");
        pool
    }
}
