//! Business rules shared by the REST routes and the tool set.
//!
//! Every rule about input lives here: title and query trimming, page
//! clamping, and turning a missing record into [`BookError::NotFound`].
//! Functions are stateless and run on whatever connection the caller's
//! unit of work provides.

use thiserror::Error;

use catalog_db::Connection;

use super::models::{Book, BookChanges, NewBook};
use super::store;

pub const DEFAULT_LIMIT: i64 = 100;
pub const MAX_LIMIT: i64 = 500;

#[derive(Debug, Error)]
pub enum BookError {
    #[error("{0}")]
    Validation(String),

    #[error("Book {0} not found")]
    NotFound(i64),

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

/// Bound `limit` to `[1, MAX_LIMIT]` and `offset` to `>= 0`, silently.
pub fn clamp_page(limit: i64, offset: i64) -> (i64, i64) {
    (limit.clamp(1, MAX_LIMIT), offset.max(0))
}

fn clean_title(title: &str) -> Result<String, BookError> {
    let cleaned = title.trim();
    if cleaned.is_empty() {
        tracing::debug!("rejected blank title");
        return Err(BookError::Validation("title required".to_string()));
    }
    Ok(cleaned.to_string())
}

pub async fn create_book(conn: &mut Connection, book: NewBook) -> Result<Book, BookError> {
    let title = clean_title(&book.title)?;
    let book = store::create(conn, NewBook { title, ..book }).await?;

    tracing::info!(book_id = book.id, "book created");
    Ok(book)
}

pub async fn list_books(
    conn: &mut Connection,
    limit: i64,
    offset: i64,
) -> Result<Vec<Book>, BookError> {
    let (limit, offset) = clamp_page(limit, offset);
    Ok(store::list(conn, limit, offset).await?)
}

pub async fn get_book(conn: &mut Connection, id: i64) -> Result<Book, BookError> {
    store::get(conn, id).await?.ok_or(BookError::NotFound(id))
}

/// Partial update: only the fields present in `changes` are written.
pub async fn update_book(
    conn: &mut Connection,
    id: i64,
    changes: BookChanges,
) -> Result<Book, BookError> {
    let book = get_book(conn, id).await?;
    write_changes(conn, book, changes).await
}

/// Write `changes` over a book already looked up on this connection.
async fn write_changes(
    conn: &mut Connection,
    book: Book,
    changes: BookChanges,
) -> Result<Book, BookError> {
    let id = book.id;
    let title = changes.title.as_deref().map(clean_title).transpose()?;

    let book = store::update(conn, book, BookChanges { title, ..changes })
        .await
        .map_err(|e| match e {
            // The row vanished between lookup and write.
            sqlx::Error::RowNotFound => BookError::NotFound(id),
            other => BookError::Storage(other),
        })?;

    tracing::info!(book_id = book.id, "book updated");
    Ok(book)
}

pub async fn delete_book(conn: &mut Connection, id: i64) -> Result<(), BookError> {
    let book = get_book(conn, id).await?;
    store::delete(conn, &book).await?;

    tracing::info!(book_id = id, "book deleted");
    Ok(())
}

pub async fn search_books(
    conn: &mut Connection,
    query: &str,
    limit: i64,
    offset: i64,
) -> Result<Vec<Book>, BookError> {
    let query = query.trim();
    if query.is_empty() {
        tracing::debug!("rejected blank search query");
        return Err(BookError::Validation(
            "query must contain at least one character".to_string(),
        ));
    }

    let (limit, offset) = clamp_page(limit, offset);
    Ok(store::search(conn, query, limit, offset).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::books::test_support::pool;

    fn titled(title: &str) -> NewBook {
        NewBook {
            title: title.to_string(),
            ..NewBook::default()
        }
    }

    #[test]
    fn clamp_page_bounds() {
        assert_eq!(clamp_page(0, -5), (1, 0));
        assert_eq!(clamp_page(-10, 3), (1, 3));
        assert_eq!(clamp_page(501, 0), (500, 0));
        assert_eq!(clamp_page(i64::MAX, i64::MIN), (500, 0));
        assert_eq!(clamp_page(250, 40), (250, 40));
    }

    #[tokio::test]
    async fn create_trims_title() {
        let pool = pool().await;
        let mut conn = pool.acquire().await.unwrap();

        let book = create_book(&mut conn, titled("  O Hobbit \n")).await.unwrap();
        let fetched = get_book(&mut conn, book.id).await.unwrap();
        assert_eq!(fetched.title, "O Hobbit");
    }

    #[tokio::test]
    async fn create_rejects_blank_title() {
        let pool = pool().await;
        let mut conn = pool.acquire().await.unwrap();

        for title in ["", "   ", "\t\n"] {
            let err = create_book(&mut conn, titled(title)).await.unwrap_err();
            assert!(matches!(err, BookError::Validation(ref m) if m == "title required"));
        }
        assert!(list_books(&mut conn, 10, 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_never_exceeds_clamped_limit() {
        let pool = pool().await;
        let mut conn = pool.acquire().await.unwrap();
        for n in 0..3 {
            create_book(&mut conn, titled(&format!("book {n}"))).await.unwrap();
        }

        assert_eq!(list_books(&mut conn, 0, 0).await.unwrap().len(), 1);
        assert_eq!(list_books(&mut conn, -7, -7).await.unwrap().len(), 1);
        assert_eq!(list_books(&mut conn, 2, 0).await.unwrap().len(), 2);
        assert_eq!(list_books(&mut conn, 10_000, 0).await.unwrap().len(), 3);
        assert_eq!(list_books(&mut conn, 10, 2).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn newest_book_is_listed_first() {
        let pool = pool().await;
        let mut conn = pool.acquire().await.unwrap();
        create_book(&mut conn, titled("Older")).await.unwrap();
        let created = create_book(
            &mut conn,
            NewBook {
                title: "O Hobbit".to_string(),
                author: Some("J. R. R. Tolkien".to_string()),
                ..NewBook::default()
            },
        )
        .await
        .unwrap();

        let page = list_books(&mut conn, 1, 0).await.unwrap();
        assert_eq!(page, vec![created]);
    }

    #[tokio::test]
    async fn get_missing_is_not_found() {
        let pool = pool().await;
        let mut conn = pool.acquire().await.unwrap();

        let err = get_book(&mut conn, 99).await.unwrap_err();
        assert!(matches!(err, BookError::NotFound(99)));
        assert_eq!(err.to_string(), "Book 99 not found");
    }

    #[tokio::test]
    async fn update_without_title_keeps_title() {
        let pool = pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let book = create_book(&mut conn, titled("Emma")).await.unwrap();

        let updated = update_book(
            &mut conn,
            book.id,
            BookChanges {
                author: Some("X".to_string()),
                ..BookChanges::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(updated.title, "Emma");
        assert_eq!(updated.author.as_deref(), Some("X"));
    }

    #[tokio::test]
    async fn update_trims_and_validates_supplied_title() {
        let pool = pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let book = create_book(&mut conn, titled("Emma")).await.unwrap();

        let updated = update_book(
            &mut conn,
            book.id,
            BookChanges {
                title: Some("  Persuasion ".to_string()),
                ..BookChanges::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.title, "Persuasion");

        let err = update_book(
            &mut conn,
            book.id,
            BookChanges {
                title: Some("  ".to_string()),
                ..BookChanges::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, BookError::Validation(_)));
        assert_eq!(get_book(&mut conn, book.id).await.unwrap().title, "Persuasion");
    }

    #[tokio::test]
    async fn update_missing_is_not_found() {
        let pool = pool().await;
        let mut conn = pool.acquire().await.unwrap();

        let err = update_book(&mut conn, 7, BookChanges::default())
            .await
            .unwrap_err();
        assert!(matches!(err, BookError::NotFound(7)));
    }

    #[tokio::test]
    async fn update_of_row_deleted_after_lookup_is_not_found() {
        let pool = pool().await;
        let mut session = catalog_db::Session::begin(&pool).await.unwrap();

        let book = create_book(session.conn(), titled("Vanishing")).await.unwrap();
        let looked_up = get_book(session.conn(), book.id).await.unwrap();
        store::delete(session.conn(), &looked_up).await.unwrap();

        let changes = BookChanges {
            author: Some("Nobody".to_string()),
            ..BookChanges::default()
        };
        let result = write_changes(session.conn(), looked_up, changes).await;
        assert!(matches!(result, Err(BookError::NotFound(id)) if id == book.id));

        let result = session.finish(result).await;
        assert!(result.is_err());
        let mut conn = pool.acquire().await.unwrap();
        assert!(store::get(&mut conn, book.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_then_get_is_not_found() {
        let pool = pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let book = create_book(&mut conn, titled("Ephemeral")).await.unwrap();

        delete_book(&mut conn, book.id).await.unwrap();
        assert!(matches!(
            get_book(&mut conn, book.id).await,
            Err(BookError::NotFound(_))
        ));
        assert!(matches!(
            delete_book(&mut conn, book.id).await,
            Err(BookError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn search_is_case_insensitive_and_trimmed() {
        let pool = pool().await;
        let mut conn = pool.acquire().await.unwrap();
        create_book(
            &mut conn,
            NewBook {
                title: "O Hobbit".to_string(),
                author: Some("J. R. R. Tolkien".to_string()),
                ..NewBook::default()
            },
        )
        .await
        .unwrap();
        create_book(&mut conn, titled("Emma")).await.unwrap();

        let found = search_books(&mut conn, "  TOLKIEN ", 100, 0).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "O Hobbit");

        assert!(search_books(&mut conn, "tolkien", 0, -1).await.unwrap().len() == 1);
    }

    #[tokio::test]
    async fn search_rejects_blank_query() {
        let pool = pool().await;
        let mut conn = pool.acquire().await.unwrap();

        for query in ["", "   "] {
            let err = search_books(&mut conn, query, 100, 0).await.unwrap_err();
            assert!(matches!(err, BookError::Validation(_)));
        }
    }
}
