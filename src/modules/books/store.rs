//! Record store for books.
//!
//! Plain queries over one table. No validation happens here; callers hand
//! in already-cleaned values. Point lookups return `None` for missing rows.

use chrono::Utc;

use catalog_db::Connection;

use super::models::{Book, BookChanges, NewBook};

pub async fn create(conn: &mut Connection, book: NewBook) -> sqlx::Result<Book> {
    sqlx::query_as::<_, Book>(
        r#"
        INSERT INTO books (title, author, publisher, purchase_link, created_at)
        VALUES (?, ?, ?, ?, ?)
        RETURNING id, title, author, publisher, purchase_link, created_at
        "#,
    )
    .bind(book.title)
    .bind(book.author)
    .bind(book.publisher)
    .bind(book.purchase_link)
    .bind(Utc::now())
    .fetch_one(&mut *conn)
    .await
}

pub async fn get(conn: &mut Connection, id: i64) -> sqlx::Result<Option<Book>> {
    sqlx::query_as::<_, Book>(
        r#"
        SELECT id, title, author, publisher, purchase_link, created_at
        FROM books
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await
}

/// Newest first; `id` breaks ties between rows created in the same instant.
pub async fn list(conn: &mut Connection, limit: i64, offset: i64) -> sqlx::Result<Vec<Book>> {
    sqlx::query_as::<_, Book>(
        r#"
        SELECT id, title, author, publisher, purchase_link, created_at
        FROM books
        ORDER BY created_at DESC, id DESC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(&mut *conn)
    .await
}

/// Write the supplied fields over `book` and return the stored row.
pub async fn update(
    conn: &mut Connection,
    mut book: Book,
    changes: BookChanges,
) -> sqlx::Result<Book> {
    changes.apply_to(&mut book);

    sqlx::query_as::<_, Book>(
        r#"
        UPDATE books
        SET title = ?, author = ?, publisher = ?, purchase_link = ?
        WHERE id = ?
        RETURNING id, title, author, publisher, purchase_link, created_at
        "#,
    )
    .bind(book.title)
    .bind(book.author)
    .bind(book.publisher)
    .bind(book.purchase_link)
    .bind(book.id)
    .fetch_one(&mut *conn)
    .await
}

pub async fn delete(conn: &mut Connection, book: &Book) -> sqlx::Result<()> {
    sqlx::query("DELETE FROM books WHERE id = ?")
        .bind(book.id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Case-insensitive substring match on title, author or publisher.
pub async fn search(
    conn: &mut Connection,
    query: &str,
    limit: i64,
    offset: i64,
) -> sqlx::Result<Vec<Book>> {
    let pattern = like_pattern(query);

    sqlx::query_as::<_, Book>(
        r#"
        SELECT id, title, author, publisher, purchase_link, created_at
        FROM books
        WHERE LOWER(title) LIKE ? ESCAPE '\'
           OR LOWER(author) LIKE ? ESCAPE '\'
           OR LOWER(publisher) LIKE ? ESCAPE '\'
        ORDER BY created_at DESC, id DESC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(&pattern)
    .bind(&pattern)
    .bind(&pattern)
    .bind(limit)
    .bind(offset)
    .fetch_all(&mut *conn)
    .await
}

/// `%query%` with LIKE wildcards in the query matched literally.
fn like_pattern(query: &str) -> String {
    let mut pattern = String::with_capacity(query.len() + 2);
    pattern.push('%');
    for ch in query.to_lowercase().chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}
