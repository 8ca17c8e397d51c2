use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A catalogued book, as stored and as sent over the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Book {
    /// Unique identifier for the book, assigned on insert
    pub id: i64,
    /// Title of the book, never blank
    pub title: String,
    /// Author of the book
    pub author: Option<String>,
    /// Publisher of the book
    pub publisher: Option<String>,
    /// Where the book can be bought
    pub purchase_link: Option<String>,
    /// When the book was catalogued
    pub created_at: DateTime<Utc>,
}

/// Request model for creating a book, also the full-replacement payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NewBook {
    pub title: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub purchase_link: Option<String>,
}

/// Fields to overwrite on an existing book. `None` leaves the field as is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BookChanges {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub purchase_link: Option<String>,
}

impl From<NewBook> for BookChanges {
    fn from(book: NewBook) -> Self {
        Self {
            title: Some(book.title),
            author: book.author,
            publisher: book.publisher,
            purchase_link: book.purchase_link,
        }
    }
}

impl BookChanges {
    /// Overwrite the supplied fields on `book`.
    pub fn apply_to(self, book: &mut Book) {
        if let Some(title) = self.title {
            book.title = title;
        }
        if let Some(author) = self.author {
            book.author = Some(author);
        }
        if let Some(publisher) = self.publisher {
            book.publisher = Some(publisher);
        }
        if let Some(purchase_link) = self.purchase_link {
            book.purchase_link = Some(purchase_link);
        }
    }
}
