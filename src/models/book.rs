//! Book model and related request types

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Book as stored in the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub total_copies: i32,
    /// Copies currently on the shelf; always between 0 and `total_copies`
    pub available_copies: i32,
    pub genre: Option<String>,
}

impl Book {
    pub fn copies_on_loan(&self) -> i32 {
        self.total_copies - self.available_copies
    }
}

/// Add a book to the catalog
#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(min = 1, message = "Title must not be empty"))]
    pub title: String,
    #[validate(length(min = 1, message = "Author must not be empty"))]
    pub author: String,
    #[validate(length(min = 1, message = "ISBN must not be empty"))]
    pub isbn: String,
    #[serde(default = "default_total_copies")]
    #[validate(range(min = 1, message = "A book needs at least one copy"))]
    pub total_copies: i32,
    pub genre: Option<String>,
}

fn default_total_copies() -> i32 {
    1
}

/// Partial update of a catalog entry. Availability is derived, never patched.
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate, ToSchema)]
pub struct UpdateBook {
    #[validate(length(min = 1, message = "Title must not be empty"))]
    pub title: Option<String>,
    #[validate(length(min = 1, message = "Author must not be empty"))]
    pub author: Option<String>,
    #[validate(length(min = 1, message = "ISBN must not be empty"))]
    pub isbn: Option<String>,
    #[validate(range(min = 1, message = "A book needs at least one copy"))]
    pub total_copies: Option<i32>,
    pub genre: Option<String>,
}

/// Catalog listing filters; text filters are case-insensitive partial matches
#[derive(Debug, Clone, Default, Deserialize, Serialize, IntoParams, ToSchema)]
pub struct BookQuery {
    pub title: Option<String>,
    pub author: Option<String>,
    pub genre: Option<String>,
    /// Only books with at least one copy on the shelf
    #[serde(default)]
    pub available_only: bool,
}

impl BookQuery {
    pub fn matches(&self, book: &Book) -> bool {
        contains_ci(&book.title, self.title.as_deref())
            && contains_ci(&book.author, self.author.as_deref())
            && match (&book.genre, self.genre.as_deref()) {
                (_, None) => true,
                (Some(genre), needle) => contains_ci(genre, needle),
                (None, Some(_)) => false,
            }
            && (!self.available_only || book.available_copies > 0)
    }
}

pub(crate) fn contains_ci(haystack: &str, needle: Option<&str>) -> bool {
    match needle {
        Some(needle) => haystack.to_lowercase().contains(&needle.to_lowercase()),
        None => true,
    }
}
