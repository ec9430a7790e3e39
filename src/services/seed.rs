//! Demo catalog and members for a fresh store

use super::LendingEngine;
use crate::{
    error::AppResult,
    models::{BookQuery, CreateBook, CreateMember},
};

const BOOKS: &[(&str, &str, &str, i32, &str)] = &[
    ("The Great Gatsby", "F. Scott Fitzgerald", "978-0-7432-7356-5", 3, "Fiction"),
    ("To Kill a Mockingbird", "Harper Lee", "978-0-06-112008-4", 2, "Fiction"),
    ("1984", "George Orwell", "978-0-452-28423-4", 4, "Dystopian"),
    ("Pride and Prejudice", "Jane Austen", "978-0-14-143951-8", 2, "Romance"),
    ("The Hobbit", "J.R.R. Tolkien", "978-0-547-92822-7", 3, "Fantasy"),
];

const MEMBERS: &[(&str, &str)] = &[
    ("Alice Johnson", "alice@example.com"),
    ("Bob Smith", "bob@example.com"),
    ("Carol White", "carol@example.com"),
];

impl LendingEngine {
    /// Seed demo data through the regular operations. Does nothing when the
    /// catalog already has books. Returns whether anything was added.
    pub async fn seed_demo_data(&self) -> AppResult<bool> {
        if !self.list_books(&BookQuery::default()).await?.is_empty() {
            tracing::info!("Catalog already populated, skipping demo data");
            return Ok(false);
        }

        for (title, author, isbn, copies, genre) in BOOKS {
            self.create_book(CreateBook {
                title: title.to_string(),
                author: author.to_string(),
                isbn: isbn.to_string(),
                total_copies: *copies,
                genre: Some(genre.to_string()),
            })
            .await?;
        }

        for (name, email) in MEMBERS {
            self.register_member(CreateMember {
                name: name.to_string(),
                email: email.to_string(),
                joined_date: None,
                is_active: Some(true),
            })
            .await?;
        }

        tracing::info!("Seeded {} books and {} members", BOOKS.len(), MEMBERS.len());
        Ok(true)
    }
}
