//! Catalog store on PostgreSQL

use async_trait::async_trait;

use super::{
    postgres::{map_constraint, PgTx, BOOKS_ISBN_KEY},
    CatalogStore,
};
use crate::{
    error::{AppError, AppResult},
    models::{Book, BookQuery, CreateBook, UpdateBook},
};

#[async_trait]
impl CatalogStore for PgTx {
    /// Create a new book
    async fn insert_book(&mut self, book: &CreateBook) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (title, author, isbn, total_copies, available_copies, genre)
            VALUES ($1, $2, $3, $4, $4, $5)
            RETURNING *
            "#,
        )
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.isbn)
        .bind(book.total_copies)
        .bind(&book.genre)
        .fetch_one(self.conn()?)
        .await
        .map_err(|e| map_constraint(e, BOOKS_ISBN_KEY, || AppError::DuplicateIsbn(book.isbn.clone())))
    }

    /// Get book by ID
    async fn book(&mut self, id: i32) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(self.conn()?)
            .await?;
        Ok(book)
    }

    async fn lock_book(&mut self, id: i32) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(self.conn()?)
            .await?;
        Ok(book)
    }

    /// Search books with filters
    async fn list_books(&mut self, query: &BookQuery) -> AppResult<Vec<Book>> {
        let mut conditions = Vec::new();
        let mut params: Vec<String> = Vec::new();

        if let Some(ref title) = query.title {
            params.push(format!("%{}%", title));
            conditions.push(format!("title ILIKE ${}", params.len()));
        }

        if let Some(ref author) = query.author {
            params.push(format!("%{}%", author));
            conditions.push(format!("author ILIKE ${}", params.len()));
        }

        if let Some(ref genre) = query.genre {
            params.push(format!("%{}%", genre));
            conditions.push(format!("genre ILIKE ${}", params.len()));
        }

        if query.available_only {
            conditions.push("available_copies > 0".to_string());
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let select_query = format!("SELECT * FROM books {} ORDER BY id", where_clause);

        let mut select_builder = sqlx::query_as::<_, Book>(&select_query);
        for param in &params {
            select_builder = select_builder.bind(param);
        }
        let books = select_builder.fetch_all(self.conn()?).await?;

        Ok(books)
    }

    /// Update a book; availability follows a change of total copies
    async fn update_book(&mut self, id: i32, patch: &UpdateBook) -> AppResult<Book> {
        // Right-hand sides all read the pre-update row
        let updated = sqlx::query_as::<_, Book>(
            r#"
            UPDATE books SET
                title = COALESCE($2, title),
                author = COALESCE($3, author),
                isbn = COALESCE($4, isbn),
                available_copies = available_copies + (COALESCE($5, total_copies) - total_copies),
                total_copies = COALESCE($5, total_copies),
                genre = COALESCE($6, genre)
            WHERE id = $1
              AND available_copies + (COALESCE($5, total_copies) - total_copies) >= 0
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&patch.title)
        .bind(&patch.author)
        .bind(&patch.isbn)
        .bind(patch.total_copies)
        .bind(&patch.genre)
        .fetch_optional(self.conn()?)
        .await
        .map_err(|e| {
            map_constraint(e, BOOKS_ISBN_KEY, || {
                AppError::DuplicateIsbn(patch.isbn.clone().unwrap_or_default())
            })
        })?;

        if let Some(book) = updated {
            return Ok(book);
        }

        match self.book(id).await? {
            None => Err(AppError::BookNotFound(id)),
            Some(book) => Err(AppError::CopiesOnLoan {
                book_id: id,
                on_loan: book.copies_on_loan(),
            }),
        }
    }

    /// Delete a book that no loan refers to
    async fn delete_book(&mut self, id: i32) -> AppResult<()> {
        let references: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM loans WHERE book_id = $1")
            .bind(id)
            .fetch_one(self.conn()?)
            .await?;

        if references > 0 {
            return Err(AppError::HasActiveReferences {
                entity: "Book",
                id,
                count: references,
            });
        }

        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(self.conn()?)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::BookNotFound(id));
        }
        Ok(())
    }

    /// Move `available_copies` by `delta` in a single conditional update
    async fn adjust_availability(&mut self, id: i32, delta: i32) -> AppResult<Book> {
        let updated = sqlx::query_as::<_, Book>(
            r#"
            UPDATE books SET available_copies = available_copies + $2
            WHERE id = $1
              AND available_copies + $2 BETWEEN 0 AND total_copies
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(delta)
        .fetch_optional(self.conn()?)
        .await?;

        if let Some(book) = updated {
            return Ok(book);
        }

        match self.book(id).await? {
            None => Err(AppError::BookNotFound(id)),
            Some(book) if book.available_copies + delta < 0 => Err(AppError::InventoryExhausted(id)),
            Some(_) => Err(AppError::InventoryOverflow(id)),
        }
    }
}
