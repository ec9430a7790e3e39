//! Catalog operations

use super::LendingEngine;
use crate::{
    config::HistoryPolicy,
    error::{AppError, AppResult},
    models::{Book, BookQuery, CreateBook, UpdateBook},
    repository::{CatalogStore, LoanLedger, StoreTx},
};

impl LendingEngine {
    /// Add a book with every copy on the shelf
    pub async fn create_book(&self, book: CreateBook) -> AppResult<Book> {
        let mut tx = self.begin().await?;
        let created = tx.insert_book(&book).await?;
        tx.commit().await?;

        tracing::info!("Catalog create: book id={} isbn={}", created.id, created.isbn);
        Ok(created)
    }

    pub async fn get_book(&self, id: i32) -> AppResult<Book> {
        let mut tx = self.begin().await?;
        tx.book(id).await?.ok_or(AppError::BookNotFound(id))
    }

    /// Search books with filters
    pub async fn list_books(&self, query: &BookQuery) -> AppResult<Vec<Book>> {
        let mut tx = self.begin().await?;
        tx.list_books(query).await
    }

    /// Update catalog fields. Changing `total_copies` moves `available_copies`
    /// by the same amount.
    pub async fn update_book(&self, id: i32, patch: UpdateBook) -> AppResult<Book> {
        let mut tx = self.begin().await?;
        let updated = tx.update_book(id, &patch).await?;
        tx.commit().await?;

        tracing::info!(
            "Catalog update: book id={} total={} available={}",
            updated.id,
            updated.total_copies,
            updated.available_copies
        );
        Ok(updated)
    }

    /// Remove a book. Open loans always block; closed ones follow the
    /// configured history policy.
    pub async fn delete_book(&self, id: i32) -> AppResult<()> {
        let mut tx = self.begin().await?;
        tx.lock_book(id).await?.ok_or(AppError::BookNotFound(id))?;

        let counts = tx.loan_counts_for_book(id).await?;
        if counts.open > 0 {
            return Err(AppError::HasActiveReferences {
                entity: "Book",
                id,
                count: counts.open,
            });
        }

        if counts.closed > 0 {
            match self.config.history_policy {
                HistoryPolicy::Block => {
                    return Err(AppError::HasActiveReferences {
                        entity: "Book",
                        id,
                        count: counts.closed,
                    });
                }
                HistoryPolicy::Cascade => {
                    let purged = tx.purge_closed_loans_for_book(id).await?;
                    tracing::info!("Catalog delete: purged {} closed loan(s) of book id={}", purged, id);
                }
            }
        }

        tx.delete_book(id).await?;
        tx.commit().await?;

        tracing::info!("Catalog delete: book id={}", id);
        Ok(())
    }
}
