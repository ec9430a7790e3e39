//! Loan ledger on PostgreSQL

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::{
    postgres::{map_constraint, PgTx, LOANS_ONE_OPEN_PER_PAIR},
    LoanCounts, LoanLedger,
};
use crate::{
    error::{AppError, AppResult},
    models::{Loan, NewLoan},
};

const COUNT_BY_BOOK: &str = r#"
    SELECT COUNT(*) FILTER (WHERE returned_date IS NULL),
           COUNT(*) FILTER (WHERE returned_date IS NOT NULL)
    FROM loans WHERE book_id = $1
"#;

const COUNT_BY_MEMBER: &str = r#"
    SELECT COUNT(*) FILTER (WHERE returned_date IS NULL),
           COUNT(*) FILTER (WHERE returned_date IS NOT NULL)
    FROM loans WHERE member_id = $1
"#;

#[async_trait]
impl LoanLedger for PgTx {
    /// Create a new open loan; the partial unique index rejects a second one
    async fn open_loan(&mut self, loan: &NewLoan) -> AppResult<Loan> {
        sqlx::query_as::<_, Loan>(
            r#"
            INSERT INTO loans (book_id, member_id, borrowed_date, due_date)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(loan.book_id)
        .bind(loan.member_id)
        .bind(loan.borrowed_date)
        .bind(loan.due_date)
        .fetch_one(self.conn()?)
        .await
        .map_err(|e| {
            map_constraint(e, LOANS_ONE_OPEN_PER_PAIR, || AppError::DuplicateActiveLoan {
                book_id: loan.book_id,
                member_id: loan.member_id,
            })
        })
    }

    /// Close an open loan, recording return date and fine
    async fn close_loan(&mut self, loan_id: i32, returned_date: NaiveDate, fine: Decimal) -> AppResult<Loan> {
        let closed = sqlx::query_as::<_, Loan>(
            r#"
            UPDATE loans SET returned_date = $2, fine_amount = $3
            WHERE id = $1 AND returned_date IS NULL
            RETURNING *
            "#,
        )
        .bind(loan_id)
        .bind(returned_date)
        .bind(fine)
        .fetch_optional(self.conn()?)
        .await?;

        if let Some(loan) = closed {
            return Ok(loan);
        }

        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM loans WHERE id = $1)")
            .bind(loan_id)
            .fetch_one(self.conn()?)
            .await?;

        if exists {
            Err(AppError::LoanAlreadyClosed(loan_id))
        } else {
            Err(AppError::LoanIdNotFound(loan_id))
        }
    }

    /// Get the open loan of a (book, member) pair, locking it
    async fn find_open_loan(&mut self, book_id: i32, member_id: i32) -> AppResult<Option<Loan>> {
        let loan = sqlx::query_as::<_, Loan>(
            r#"
            SELECT * FROM loans
            WHERE book_id = $1 AND member_id = $2 AND returned_date IS NULL
            FOR UPDATE
            "#,
        )
        .bind(book_id)
        .bind(member_id)
        .fetch_optional(self.conn()?)
        .await?;
        Ok(loan)
    }

    /// Get open loans for a member
    async fn list_open_loans(&mut self, member_id: i32) -> AppResult<Vec<Loan>> {
        let loans = sqlx::query_as::<_, Loan>(
            "SELECT * FROM loans WHERE member_id = $1 AND returned_date IS NULL ORDER BY id",
        )
        .bind(member_id)
        .fetch_all(self.conn()?)
        .await?;
        Ok(loans)
    }

    /// Get the full loan history of a member
    async fn list_loans(&mut self, member_id: i32) -> AppResult<Vec<Loan>> {
        let loans = sqlx::query_as::<_, Loan>("SELECT * FROM loans WHERE member_id = $1 ORDER BY id")
            .bind(member_id)
            .fetch_all(self.conn()?)
            .await?;
        Ok(loans)
    }

    async fn loan_counts_for_book(&mut self, book_id: i32) -> AppResult<LoanCounts> {
        let (open, closed): (i64, i64) = sqlx::query_as(COUNT_BY_BOOK)
            .bind(book_id)
            .fetch_one(self.conn()?)
            .await?;
        Ok(LoanCounts { open, closed })
    }

    async fn loan_counts_for_member(&mut self, member_id: i32) -> AppResult<LoanCounts> {
        let (open, closed): (i64, i64) = sqlx::query_as(COUNT_BY_MEMBER)
            .bind(member_id)
            .fetch_one(self.conn()?)
            .await?;
        Ok(LoanCounts { open, closed })
    }

    /// Mark outstanding fines as settled
    async fn settle_fines(&mut self, member_id: i32, settled_on: NaiveDate) -> AppResult<Vec<Loan>> {
        let loans = sqlx::query_as::<_, Loan>(
            r#"
            UPDATE loans SET fine_settled_date = $2
            WHERE member_id = $1
              AND returned_date IS NOT NULL
              AND fine_amount > 0
              AND fine_settled_date IS NULL
            RETURNING *
            "#,
        )
        .bind(member_id)
        .bind(settled_on)
        .fetch_all(self.conn()?)
        .await?;
        Ok(loans)
    }

    async fn purge_closed_loans_for_book(&mut self, book_id: i32) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM loans WHERE book_id = $1 AND returned_date IS NOT NULL")
            .bind(book_id)
            .execute(self.conn()?)
            .await?;
        Ok(result.rows_affected())
    }

    async fn purge_closed_loans_for_member(&mut self, member_id: i32) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM loans WHERE member_id = $1 AND returned_date IS NOT NULL")
            .bind(member_id)
            .execute(self.conn()?)
            .await?;
        Ok(result.rows_affected())
    }
}
