//! Borrow, return and fine operations

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;

use super::LendingEngine;
use crate::{
    error::{AppError, AppResult},
    models::{
        loan::{overdue_days, overdue_fine},
        FineLine, FineSummary, Loan, NewLoan,
    },
    repository::{CatalogStore, LoanLedger, MembershipStore, StoreTx},
};

impl LendingEngine {
    /// Lend one copy of a book to a member.
    ///
    /// The member row is locked first, so a concurrent deactivation or a
    /// second borrow of the same pair waits for this one to finish.
    pub async fn borrow(&self, member_id: i32, book_id: i32) -> AppResult<Loan> {
        let mut tx = self.begin().await?;

        let member = tx
            .lock_member(member_id)
            .await?
            .ok_or(AppError::MemberNotFound(member_id))?;
        if !member.is_active {
            return Err(AppError::MemberInactive(member_id));
        }

        tx.book(book_id).await?.ok_or(AppError::BookNotFound(book_id))?;

        if tx.find_open_loan(book_id, member_id).await?.is_some() {
            return Err(AppError::DuplicateActiveLoan { book_id, member_id });
        }

        let book = tx.adjust_availability(book_id, -1).await?;

        let today = self.clock.today();
        let loan = tx
            .open_loan(&NewLoan {
                book_id,
                member_id,
                borrowed_date: today,
                due_date: today + Duration::days(self.config.loan_period_days),
            })
            .await?;

        tx.commit().await?;

        tracing::info!(
            "Loan opened: id={} book={} member={} due={} available={}",
            loan.id,
            book_id,
            member_id,
            loan.due_date,
            book.available_copies
        );
        Ok(loan)
    }

    /// Take a copy back and fix the loan's fine
    pub async fn return_book(&self, member_id: i32, book_id: i32) -> AppResult<Loan> {
        let mut tx = self.begin().await?;

        let loan = tx
            .find_open_loan(book_id, member_id)
            .await?
            .ok_or(AppError::LoanNotFound { book_id, member_id })?;

        let today = self.clock.today();
        let fine = overdue_fine(loan.due_date, today, self.config.fine_per_day());

        let closed = tx.close_loan(loan.id, today, fine).await?;
        let book = tx.adjust_availability(book_id, 1).await?;

        tx.commit().await?;

        tracing::info!(
            "Loan closed: id={} book={} member={} fine={} available={}",
            closed.id,
            book_id,
            member_id,
            fine,
            book.available_copies
        );
        Ok(closed)
    }

    /// Open loans of a member
    pub async fn list_loans(&self, member_id: i32) -> AppResult<Vec<Loan>> {
        let mut tx = self.begin().await?;
        tx.member(member_id)
            .await?
            .ok_or(AppError::MemberNotFound(member_id))?;
        tx.list_open_loans(member_id).await
    }

    /// Fine statement of a member
    pub async fn check_fines(&self, member_id: i32) -> AppResult<FineSummary> {
        let mut tx = self.begin().await?;
        tx.member(member_id)
            .await?
            .ok_or(AppError::MemberNotFound(member_id))?;
        let loans = tx.list_loans(member_id).await?;

        Ok(fine_summary(
            member_id,
            &loans,
            self.clock.today(),
            self.config.fine_per_day(),
        ))
    }

    /// Record that the member paid every outstanding fine. Returns the loans
    /// whose fines were settled.
    pub async fn settle_fines(&self, member_id: i32) -> AppResult<Vec<Loan>> {
        let mut tx = self.begin().await?;
        tx.lock_member(member_id)
            .await?
            .ok_or(AppError::MemberNotFound(member_id))?;

        let settled = tx.settle_fines(member_id, self.clock.today()).await?;
        tx.commit().await?;

        let amount: Decimal = settled.iter().filter_map(|loan| loan.fine_amount).sum();
        tracing::info!(
            "Fines settled: member={} loans={} amount={}",
            member_id,
            settled.len(),
            amount
        );
        Ok(settled)
    }
}

/// Build a fine statement from a member's loans as of `today`.
///
/// Closed loans contribute their recorded, unsettled fine to `total`. Open
/// overdue loans contribute what they would owe if returned today to
/// `accruing` only.
pub(crate) fn fine_summary(member_id: i32, loans: &[Loan], today: NaiveDate, per_day: Decimal) -> FineSummary {
    let mut summary = FineSummary {
        member_id,
        per_loan: Vec::new(),
        total: Decimal::ZERO,
        accruing: Decimal::ZERO,
        overdue_open_loans: 0,
    };

    for loan in loans {
        match loan.returned_date {
            Some(returned) => {
                let amount = loan.unpaid_fine();
                if amount > Decimal::ZERO {
                    summary.total += amount;
                    summary.per_loan.push(FineLine {
                        loan_id: loan.id,
                        book_id: loan.book_id,
                        due_date: loan.due_date,
                        returned_date: Some(returned),
                        overdue_days: overdue_days(loan.due_date, returned),
                        amount,
                        finalized: true,
                    });
                }
            }
            None if loan.due_date < today => {
                let amount = overdue_fine(loan.due_date, today, per_day);
                summary.accruing += amount;
                summary.overdue_open_loans += 1;
                summary.per_loan.push(FineLine {
                    loan_id: loan.id,
                    book_id: loan.book_id,
                    due_date: loan.due_date,
                    returned_date: None,
                    overdue_days: overdue_days(loan.due_date, today),
                    amount,
                    finalized: false,
                });
            }
            None => {}
        }
    }

    summary
}
