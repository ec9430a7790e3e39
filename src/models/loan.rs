//! Loan model, fine arithmetic and related request types

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// A loan binds one copy of a book to a member.
///
/// `returned_date == None` means the loan is open. A loan closes exactly once;
/// `fine_amount` is fixed at that moment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Loan {
    pub id: i32,
    pub book_id: i32,
    pub member_id: i32,
    pub borrowed_date: NaiveDate,
    pub due_date: NaiveDate,
    pub returned_date: Option<NaiveDate>,
    pub fine_amount: Option<Decimal>,
    /// Set by the surrounding system once a fine has been paid
    pub fine_settled_date: Option<NaiveDate>,
}

impl Loan {
    pub fn is_open(&self) -> bool {
        self.returned_date.is_none()
    }

    /// Fine recorded at return that nobody has settled yet
    pub fn unpaid_fine(&self) -> Decimal {
        match (self.returned_date, self.fine_amount, self.fine_settled_date) {
            (Some(_), Some(fine), None) => fine,
            _ => Decimal::ZERO,
        }
    }
}

/// Values for a loan about to be opened
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLoan {
    pub book_id: i32,
    pub member_id: i32,
    pub borrowed_date: NaiveDate,
    pub due_date: NaiveDate,
}

/// Number of whole days past the due date, never negative
pub fn overdue_days(due_date: NaiveDate, on: NaiveDate) -> i64 {
    (on - due_date).num_days().max(0)
}

/// Fine for returning on `on`: overdue days times the daily rate, rounded
/// half-up to cents.
pub fn overdue_fine(due_date: NaiveDate, on: NaiveDate, per_day: Decimal) -> Decimal {
    (per_day * Decimal::from(overdue_days(due_date, on)))
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Borrow or return request; both name the same (book, member) pair
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Validate, ToSchema)]
pub struct LoanRequest {
    #[validate(range(min = 1, message = "book_id must be positive"))]
    pub book_id: i32,
    #[validate(range(min = 1, message = "member_id must be positive"))]
    pub member_id: i32,
}

/// One line of a member's fine statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FineLine {
    pub loan_id: i32,
    pub book_id: i32,
    pub due_date: NaiveDate,
    pub returned_date: Option<NaiveDate>,
    pub overdue_days: i64,
    pub amount: Decimal,
    /// False for open loans, whose amount is only a projection
    pub finalized: bool,
}

/// Outstanding fines of a member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FineSummary {
    pub member_id: i32,
    pub per_loan: Vec<FineLine>,
    /// Sum of unsettled fines on closed loans
    pub total: Decimal,
    /// What open overdue loans would owe if returned today; not part of `total`
    pub accruing: Decimal,
    pub overdue_open_loans: i64,
}
