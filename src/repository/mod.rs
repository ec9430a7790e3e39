//! Storage layer: catalog, membership and loan ledger behind one transaction

pub mod books;
pub mod loans;
pub mod members;
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::{
    error::AppResult,
    models::{Book, BookQuery, CreateBook, Loan, Member, MemberQuery, NewLoan, UpdateBook, UpdateMember},
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Open and closed loan counts referencing a book or a member
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoanCounts {
    pub open: i64,
    pub closed: i64,
}

impl LoanCounts {
    pub fn total(&self) -> i64 {
        self.open + self.closed
    }
}

/// Durable record of books and their copy counts
#[async_trait]
pub trait CatalogStore: Send {
    /// Insert a book with every copy available. Fails `DuplicateIsbn`.
    async fn insert_book(&mut self, book: &CreateBook) -> AppResult<Book>;

    async fn book(&mut self, id: i32) -> AppResult<Option<Book>>;

    /// Like [`CatalogStore::book`] but holds the row until the transaction ends
    async fn lock_book(&mut self, id: i32) -> AppResult<Option<Book>>;

    async fn list_books(&mut self, query: &BookQuery) -> AppResult<Vec<Book>>;

    /// Apply a patch. A new `total_copies` shifts `available_copies` by the
    /// same delta in one step; fails `CopiesOnLoan` if that would go negative.
    async fn update_book(&mut self, id: i32, patch: &UpdateBook) -> AppResult<Book>;

    /// Fails `HasActiveReferences` while any loan row points at the book
    async fn delete_book(&mut self, id: i32) -> AppResult<()>;

    /// Atomic check-and-add on `available_copies`. Fails `InventoryExhausted`
    /// below zero and `InventoryOverflow` above `total_copies`.
    async fn adjust_availability(&mut self, id: i32, delta: i32) -> AppResult<Book>;
}

/// Durable record of members
#[async_trait]
pub trait MembershipStore: Send {
    /// Fails `DuplicateEmail`
    async fn insert_member(
        &mut self,
        name: &str,
        email: &str,
        joined_date: NaiveDate,
        is_active: bool,
    ) -> AppResult<Member>;

    async fn member(&mut self, id: i32) -> AppResult<Option<Member>>;

    /// Like [`MembershipStore::member`] but serializes against other writers
    /// of the same member until the transaction ends
    async fn lock_member(&mut self, id: i32) -> AppResult<Option<Member>>;

    async fn list_members(&mut self, query: &MemberQuery) -> AppResult<Vec<Member>>;

    /// Fails `DuplicateEmail`
    async fn update_member(&mut self, id: i32, patch: &UpdateMember) -> AppResult<Member>;

    /// Fails `HasActiveReferences` while any loan row points at the member
    async fn delete_member(&mut self, id: i32) -> AppResult<()>;
}

/// Append-biased record of loans; home of the open -> closed transition
#[async_trait]
pub trait LoanLedger: Send {
    /// Fails `DuplicateActiveLoan` if the pair already has an open loan
    async fn open_loan(&mut self, loan: &NewLoan) -> AppResult<Loan>;

    /// Fails `LoanIdNotFound` or `LoanAlreadyClosed`
    async fn close_loan(&mut self, loan_id: i32, returned_date: NaiveDate, fine: Decimal) -> AppResult<Loan>;

    async fn find_open_loan(&mut self, book_id: i32, member_id: i32) -> AppResult<Option<Loan>>;

    async fn list_open_loans(&mut self, member_id: i32) -> AppResult<Vec<Loan>>;

    /// Every loan of the member, open and closed, oldest first
    async fn list_loans(&mut self, member_id: i32) -> AppResult<Vec<Loan>>;

    async fn loan_counts_for_book(&mut self, book_id: i32) -> AppResult<LoanCounts>;

    async fn loan_counts_for_member(&mut self, member_id: i32) -> AppResult<LoanCounts>;

    /// Mark every unsettled closed-loan fine of the member as settled
    async fn settle_fines(&mut self, member_id: i32, settled_on: NaiveDate) -> AppResult<Vec<Loan>>;

    /// Remove closed loans of a book; open loans are left alone
    async fn purge_closed_loans_for_book(&mut self, book_id: i32) -> AppResult<u64>;

    /// Remove closed loans of a member; open loans are left alone
    async fn purge_closed_loans_for_member(&mut self, member_id: i32) -> AppResult<u64>;
}

/// One unit of work over all three stores.
///
/// Dropping a transaction without calling [`StoreTx::commit`] discards every
/// change made through it.
#[async_trait]
pub trait StoreTx: CatalogStore + MembershipStore + LoanLedger {
    async fn commit(&mut self) -> AppResult<()>;
}

/// Transactional data store shared by every request
#[async_trait]
pub trait Store: Send + Sync {
    /// Start a transaction; fails `StoreBusy` if none can be had in time
    async fn begin(&self) -> AppResult<Box<dyn StoreTx>>;

    /// Cheap connectivity check for readiness probes
    async fn ping(&self) -> AppResult<()>;
}
