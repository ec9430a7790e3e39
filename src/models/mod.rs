//! Data models for books, members and loans

pub mod book;
pub mod loan;
pub mod member;

// Re-export commonly used types
pub use book::{Book, BookQuery, CreateBook, UpdateBook};
pub use loan::{FineLine, FineSummary, Loan, LoanRequest, NewLoan};
pub use member::{CreateMember, Member, MemberDetails, MemberQuery, UpdateMember};
