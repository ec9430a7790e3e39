//! In-process store.
//!
//! One mutex guards all tables, so transactions are fully serialized. A
//! transaction edits a staged copy of the tables and publishes it on commit;
//! dropping it leaves the shared tables untouched.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{CatalogStore, LoanCounts, LoanLedger, MembershipStore, Store, StoreTx};
use crate::{
    error::{AppError, AppResult},
    models::{Book, BookQuery, CreateBook, Loan, Member, MemberQuery, NewLoan, UpdateBook, UpdateMember},
};

#[derive(Debug, Default, Clone)]
struct Tables {
    books: BTreeMap<i32, Book>,
    members: BTreeMap<i32, Member>,
    loans: BTreeMap<i32, Loan>,
    last_book_id: i32,
    last_member_id: i32,
    last_loan_id: i32,
}

fn next_id(last: &mut i32) -> i32 {
    *last += 1;
    *last
}

impl Tables {
    fn counts(&self, matches: impl Fn(&Loan) -> bool) -> LoanCounts {
        self.loans
            .values()
            .filter(|loan| matches(loan))
            .fold(LoanCounts::default(), |mut counts, loan| {
                if loan.is_open() {
                    counts.open += 1;
                } else {
                    counts.closed += 1;
                }
                counts
            })
    }

    fn purge_closed(&mut self, matches: impl Fn(&Loan) -> bool) -> u64 {
        let before = self.loans.len();
        self.loans.retain(|_, loan| loan.is_open() || !matches(loan));
        (before - self.loans.len()) as u64
    }
}

#[derive(Clone)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
    lock_timeout: Duration,
}

impl MemoryStore {
    pub fn new(lock_timeout: Duration) -> Self {
        Self {
            tables: Arc::new(Mutex::new(Tables::default())),
            lock_timeout,
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> AppResult<Box<dyn StoreTx>> {
        let guard = tokio::time::timeout(self.lock_timeout, self.tables.clone().lock_owned())
            .await
            .map_err(|_| AppError::StoreBusy)?;
        let staged = Tables::clone(&guard);
        Ok(Box::new(MemoryTx {
            guard,
            staged: Some(staged),
        }))
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}

pub struct MemoryTx {
    guard: OwnedMutexGuard<Tables>,
    staged: Option<Tables>,
}

impl MemoryTx {
    fn tables(&mut self) -> AppResult<&mut Tables> {
        self.staged
            .as_mut()
            .ok_or_else(|| AppError::Internal("transaction already committed".to_string()))
    }
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn commit(&mut self) -> AppResult<()> {
        let staged = self
            .staged
            .take()
            .ok_or_else(|| AppError::Internal("transaction already committed".to_string()))?;
        *self.guard = staged;
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for MemoryTx {
    async fn insert_book(&mut self, book: &CreateBook) -> AppResult<Book> {
        let t = self.tables()?;
        if t.books.values().any(|b| b.isbn == book.isbn) {
            return Err(AppError::DuplicateIsbn(book.isbn.clone()));
        }
        let id = next_id(&mut t.last_book_id);
        let created = Book {
            id,
            title: book.title.clone(),
            author: book.author.clone(),
            isbn: book.isbn.clone(),
            total_copies: book.total_copies,
            available_copies: book.total_copies,
            genre: book.genre.clone(),
        };
        t.books.insert(id, created.clone());
        Ok(created)
    }

    async fn book(&mut self, id: i32) -> AppResult<Option<Book>> {
        Ok(self.tables()?.books.get(&id).cloned())
    }

    async fn lock_book(&mut self, id: i32) -> AppResult<Option<Book>> {
        self.book(id).await
    }

    async fn list_books(&mut self, query: &BookQuery) -> AppResult<Vec<Book>> {
        Ok(self
            .tables()?
            .books
            .values()
            .filter(|book| query.matches(book))
            .cloned()
            .collect())
    }

    async fn update_book(&mut self, id: i32, patch: &UpdateBook) -> AppResult<Book> {
        let t = self.tables()?;
        if let Some(isbn) = &patch.isbn {
            if t.books.values().any(|b| b.id != id && &b.isbn == isbn) {
                return Err(AppError::DuplicateIsbn(isbn.clone()));
            }
        }
        let book = t.books.get_mut(&id).ok_or(AppError::BookNotFound(id))?;

        if let Some(total) = patch.total_copies {
            let available = book.available_copies + (total - book.total_copies);
            if available < 0 {
                return Err(AppError::CopiesOnLoan {
                    book_id: id,
                    on_loan: book.copies_on_loan(),
                });
            }
            book.total_copies = total;
            book.available_copies = available;
        }
        if let Some(title) = &patch.title {
            book.title = title.clone();
        }
        if let Some(author) = &patch.author {
            book.author = author.clone();
        }
        if let Some(isbn) = &patch.isbn {
            book.isbn = isbn.clone();
        }
        if let Some(genre) = &patch.genre {
            book.genre = Some(genre.clone());
        }
        Ok(book.clone())
    }

    async fn delete_book(&mut self, id: i32) -> AppResult<()> {
        let t = self.tables()?;
        if !t.books.contains_key(&id) {
            return Err(AppError::BookNotFound(id));
        }
        let references = t.counts(|loan| loan.book_id == id).total();
        if references > 0 {
            return Err(AppError::HasActiveReferences {
                entity: "Book",
                id,
                count: references,
            });
        }
        t.books.remove(&id);
        Ok(())
    }

    async fn adjust_availability(&mut self, id: i32, delta: i32) -> AppResult<Book> {
        let book = self
            .tables()?
            .books
            .get_mut(&id)
            .ok_or(AppError::BookNotFound(id))?;
        let next = book.available_copies + delta;
        if next < 0 {
            return Err(AppError::InventoryExhausted(id));
        }
        if next > book.total_copies {
            return Err(AppError::InventoryOverflow(id));
        }
        book.available_copies = next;
        Ok(book.clone())
    }
}

#[async_trait]
impl MembershipStore for MemoryTx {
    async fn insert_member(
        &mut self,
        name: &str,
        email: &str,
        joined_date: NaiveDate,
        is_active: bool,
    ) -> AppResult<Member> {
        let t = self.tables()?;
        if t.members.values().any(|m| m.email == email) {
            return Err(AppError::DuplicateEmail(email.to_string()));
        }
        let id = next_id(&mut t.last_member_id);
        let member = Member {
            id,
            name: name.to_string(),
            email: email.to_string(),
            joined_date,
            is_active,
        };
        t.members.insert(id, member.clone());
        Ok(member)
    }

    async fn member(&mut self, id: i32) -> AppResult<Option<Member>> {
        Ok(self.tables()?.members.get(&id).cloned())
    }

    async fn lock_member(&mut self, id: i32) -> AppResult<Option<Member>> {
        self.member(id).await
    }

    async fn list_members(&mut self, query: &MemberQuery) -> AppResult<Vec<Member>> {
        Ok(self
            .tables()?
            .members
            .values()
            .filter(|member| query.matches(member))
            .skip(query.offset() as usize)
            .take(query.page_size() as usize)
            .cloned()
            .collect())
    }

    async fn update_member(&mut self, id: i32, patch: &UpdateMember) -> AppResult<Member> {
        let t = self.tables()?;
        if let Some(email) = &patch.email {
            if t.members.values().any(|m| m.id != id && &m.email == email) {
                return Err(AppError::DuplicateEmail(email.clone()));
            }
        }
        let member = t.members.get_mut(&id).ok_or(AppError::MemberNotFound(id))?;
        if let Some(name) = &patch.name {
            member.name = name.clone();
        }
        if let Some(email) = &patch.email {
            member.email = email.clone();
        }
        if let Some(is_active) = patch.is_active {
            member.is_active = is_active;
        }
        Ok(member.clone())
    }

    async fn delete_member(&mut self, id: i32) -> AppResult<()> {
        let t = self.tables()?;
        if !t.members.contains_key(&id) {
            return Err(AppError::MemberNotFound(id));
        }
        let references = t.counts(|loan| loan.member_id == id).total();
        if references > 0 {
            return Err(AppError::HasActiveReferences {
                entity: "Member",
                id,
                count: references,
            });
        }
        t.members.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl LoanLedger for MemoryTx {
    async fn open_loan(&mut self, loan: &NewLoan) -> AppResult<Loan> {
        let t = self.tables()?;
        if t.loans
            .values()
            .any(|l| l.is_open() && l.book_id == loan.book_id && l.member_id == loan.member_id)
        {
            return Err(AppError::DuplicateActiveLoan {
                book_id: loan.book_id,
                member_id: loan.member_id,
            });
        }
        let id = next_id(&mut t.last_loan_id);
        let opened = Loan {
            id,
            book_id: loan.book_id,
            member_id: loan.member_id,
            borrowed_date: loan.borrowed_date,
            due_date: loan.due_date,
            returned_date: None,
            fine_amount: None,
            fine_settled_date: None,
        };
        t.loans.insert(id, opened.clone());
        Ok(opened)
    }

    async fn close_loan(&mut self, loan_id: i32, returned_date: NaiveDate, fine: Decimal) -> AppResult<Loan> {
        let loan = self
            .tables()?
            .loans
            .get_mut(&loan_id)
            .ok_or(AppError::LoanIdNotFound(loan_id))?;
        if !loan.is_open() {
            return Err(AppError::LoanAlreadyClosed(loan_id));
        }
        loan.returned_date = Some(returned_date);
        loan.fine_amount = Some(fine);
        Ok(loan.clone())
    }

    async fn find_open_loan(&mut self, book_id: i32, member_id: i32) -> AppResult<Option<Loan>> {
        Ok(self
            .tables()?
            .loans
            .values()
            .find(|l| l.is_open() && l.book_id == book_id && l.member_id == member_id)
            .cloned())
    }

    async fn list_open_loans(&mut self, member_id: i32) -> AppResult<Vec<Loan>> {
        Ok(self
            .tables()?
            .loans
            .values()
            .filter(|l| l.is_open() && l.member_id == member_id)
            .cloned()
            .collect())
    }

    async fn list_loans(&mut self, member_id: i32) -> AppResult<Vec<Loan>> {
        Ok(self
            .tables()?
            .loans
            .values()
            .filter(|l| l.member_id == member_id)
            .cloned()
            .collect())
    }

    async fn loan_counts_for_book(&mut self, book_id: i32) -> AppResult<LoanCounts> {
        Ok(self.tables()?.counts(|loan| loan.book_id == book_id))
    }

    async fn loan_counts_for_member(&mut self, member_id: i32) -> AppResult<LoanCounts> {
        Ok(self.tables()?.counts(|loan| loan.member_id == member_id))
    }

    async fn settle_fines(&mut self, member_id: i32, settled_on: NaiveDate) -> AppResult<Vec<Loan>> {
        let mut settled = Vec::new();
        for loan in self.tables()?.loans.values_mut() {
            if loan.member_id == member_id && loan.unpaid_fine() > Decimal::ZERO {
                loan.fine_settled_date = Some(settled_on);
                settled.push(loan.clone());
            }
        }
        Ok(settled)
    }

    async fn purge_closed_loans_for_book(&mut self, book_id: i32) -> AppResult<u64> {
        Ok(self.tables()?.purge_closed(|loan| loan.book_id == book_id))
    }

    async fn purge_closed_loans_for_member(&mut self, member_id: i32) -> AppResult<u64> {
        Ok(self.tables()?.purge_closed(|loan| loan.member_id == member_id))
    }
}
