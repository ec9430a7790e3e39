//! Lending engine behavior against the in-memory store

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use library_lending::{
    clock::ManualClock,
    config::{HistoryPolicy, LendingConfig},
    error::{AppError, ErrorKind},
    models::{Book, BookQuery, CreateBook, CreateMember, Member, MemberQuery, UpdateBook, UpdateMember},
    repository::{MemoryStore, Store},
    LendingEngine,
};

fn day(n: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 1).unwrap() + chrono::Duration::days(n)
}

struct Fixture {
    engine: LendingEngine,
    clock: Arc<ManualClock>,
}

fn fixture_with(policy: HistoryPolicy) -> Fixture {
    let store = Arc::new(MemoryStore::new(Duration::from_secs(5)));
    let clock = Arc::new(ManualClock::new(day(0)));
    let config = LendingConfig {
        history_policy: policy,
        ..LendingConfig::default()
    };
    let engine = LendingEngine::new(store, clock.clone(), config);
    Fixture { engine, clock }
}

fn fixture() -> Fixture {
    fixture_with(HistoryPolicy::Block)
}

async fn add_book(engine: &LendingEngine, isbn: &str, copies: i32) -> Book {
    engine
        .create_book(CreateBook {
            title: format!("Book {}", isbn),
            author: "Ursula K. Le Guin".to_string(),
            isbn: isbn.to_string(),
            total_copies: copies,
            genre: Some("Fiction".to_string()),
        })
        .await
        .expect("Failed to create book")
}

async fn add_member(engine: &LendingEngine, email: &str) -> Member {
    engine
        .register_member(CreateMember {
            name: format!("Member {}", email),
            email: email.to_string(),
            joined_date: None,
            is_active: None,
        })
        .await
        .expect("Failed to register member")
}

#[tokio::test]
async fn borrow_return_and_delete_scenario() {
    let f = fixture();
    let member = add_member(&f.engine, "m@example.com").await;
    let book = add_book(&f.engine, "isbn-1", 1).await;
    assert!(member.is_active);
    assert_eq!((book.total_copies, book.available_copies), (1, 1));

    let loan = f.engine.borrow(member.id, book.id).await.unwrap();
    assert_eq!(loan.due_date, day(14));
    assert_eq!(f.engine.get_book(book.id).await.unwrap().available_copies, 0);

    let err = f.engine.borrow(member.id, book.id).await.unwrap_err();
    assert!(matches!(err, AppError::DuplicateActiveLoan { .. }));

    let err = f.engine.delete_book(book.id).await.unwrap_err();
    assert!(matches!(err, AppError::HasActiveReferences { count: 1, .. }));
    assert_eq!(err.kind(), ErrorKind::Conflict);

    f.clock.set(day(20));
    let closed = f.engine.return_book(member.id, book.id).await.unwrap();
    assert_eq!(closed.returned_date, Some(day(20)));
    assert_eq!(closed.fine_amount, Some(Decimal::new(300, 2)));
    assert_eq!(f.engine.get_book(book.id).await.unwrap().available_copies, 1);
}

#[tokio::test]
async fn return_without_open_loan_is_not_found() {
    let f = fixture();
    let member = add_member(&f.engine, "m@example.com").await;
    let book = add_book(&f.engine, "isbn-1", 2).await;

    let err = f.engine.return_book(member.id, book.id).await.unwrap_err();
    assert!(matches!(err, AppError::LoanNotFound { .. }));
    assert_eq!(err.kind(), ErrorKind::NotFound);

    f.engine.borrow(member.id, book.id).await.unwrap();
    f.engine.return_book(member.id, book.id).await.unwrap();

    let err = f.engine.return_book(member.id, book.id).await.unwrap_err();
    assert!(matches!(err, AppError::LoanNotFound { .. }));
    assert_eq!(f.engine.get_book(book.id).await.unwrap().available_copies, 2);
}

#[tokio::test]
async fn deactivation_waits_for_returns() {
    let f = fixture();
    let member = add_member(&f.engine, "m@example.com").await;
    let book = add_book(&f.engine, "isbn-1", 1).await;
    f.engine.borrow(member.id, book.id).await.unwrap();

    let deactivate = || UpdateMember {
        is_active: Some(false),
        ..UpdateMember::default()
    };

    let err = f.engine.update_member(member.id, deactivate()).await.unwrap_err();
    assert!(matches!(err, AppError::HasOpenLoans { count: 1, .. }));
    assert!(f.engine.get_member(member.id).await.unwrap().member.is_active);

    f.engine.return_book(member.id, book.id).await.unwrap();
    let updated = f.engine.update_member(member.id, deactivate()).await.unwrap();
    assert!(!updated.is_active);

    let err = f.engine.borrow(member.id, book.id).await.unwrap_err();
    assert!(matches!(err, AppError::MemberInactive(id) if id == member.id));
}

#[tokio::test]
async fn fines_follow_the_due_date() {
    let f = fixture();
    let member = add_member(&f.engine, "m@example.com").await;
    let late = add_book(&f.engine, "isbn-late", 1).await;
    let on_time = add_book(&f.engine, "isbn-on-time", 1).await;

    f.engine.borrow(member.id, late.id).await.unwrap();
    f.engine.borrow(member.id, on_time.id).await.unwrap();

    f.clock.set(day(14));
    let returned = f.engine.return_book(member.id, on_time.id).await.unwrap();
    assert_eq!(returned.fine_amount, Some(Decimal::ZERO));

    f.clock.set(day(17));
    let fines = f.engine.check_fines(member.id).await.unwrap();
    assert_eq!(fines.total, Decimal::ZERO);
    assert_eq!(fines.accruing, Decimal::new(150, 2));
    assert_eq!(fines.overdue_open_loans, 1);

    f.clock.set(day(20));
    let returned = f.engine.return_book(member.id, late.id).await.unwrap();
    assert_eq!(returned.fine_amount, Some(Decimal::new(300, 2)));

    let fines = f.engine.check_fines(member.id).await.unwrap();
    assert_eq!(fines.total, Decimal::new(300, 2));
    assert_eq!(fines.accruing, Decimal::ZERO);
    assert_eq!(fines.per_loan.len(), 1);
    assert!(fines.per_loan[0].finalized);
    assert_eq!(fines.per_loan[0].overdue_days, 6);
}

#[tokio::test]
async fn borrow_then_return_restores_availability() {
    let f = fixture();
    let member = add_member(&f.engine, "m@example.com").await;
    let book = add_book(&f.engine, "isbn-1", 3).await;

    f.engine.borrow(member.id, book.id).await.unwrap();
    f.engine.return_book(member.id, book.id).await.unwrap();

    assert_eq!(f.engine.get_book(book.id).await.unwrap().available_copies, 3);
    assert!(f.engine.list_loans(member.id).await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_borrows_never_oversell() {
    const COPIES: i32 = 3;
    const BORROWERS: usize = 10;

    let f = fixture();
    let book = add_book(&f.engine, "isbn-hot", COPIES).await;
    let mut members = Vec::new();
    for i in 0..BORROWERS {
        members.push(add_member(&f.engine, &format!("reader{}@example.com", i)).await);
    }

    let handles: Vec<_> = members
        .iter()
        .map(|member| {
            let engine = f.engine.clone();
            let (member_id, book_id) = (member.id, book.id);
            tokio::spawn(async move { engine.borrow(member_id, book_id).await })
        })
        .collect();

    let mut successes = 0;
    let mut exhausted = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(AppError::InventoryExhausted(_)) => exhausted += 1,
            Err(other) => panic!("unexpected error {:?}", other),
        }
    }

    assert_eq!(successes, COPIES as usize);
    assert_eq!(exhausted, BORROWERS - COPIES as usize);
    assert_eq!(f.engine.get_book(book.id).await.unwrap().available_copies, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_borrows_of_one_pair_open_one_loan() {
    let f = fixture();
    let member = add_member(&f.engine, "m@example.com").await;
    let book = add_book(&f.engine, "isbn-1", 5).await;

    let handles: Vec<_> = (0..6)
        .map(|_| {
            let engine = f.engine.clone();
            let (member_id, book_id) = (member.id, book.id);
            tokio::spawn(async move { engine.borrow(member_id, book_id).await })
        })
        .collect();

    let mut successes = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(AppError::DuplicateActiveLoan { .. }) => {}
            Err(other) => panic!("unexpected error {:?}", other),
        }
    }

    assert_eq!(successes, 1);
    assert_eq!(f.engine.list_loans(member.id).await.unwrap().len(), 1);
    assert_eq!(f.engine.get_book(book.id).await.unwrap().available_copies, 4);
}

#[tokio::test]
async fn unpaid_fines_block_member_deletion() {
    let f = fixture_with(HistoryPolicy::Cascade);
    let member = add_member(&f.engine, "m@example.com").await;
    let book = add_book(&f.engine, "isbn-1", 1).await;

    f.engine.borrow(member.id, book.id).await.unwrap();
    let err = f.engine.delete_member(member.id).await.unwrap_err();
    assert!(matches!(err, AppError::HasOpenLoans { .. }));

    f.clock.set(day(16));
    f.engine.return_book(member.id, book.id).await.unwrap();

    let err = f.engine.delete_member(member.id).await.unwrap_err();
    assert!(matches!(err, AppError::HasUnpaidFines { amount, .. } if amount == Decimal::ONE));

    let settled = f.engine.settle_fines(member.id).await.unwrap();
    assert_eq!(settled.len(), 1);
    assert_eq!(settled[0].fine_settled_date, Some(day(16)));
    assert_eq!(f.engine.check_fines(member.id).await.unwrap().total, Decimal::ZERO);

    f.engine.delete_member(member.id).await.unwrap();
    assert!(matches!(
        f.engine.get_member(member.id).await,
        Err(AppError::MemberNotFound(_))
    ));
}

#[tokio::test]
async fn closed_loans_block_deletion_under_block_policy() {
    let f = fixture();
    let member = add_member(&f.engine, "m@example.com").await;
    let book = add_book(&f.engine, "isbn-1", 1).await;
    f.engine.borrow(member.id, book.id).await.unwrap();
    f.engine.return_book(member.id, book.id).await.unwrap();

    let err = f.engine.delete_book(book.id).await.unwrap_err();
    assert!(matches!(err, AppError::HasActiveReferences { entity: "Book", .. }));

    let err = f.engine.delete_member(member.id).await.unwrap_err();
    assert!(matches!(err, AppError::HasActiveReferences { entity: "Member", .. }));
}

#[tokio::test]
async fn closed_loans_are_purged_under_cascade_policy() {
    let f = fixture_with(HistoryPolicy::Cascade);
    let member = add_member(&f.engine, "m@example.com").await;
    let book = add_book(&f.engine, "isbn-1", 1).await;
    f.engine.borrow(member.id, book.id).await.unwrap();
    f.engine.return_book(member.id, book.id).await.unwrap();

    f.engine.delete_book(book.id).await.unwrap();
    assert!(matches!(
        f.engine.get_book(book.id).await,
        Err(AppError::BookNotFound(_))
    ));
    assert!(f.engine.get_member(member.id).await.unwrap().loans.is_empty());
}

#[tokio::test]
async fn total_copies_cannot_drop_below_loaned_copies() {
    let f = fixture();
    let book = add_book(&f.engine, "isbn-1", 3).await;
    for i in 0..2 {
        let member = add_member(&f.engine, &format!("r{}@example.com", i)).await;
        f.engine.borrow(member.id, book.id).await.unwrap();
    }

    let shrink = |total| UpdateBook {
        total_copies: Some(total),
        ..UpdateBook::default()
    };

    let err = f.engine.update_book(book.id, shrink(1)).await.unwrap_err();
    assert!(matches!(err, AppError::CopiesOnLoan { on_loan: 2, .. }));

    let updated = f.engine.update_book(book.id, shrink(2)).await.unwrap();
    assert_eq!((updated.total_copies, updated.available_copies), (2, 0));

    let updated = f.engine.update_book(book.id, shrink(5)).await.unwrap();
    assert_eq!((updated.total_copies, updated.available_copies), (5, 3));
}

#[tokio::test]
async fn unknown_entities_are_not_found() {
    let f = fixture();
    let member = add_member(&f.engine, "m@example.com").await;
    let book = add_book(&f.engine, "isbn-1", 1).await;

    assert!(matches!(
        f.engine.borrow(999, book.id).await,
        Err(AppError::MemberNotFound(999))
    ));
    assert!(matches!(
        f.engine.borrow(member.id, 999).await,
        Err(AppError::BookNotFound(999))
    ));
    assert!(matches!(
        f.engine.check_fines(999).await,
        Err(AppError::MemberNotFound(999))
    ));
    assert_eq!(f.engine.get_book(book.id).await.unwrap().available_copies, 1);
}

#[tokio::test]
async fn duplicate_isbn_and_email_are_rejected() {
    let f = fixture();
    add_book(&f.engine, "isbn-1", 1).await;
    add_member(&f.engine, "m@example.com").await;

    let err = f
        .engine
        .create_book(CreateBook {
            title: "Another".to_string(),
            author: "Someone".to_string(),
            isbn: "isbn-1".to_string(),
            total_copies: 1,
            genre: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::DuplicateIsbn(_)));
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = f
        .engine
        .register_member(CreateMember {
            name: "Other".to_string(),
            email: "m@example.com".to_string(),
            joined_date: None,
            is_active: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::DuplicateEmail(_)));
}

#[tokio::test]
async fn held_store_makes_operations_busy() {
    let store = Arc::new(MemoryStore::new(Duration::from_millis(50)));
    let clock = Arc::new(ManualClock::new(day(0)));
    let engine = LendingEngine::new(store.clone(), clock, LendingConfig::default());
    let member = add_member(&engine, "m@example.com").await;
    let book = add_book(&engine, "isbn-1", 1).await;

    let held = store.begin().await.unwrap();
    let err = engine.borrow(member.id, book.id).await.unwrap_err();
    assert!(matches!(err, AppError::StoreBusy));
    assert!(err.is_transient());
    drop(held);

    assert_eq!(engine.get_book(book.id).await.unwrap().available_copies, 1);
    engine.borrow(member.id, book.id).await.unwrap();
}

#[tokio::test]
async fn listings_apply_filters() {
    let f = fixture();
    let member = add_member(&f.engine, "alice@example.com").await;
    add_member(&f.engine, "bob@example.com").await;
    let scarce = add_book(&f.engine, "isbn-1", 1).await;
    add_book(&f.engine, "isbn-2", 2).await;
    f.engine.borrow(member.id, scarce.id).await.unwrap();

    let available = f
        .engine
        .list_books(&BookQuery {
            available_only: true,
            ..BookQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(available.len(), 1);
    assert_eq!(available[0].isbn, "isbn-2");

    let alices = f
        .engine
        .list_members(&MemberQuery {
            email: Some("ALICE".to_string()),
            ..MemberQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(alices.len(), 1);
    assert_eq!(alices[0].id, member.id);

    let details = f.engine.get_member(member.id).await.unwrap();
    assert_eq!(details.active_loans_count, 1);
    assert_eq!(details.loans.len(), 1);
}

#[tokio::test]
async fn seeding_populates_an_empty_store() {
    let f = fixture();
    assert!(f.engine.seed_demo_data().await.unwrap());
    assert!(!f.engine.list_books(&BookQuery::default()).await.unwrap().is_empty());
}
