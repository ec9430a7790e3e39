//! Loan and fine endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::{
    error::AppResult,
    models::loan::{FineSummary, Loan, LoanRequest},
};

/// Borrow a book
#[utoipa::path(
    post,
    path = "/loans/borrow",
    tag = "loans",
    request_body = LoanRequest,
    responses(
        (status = 201, description = "Loan opened", body = Loan),
        (status = 400, description = "Invalid request", body = crate::error::ErrorResponse),
        (status = 404, description = "Book or member not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Member inactive, already borrowed or no copies left", body = crate::error::ErrorResponse),
        (status = 503, description = "Store busy, retry", body = crate::error::ErrorResponse)
    )
)]
pub async fn borrow_book(
    State(state): State<crate::AppState>,
    Json(request): Json<LoanRequest>,
) -> AppResult<(StatusCode, Json<Loan>)> {
    request.validate()?;

    let loan = state.engine.borrow(request.member_id, request.book_id).await?;
    Ok((StatusCode::CREATED, Json(loan)))
}

/// Return a borrowed book
#[utoipa::path(
    post,
    path = "/loans/return",
    tag = "loans",
    request_body = LoanRequest,
    responses(
        (status = 200, description = "Loan closed with its fine", body = Loan),
        (status = 400, description = "Invalid request", body = crate::error::ErrorResponse),
        (status = 404, description = "No open loan for this book and member", body = crate::error::ErrorResponse),
        (status = 503, description = "Store busy, retry", body = crate::error::ErrorResponse)
    )
)]
pub async fn return_book(
    State(state): State<crate::AppState>,
    Json(request): Json<LoanRequest>,
) -> AppResult<Json<Loan>> {
    request.validate()?;

    let loan = state.engine.return_book(request.member_id, request.book_id).await?;
    Ok(Json(loan))
}

/// Open loans of a member
#[utoipa::path(
    get,
    path = "/loans/{member_id}",
    tag = "loans",
    params(
        ("member_id" = i32, Path, description = "Member ID")
    ),
    responses(
        (status = 200, description = "Open loans", body = Vec<Loan>),
        (status = 404, description = "Member not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_loans(
    State(state): State<crate::AppState>,
    Path(member_id): Path<i32>,
) -> AppResult<Json<Vec<Loan>>> {
    let loans = state.engine.list_loans(member_id).await?;
    Ok(Json(loans))
}

/// Fine statement of a member
#[utoipa::path(
    get,
    path = "/loans/{member_id}/fines",
    tag = "loans",
    params(
        ("member_id" = i32, Path, description = "Member ID")
    ),
    responses(
        (status = 200, description = "Outstanding and accruing fines", body = FineSummary),
        (status = 404, description = "Member not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn check_fines(
    State(state): State<crate::AppState>,
    Path(member_id): Path<i32>,
) -> AppResult<Json<FineSummary>> {
    let summary = state.engine.check_fines(member_id).await?;
    Ok(Json(summary))
}

/// Mark all outstanding fines of a member as paid
#[utoipa::path(
    post,
    path = "/loans/{member_id}/fines/settle",
    tag = "loans",
    params(
        ("member_id" = i32, Path, description = "Member ID")
    ),
    responses(
        (status = 200, description = "Loans whose fines were settled", body = Vec<Loan>),
        (status = 404, description = "Member not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn settle_fines(
    State(state): State<crate::AppState>,
    Path(member_id): Path<i32>,
) -> AppResult<Json<Vec<Loan>>> {
    let settled = state.engine.settle_fines(member_id).await?;
    Ok(Json(settled))
}
