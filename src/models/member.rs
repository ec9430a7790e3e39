//! Member model and related request types

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::book::contains_ci;
use super::loan::Loan;

/// Library member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Member {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub joined_date: NaiveDate,
    /// Inactive members cannot open new loans
    pub is_active: bool,
}

/// Member profile with loan history and fines
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MemberDetails {
    #[serde(flatten)]
    pub member: Member,
    pub loans: Vec<Loan>,
    pub active_loans_count: i64,
    /// Closed-loan fines not yet settled
    pub outstanding_fines: Decimal,
    /// Fines open overdue loans would incur if returned today
    pub accruing_fines: Decimal,
}

/// Register a new member
#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct CreateMember {
    #[validate(length(min = 1, message = "Name must not be empty"))]
    pub name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    /// Defaults to today
    pub joined_date: Option<NaiveDate>,
    /// Defaults to true
    pub is_active: Option<bool>,
}

/// Partial update of a member; `joined_date` cannot change
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate, ToSchema)]
pub struct UpdateMember {
    #[validate(length(min = 1, message = "Name must not be empty"))]
    pub name: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    pub is_active: Option<bool>,
}

pub const DEFAULT_MEMBER_PAGE: i64 = 100;
pub const MAX_MEMBER_PAGE: i64 = 500;

/// Member listing filters with offset pagination
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate, IntoParams, ToSchema)]
pub struct MemberQuery {
    pub name: Option<String>,
    pub email: Option<String>,
    pub is_active: Option<bool>,
    #[validate(range(min = 0, message = "skip must not be negative"))]
    pub skip: Option<i64>,
    #[validate(range(min = 1, max = 500, message = "limit must be between 1 and 500"))]
    pub limit: Option<i64>,
}

impl MemberQuery {
    pub fn offset(&self) -> i64 {
        self.skip.unwrap_or(0).max(0)
    }

    pub fn page_size(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_MEMBER_PAGE).clamp(1, MAX_MEMBER_PAGE)
    }

    pub fn matches(&self, member: &Member) -> bool {
        contains_ci(&member.name, self.name.as_deref())
            && contains_ci(&member.email, self.email.as_deref())
            && self.is_active.map_or(true, |active| member.is_active == active)
    }
}
