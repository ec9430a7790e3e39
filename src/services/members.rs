//! Membership operations

use rust_decimal::Decimal;

use super::{loans::fine_summary, LendingEngine};
use crate::{
    config::HistoryPolicy,
    error::{AppError, AppResult},
    models::{CreateMember, Member, MemberDetails, MemberQuery, UpdateMember},
    repository::{LoanLedger, MembershipStore, StoreTx},
};

impl LendingEngine {
    /// Register a new member; `joined_date` defaults to today
    pub async fn register_member(&self, member: CreateMember) -> AppResult<Member> {
        let joined_date = member.joined_date.unwrap_or_else(|| self.clock.today());
        let is_active = member.is_active.unwrap_or(true);

        let mut tx = self.begin().await?;
        let created = tx
            .insert_member(&member.name, &member.email, joined_date, is_active)
            .await?;
        tx.commit().await?;

        tracing::info!("Member registered: id={}", created.id);
        Ok(created)
    }

    /// Member profile with loan history, open loan count and fines
    pub async fn get_member(&self, id: i32) -> AppResult<MemberDetails> {
        let mut tx = self.begin().await?;
        let member = tx.member(id).await?.ok_or(AppError::MemberNotFound(id))?;
        let loans = tx.list_loans(id).await?;
        drop(tx);

        let fines = fine_summary(id, &loans, self.clock.today(), self.config.fine_per_day());
        let active_loans_count = loans.iter().filter(|loan| loan.is_open()).count() as i64;

        Ok(MemberDetails {
            member,
            loans,
            active_loans_count,
            outstanding_fines: fines.total,
            accruing_fines: fines.accruing,
        })
    }

    /// Search members with pagination
    pub async fn list_members(&self, query: &MemberQuery) -> AppResult<Vec<Member>> {
        let mut tx = self.begin().await?;
        tx.list_members(query).await
    }

    /// Update a member. Deactivation is refused while loans are open.
    pub async fn update_member(&self, id: i32, patch: UpdateMember) -> AppResult<Member> {
        let mut tx = self.begin().await?;
        tx.lock_member(id).await?.ok_or(AppError::MemberNotFound(id))?;

        if patch.is_active == Some(false) {
            let open = tx.loan_counts_for_member(id).await?.open;
            if open > 0 {
                return Err(AppError::HasOpenLoans { member_id: id, count: open });
            }
        }

        let updated = tx.update_member(id, &patch).await?;
        tx.commit().await?;

        tracing::info!("Member updated: id={} active={}", updated.id, updated.is_active);
        Ok(updated)
    }

    /// Remove a member with no open loans and no unpaid fines. Closed loans
    /// follow the configured history policy.
    pub async fn delete_member(&self, id: i32) -> AppResult<()> {
        let mut tx = self.begin().await?;
        tx.lock_member(id).await?.ok_or(AppError::MemberNotFound(id))?;

        let counts = tx.loan_counts_for_member(id).await?;
        if counts.open > 0 {
            return Err(AppError::HasOpenLoans {
                member_id: id,
                count: counts.open,
            });
        }

        let unpaid: Decimal = tx
            .list_loans(id)
            .await?
            .iter()
            .map(|loan| loan.unpaid_fine())
            .sum();
        if unpaid > Decimal::ZERO {
            return Err(AppError::HasUnpaidFines {
                member_id: id,
                amount: unpaid,
            });
        }

        if counts.closed > 0 {
            match self.config.history_policy {
                HistoryPolicy::Block => {
                    return Err(AppError::HasActiveReferences {
                        entity: "Member",
                        id,
                        count: counts.closed,
                    });
                }
                HistoryPolicy::Cascade => {
                    let purged = tx.purge_closed_loans_for_member(id).await?;
                    tracing::info!("Member delete: purged {} closed loan(s) of member id={}", purged, id);
                }
            }
        }

        tx.delete_member(id).await?;
        tx.commit().await?;

        tracing::info!("Member deleted: id={}", id);
        Ok(())
    }
}
