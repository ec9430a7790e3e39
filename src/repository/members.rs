//! Membership store on PostgreSQL

use async_trait::async_trait;
use chrono::NaiveDate;

use super::{
    postgres::{map_constraint, PgTx, MEMBERS_EMAIL_KEY},
    MembershipStore,
};
use crate::{
    error::{AppError, AppResult},
    models::{Member, MemberQuery, UpdateMember},
};

#[async_trait]
impl MembershipStore for PgTx {
    /// Register a new member
    async fn insert_member(
        &mut self,
        name: &str,
        email: &str,
        joined_date: NaiveDate,
        is_active: bool,
    ) -> AppResult<Member> {
        sqlx::query_as::<_, Member>(
            r#"
            INSERT INTO members (name, email, joined_date, is_active)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(joined_date)
        .bind(is_active)
        .fetch_one(self.conn()?)
        .await
        .map_err(|e| map_constraint(e, MEMBERS_EMAIL_KEY, || AppError::DuplicateEmail(email.to_string())))
    }

    /// Get member by ID
    async fn member(&mut self, id: i32) -> AppResult<Option<Member>> {
        let member = sqlx::query_as::<_, Member>("SELECT * FROM members WHERE id = $1")
            .bind(id)
            .fetch_optional(self.conn()?)
            .await?;
        Ok(member)
    }

    async fn lock_member(&mut self, id: i32) -> AppResult<Option<Member>> {
        let member = sqlx::query_as::<_, Member>("SELECT * FROM members WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(self.conn()?)
            .await?;
        Ok(member)
    }

    /// Search members with pagination
    async fn list_members(&mut self, query: &MemberQuery) -> AppResult<Vec<Member>> {
        let mut conditions = Vec::new();
        let mut params: Vec<String> = Vec::new();

        if let Some(ref name) = query.name {
            params.push(format!("%{}%", name));
            conditions.push(format!("name ILIKE ${}", params.len()));
        }

        if let Some(ref email) = query.email {
            params.push(format!("%{}%", email));
            conditions.push(format!("email ILIKE ${}", params.len()));
        }

        if let Some(is_active) = query.is_active {
            conditions.push(format!("is_active = {}", is_active));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let select_query = format!(
            "SELECT * FROM members {} ORDER BY id LIMIT {} OFFSET {}",
            where_clause,
            query.page_size(),
            query.offset()
        );

        let mut select_builder = sqlx::query_as::<_, Member>(&select_query);
        for param in &params {
            select_builder = select_builder.bind(param);
        }
        let members = select_builder.fetch_all(self.conn()?).await?;

        Ok(members)
    }

    /// Update name, email or status
    async fn update_member(&mut self, id: i32, patch: &UpdateMember) -> AppResult<Member> {
        sqlx::query_as::<_, Member>(
            r#"
            UPDATE members SET
                name = COALESCE($2, name),
                email = COALESCE($3, email),
                is_active = COALESCE($4, is_active)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&patch.name)
        .bind(&patch.email)
        .bind(patch.is_active)
        .fetch_optional(self.conn()?)
        .await
        .map_err(|e| {
            map_constraint(e, MEMBERS_EMAIL_KEY, || {
                AppError::DuplicateEmail(patch.email.clone().unwrap_or_default())
            })
        })?
        .ok_or(AppError::MemberNotFound(id))
    }

    /// Delete a member that no loan refers to
    async fn delete_member(&mut self, id: i32) -> AppResult<()> {
        let references: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM loans WHERE member_id = $1")
            .bind(id)
            .fetch_one(self.conn()?)
            .await?;

        if references > 0 {
            return Err(AppError::HasActiveReferences {
                entity: "Member",
                id,
                count: references,
            });
        }

        let result = sqlx::query("DELETE FROM members WHERE id = $1")
            .bind(id)
            .execute(self.conn()?)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::MemberNotFound(id));
        }
        Ok(())
    }
}
