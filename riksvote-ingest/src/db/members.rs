//! Member database operations

use super::Upsert;
use async_trait::async_trait;
use riksvote_common::Result;
use sqlx::{Row, SqliteConnection, SqlitePool};

/// Member record (one legislator)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub member_id: String,
    pub first_name: String,
    pub last_name: String,
    pub name: String,
    pub party: String,
    pub constituency: String,
    pub birth_year: Option<i64>,
    pub gender: String,
    pub status: String,
    pub image_url: String,
}

#[async_trait]
impl Upsert for Member {
    async fn upsert(&self, conn: &mut SqliteConnection) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO members (
                member_id, first_name, last_name, name, party, constituency,
                birth_year, gender, status, image_url, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP)
            ON CONFLICT(member_id) DO UPDATE SET
                first_name = excluded.first_name,
                last_name = excluded.last_name,
                name = excluded.name,
                party = excluded.party,
                constituency = excluded.constituency,
                birth_year = excluded.birth_year,
                gender = excluded.gender,
                status = excluded.status,
                image_url = excluded.image_url,
                updated_at = CURRENT_TIMESTAMP
            WHERE members.first_name IS NOT excluded.first_name
               OR members.last_name IS NOT excluded.last_name
               OR members.party IS NOT excluded.party
               OR members.constituency IS NOT excluded.constituency
               OR members.birth_year IS NOT excluded.birth_year
               OR members.gender IS NOT excluded.gender
               OR members.status IS NOT excluded.status
               OR members.image_url IS NOT excluded.image_url
            "#,
        )
        .bind(&self.member_id)
        .bind(&self.first_name)
        .bind(&self.last_name)
        .bind(&self.name)
        .bind(&self.party)
        .bind(&self.constituency)
        .bind(self.birth_year)
        .bind(&self.gender)
        .bind(&self.status)
        .bind(&self.image_url)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }
}

/// Load member by id
pub async fn load_member(pool: &SqlitePool, member_id: &str) -> Result<Option<Member>> {
    let row = sqlx::query(
        r#"
        SELECT member_id, first_name, last_name, name, party, constituency,
               birth_year, gender, status, image_url
        FROM members
        WHERE member_id = ?
        "#,
    )
    .bind(member_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| Member {
        member_id: row.get("member_id"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        name: row.get("name"),
        party: row.get("party"),
        constituency: row.get("constituency"),
        birth_year: row.get("birth_year"),
        gender: row.get("gender"),
        status: row.get("status"),
        image_url: row.get("image_url"),
    }))
}
