use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Genre {
    pub id: i64,
    pub name: String,
}

impl Genre {
    pub async fn all(pool: &sqlx::PgPool) -> Result<Vec<Genre>, sqlx::Error> {
        sqlx::query_as::<_, Genre>("SELECT id, name FROM genres ORDER BY id")
            .fetch_all(pool)
            .await
    }

    pub async fn create(pool: &sqlx::PgPool, new: &NewGenre) -> Result<Genre, sqlx::Error> {
        sqlx::query_as::<_, Genre>("INSERT INTO genres (name) VALUES ($1) RETURNING id, name")
            .bind(new.name.trim())
            .fetch_one(pool)
            .await
    }

    /// Ids from `ids` that have no genre row.
    pub async fn missing_ids(pool: &sqlx::PgPool, ids: &[i64]) -> Result<Vec<i64>, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT wanted FROM UNNEST($1::bigint[]) AS wanted
             WHERE NOT EXISTS (SELECT 1 FROM genres g WHERE g.id = wanted)",
        )
        .bind(ids)
        .fetch_all(pool)
        .await
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewGenre {
    #[validate(length(min = 1, max = 255, message = "Ensure this field has between 1 and 255 characters."))]
    pub name: String,
}
