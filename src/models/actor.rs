use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Actor {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
}

impl Actor {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl Actor {
    pub async fn all(pool: &sqlx::PgPool) -> Result<Vec<Actor>, sqlx::Error> {
        sqlx::query_as::<_, Actor>("SELECT id, first_name, last_name FROM actors ORDER BY id")
            .fetch_all(pool)
            .await
    }

    pub async fn create(pool: &sqlx::PgPool, new: &NewActor) -> Result<Actor, sqlx::Error> {
        sqlx::query_as::<_, Actor>(
            "INSERT INTO actors (first_name, last_name) VALUES ($1, $2)
             RETURNING id, first_name, last_name",
        )
        .bind(new.first_name.trim())
        .bind(new.last_name.trim())
        .fetch_one(pool)
        .await
    }

    pub async fn missing_ids(pool: &sqlx::PgPool, ids: &[i64]) -> Result<Vec<i64>, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT wanted FROM UNNEST($1::bigint[]) AS wanted
             WHERE NOT EXISTS (SELECT 1 FROM actors a WHERE a.id = wanted)",
        )
        .bind(ids)
        .fetch_all(pool)
        .await
    }
}

/// `{id, first_name, last_name, full_name}`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActorView {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
}

impl From<Actor> for ActorView {
    fn from(actor: Actor) -> Self {
        let full_name = actor.full_name();
        ActorView {
            id: actor.id,
            first_name: actor.first_name,
            last_name: actor.last_name,
            full_name,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewActor {
    #[validate(length(min = 1, max = 255, message = "Ensure this field has between 1 and 255 characters."))]
    pub first_name: String,
    #[validate(length(min = 1, max = 255, message = "Ensure this field has between 1 and 255 characters."))]
    pub last_name: String,
}
