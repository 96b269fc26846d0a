use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct TheaterHall {
    pub id: i64,
    pub name: String,
    pub rows: i32,
    pub seats_in_row: i32,
}

impl TheaterHall {
    pub fn capacity(&self) -> i64 {
        i64::from(self.rows) * i64::from(self.seats_in_row)
    }
}

impl TheaterHall {
    pub async fn all(pool: &sqlx::PgPool) -> Result<Vec<TheaterHall>, sqlx::Error> {
        sqlx::query_as::<_, TheaterHall>("SELECT id, name, rows, seats_in_row FROM theater_halls ORDER BY id")
            .fetch_all(pool)
            .await
    }

    pub async fn find<'e, E>(executor: E, id: i64) -> Result<Option<TheaterHall>, sqlx::Error>
    where
        E: sqlx::PgExecutor<'e>,
    {
        sqlx::query_as::<_, TheaterHall>("SELECT id, name, rows, seats_in_row FROM theater_halls WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn create(pool: &sqlx::PgPool, new: &NewTheaterHall) -> Result<TheaterHall, sqlx::Error> {
        sqlx::query_as::<_, TheaterHall>(
            "INSERT INTO theater_halls (name, rows, seats_in_row) VALUES ($1, $2, $3)
             RETURNING id, name, rows, seats_in_row",
        )
        .bind(new.name.trim())
        .bind(new.rows)
        .bind(new.seats_in_row)
        .fetch_one(pool)
        .await
    }
}

/// `{id, name, rows, seats_in_row, capacity}`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TheaterHallView {
    pub id: i64,
    pub name: String,
    pub rows: i32,
    pub seats_in_row: i32,
    pub capacity: i64,
}

impl From<TheaterHall> for TheaterHallView {
    fn from(hall: TheaterHall) -> Self {
        let capacity = hall.capacity();
        TheaterHallView {
            id: hall.id,
            name: hall.name,
            rows: hall.rows,
            seats_in_row: hall.seats_in_row,
            capacity,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewTheaterHall {
    #[validate(length(min = 1, max = 255, message = "Ensure this field has between 1 and 255 characters."))]
    pub name: String,
    #[validate(range(min = 1, message = "Ensure this value is greater than or equal to 1."))]
    pub rows: i32,
    #[validate(range(min = 1, message = "Ensure this value is greater than or equal to 1."))]
    pub seats_in_row: i32,
}
