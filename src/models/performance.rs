use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, Postgres, QueryBuilder};

use super::play::{Play, PlayListView};
use super::theater_hall::{TheaterHall, TheaterHallView};
use crate::error::FieldErrors;
use crate::filters::PerformanceFilter;

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Performance {
    pub id: i64,
    pub show_time: NaiveDateTime,
    #[serde(rename = "play")]
    pub play_id: i64,
    #[serde(rename = "theater_hall")]
    pub theater_hall_id: i64,
}

/// List row with the hall joined in and availability counted by SQL:
/// `tickets_available = rows * seats_in_row - count(tickets)`.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct PerformanceListItem {
    pub id: i64,
    pub show_time: NaiveDateTime,
    pub play_title: String,
    pub theater_hall_name: String,
    pub theater_hall_capacity: i64,
    pub tickets_available: i64,
}

/// Columns of [`PerformanceListItem`]; expects `pf`, `p` and `th` aliases.
pub(crate) const LIST_COLUMNS: &str = "pf.id, pf.show_time, \
     p.title AS play_title, \
     th.name AS theater_hall_name, \
     th.rows::bigint * th.seats_in_row AS theater_hall_capacity, \
     th.rows::bigint * th.seats_in_row \
       - (SELECT COUNT(*) FROM tickets tk WHERE tk.performance_id = pf.id) AS tickets_available";

pub(crate) const LIST_JOINS: &str = "JOIN plays p ON p.id = pf.play_id \
     JOIN theater_halls th ON th.id = pf.theater_hall_id";

impl PerformanceListItem {
    pub async fn list(pool: &sqlx::PgPool, filter: &PerformanceFilter) -> Result<Vec<PerformanceListItem>, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {LIST_COLUMNS} FROM performances pf {LIST_JOINS} WHERE TRUE"
        ));
        filter.push_conditions(&mut qb);
        qb.push(" ORDER BY pf.id");
        qb.build_query_as::<PerformanceListItem>().fetch_all(pool).await
    }
}

impl Performance {
    pub async fn find(pool: &sqlx::PgPool, id: i64) -> Result<Option<Performance>, sqlx::Error> {
        sqlx::query_as::<_, Performance>(
            "SELECT id, show_time, play_id, theater_hall_id FROM performances WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn create(pool: &sqlx::PgPool, new: &NewPerformance) -> Result<Performance, sqlx::Error> {
        sqlx::query_as::<_, Performance>(
            "INSERT INTO performances (show_time, play_id, theater_hall_id) VALUES ($1, $2, $3)
             RETURNING id, show_time, play_id, theater_hall_id",
        )
        .bind(new.show_time)
        .bind(new.play)
        .bind(new.theater_hall)
        .fetch_one(pool)
        .await
    }

    /// Row-locks the performance until the transaction ends; reservations
    /// share-lock the same row, so none can slip in while it changes.
    pub async fn lock(conn: &mut PgConnection, id: i64) -> Result<Option<Performance>, sqlx::Error> {
        sqlx::query_as::<_, Performance>(
            "SELECT id, show_time, play_id, theater_hall_id FROM performances WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(conn)
        .await
    }

    pub async fn sold_extent(conn: &mut PgConnection, id: i64) -> Result<SoldExtent, sqlx::Error> {
        sqlx::query_as::<_, SoldExtent>(
            "SELECT MAX(row) AS max_row, MAX(seat) AS max_seat FROM tickets WHERE performance_id = $1",
        )
        .bind(id)
        .fetch_one(conn)
        .await
    }

    pub async fn update(conn: &mut PgConnection, id: i64, new: &NewPerformance) -> Result<Option<Performance>, sqlx::Error> {
        sqlx::query_as::<_, Performance>(
            "UPDATE performances SET show_time = $2, play_id = $3, theater_hall_id = $4
             WHERE id = $1
             RETURNING id, show_time, play_id, theater_hall_id",
        )
        .bind(id)
        .bind(new.show_time)
        .bind(new.play)
        .bind(new.theater_hall)
        .fetch_optional(conn)
        .await
    }

    pub async fn delete(pool: &sqlx::PgPool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM performances WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn taken_places(pool: &sqlx::PgPool, id: i64) -> Result<Vec<TakenPlace>, sqlx::Error> {
        sqlx::query_as::<_, TakenPlace>(
            "SELECT row, seat FROM tickets WHERE performance_id = $1 ORDER BY row, seat",
        )
        .bind(id)
        .fetch_all(pool)
        .await
    }

    /// Performance with play, hall and sold places; `None` if any is gone.
    pub async fn detail(pool: &sqlx::PgPool, id: i64) -> Result<Option<PerformanceDetailView>, sqlx::Error> {
        let Some(performance) = Self::find(pool, id).await? else {
            return Ok(None);
        };
        let Some(play) = Play::find(pool, performance.play_id).await? else {
            return Ok(None);
        };
        let Some(hall) = TheaterHall::find(pool, performance.theater_hall_id).await? else {
            return Ok(None);
        };
        let taken_places = Self::taken_places(pool, id).await?;

        Ok(Some(PerformanceDetailView {
            id: performance.id,
            show_time: performance.show_time,
            play: PlayListView::from(play),
            theater_hall: TheaterHallView::from(hall),
            taken_places,
        }))
    }
}

/// Furthest row and seat sold for a performance; both `None` when nothing
/// is sold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromRow)]
pub struct SoldExtent {
    pub max_row: Option<i32>,
    pub max_seat: Option<i32>,
}

impl SoldExtent {
    /// Whether every sold place still exists in `hall`.
    pub fn check_fits(&self, hall: &TheaterHall) -> Result<(), FieldErrors> {
        let row_fits = self.max_row.is_none_or(|row| row <= hall.rows);
        let seat_fits = self.max_seat.is_none_or(|seat| seat <= hall.seats_in_row);
        if row_fits && seat_fits {
            return Ok(());
        }
        let mut errors = FieldErrors::new();
        errors.insert(
            "theater_hall".to_string(),
            vec![format!(
                "Sold tickets reach row {} and seat {}; hall \"{}\" has {} rows of {} seats.",
                self.max_row.unwrap_or(0),
                self.max_seat.unwrap_or(0),
                hall.name,
                hall.rows,
                hall.seats_in_row
            )],
        );
        Err(errors)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct TakenPlace {
    pub row: i32,
    pub seat: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct PerformanceDetailView {
    pub id: i64,
    pub show_time: NaiveDateTime,
    pub play: PlayListView,
    pub theater_hall: TheaterHallView,
    pub taken_places: Vec<TakenPlace>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPerformance {
    pub show_time: NaiveDateTime,
    pub play: i64,
    pub theater_hall: i64,
}

/// PATCH body: absent fields keep their stored values.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PerformancePatch {
    pub show_time: Option<NaiveDateTime>,
    pub play: Option<i64>,
    pub theater_hall: Option<i64>,
}

impl PerformancePatch {
    pub fn apply(self, current: &Performance) -> NewPerformance {
        NewPerformance {
            show_time: self.show_time.unwrap_or(current.show_time),
            play: self.play.unwrap_or(current.play_id),
            theater_hall: self.theater_hall.unwrap_or(current.theater_hall_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 14)
            .and_then(|d| d.and_hms_opt(hour, 0, 0))
            .unwrap()
    }

    #[test]
    fn performance_serializes_foreign_keys_by_relation_name() {
        let perf = Performance { id: 3, show_time: at(19), play_id: 1, theater_hall_id: 2 };
        let json = serde_json::to_value(&perf).unwrap();
        assert_eq!(json["play"], 1);
        assert_eq!(json["theater_hall"], 2);
        assert_eq!(json["show_time"], "2025-03-14T19:00:00");
    }

    #[test]
    fn patch_keeps_unset_fields() {
        let perf = Performance { id: 3, show_time: at(19), play_id: 1, theater_hall_id: 2 };
        let patched = PerformancePatch { theater_hall: Some(9), ..Default::default() }.apply(&perf);
        assert_eq!(patched.show_time, at(19));
        assert_eq!(patched.play, 1);
        assert_eq!(patched.theater_hall, 9);
    }

    fn hall(rows: i32, seats_in_row: i32) -> TheaterHall {
        TheaterHall { id: 7, name: "Studio".into(), rows, seats_in_row }
    }

    #[test]
    fn unsold_performance_fits_any_hall() {
        assert!(SoldExtent::default().check_fits(&hall(1, 1)).is_ok());
    }

    #[test]
    fn sold_places_must_fit_the_new_hall() {
        let extent = SoldExtent { max_row: Some(9), max_seat: Some(5) };
        assert!(extent.check_fits(&hall(10, 10)).is_ok());
        assert!(extent.check_fits(&hall(9, 5)).is_ok());

        let errors = extent.check_fits(&hall(2, 2)).unwrap_err();
        assert_eq!(
            errors["theater_hall"],
            vec!["Sold tickets reach row 9 and seat 5; hall \"Studio\" has 2 rows of 2 seats.".to_string()]
        );
        // seat overflow alone is enough
        assert!(extent.check_fits(&hall(20, 4)).is_err());
    }
}
