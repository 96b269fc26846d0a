use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::performance::{PerformanceListItem, LIST_COLUMNS, LIST_JOINS};
use super::theater_hall::TheaterHall;
use crate::error::FieldErrors;

#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct Reservation {
    pub id: i64,
    pub created_at: NaiveDateTime,
    pub user_id: i64,
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct Ticket {
    pub id: i64,
    pub row: i32,
    pub seat: i32,
    #[serde(rename = "performance")]
    pub performance_id: i64,
    #[serde(skip)]
    pub reservation_id: i64,
}

impl Ticket {
    /// Checks that `row`/`seat` fall inside the hall, reporting every
    /// offending field.
    pub fn validate_place(row: i32, seat: i32, hall: &TheaterHall) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        for (value, name, hall_attr, limit) in [
            (row, "row", "rows", hall.rows),
            (seat, "seat", "seats_in_row", hall.seats_in_row),
        ] {
            if !(1..=limit).contains(&value) {
                errors.insert(
                    name.to_string(),
                    vec![format!(
                        "{name} number must be in available range: (1, {hall_attr}): (1, {limit})"
                    )],
                );
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl Reservation {
    pub async fn count_for_user(pool: &sqlx::PgPool, user_id: i64) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM reservations WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(pool)
            .await
    }

    /// One page of the user's reservations, newest first, tickets included.
    pub async fn page_for_user(
        pool: &sqlx::PgPool,
        user_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ReservationListView>, sqlx::Error> {
        let reservations = sqlx::query_as::<_, Reservation>(
            "SELECT id, created_at, user_id FROM reservations
             WHERE user_id = $1
             ORDER BY created_at DESC, id DESC
             LIMIT $2 OFFSET $3",
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        if reservations.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i64> = reservations.iter().map(|r| r.id).collect();

        let sql = format!(
            "SELECT t.reservation_id, t.id AS ticket_id, t.row, t.seat, {LIST_COLUMNS}
             FROM tickets t
             JOIN performances pf ON pf.id = t.performance_id
             {LIST_JOINS}
             WHERE t.reservation_id = ANY($1)
             ORDER BY t.id"
        );
        let rows = sqlx::query_as::<_, ReservationTicketRow>(&sql)
            .bind(&ids)
            .fetch_all(pool)
            .await?;

        Ok(ReservationListView::assemble(reservations, rows))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NewTicket {
    pub row: i32,
    pub seat: i32,
    pub performance: i64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewReservation {
    #[validate(length(min = 1, message = "This list may not be empty."))]
    pub tickets: Vec<NewTicket>,
}

impl NewReservation {
    /// Indexes of tickets that repeat an earlier `(performance, row, seat)`.
    pub fn duplicate_places(&self) -> Vec<usize> {
        let mut seen = std::collections::HashSet::new();
        self.tickets
            .iter()
            .enumerate()
            .filter(|(_, t)| !seen.insert((t.performance, t.row, t.seat)))
            .map(|(i, _)| i)
            .collect()
    }
}

/// `{id, created_at, tickets: [{id, row, seat, performance}]}`
#[derive(Debug, Clone, Serialize)]
pub struct ReservationView {
    pub id: i64,
    pub created_at: NaiveDateTime,
    pub tickets: Vec<Ticket>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TicketListView {
    pub id: i64,
    pub row: i32,
    pub seat: i32,
    pub performance: PerformanceListItem,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReservationListView {
    pub id: i64,
    pub created_at: NaiveDateTime,
    pub tickets: Vec<TicketListView>,
}

/// Flat ticket row for the reservation list query, one per ticket.
#[derive(Debug, Clone, FromRow)]
pub struct ReservationTicketRow {
    pub reservation_id: i64,
    pub ticket_id: i64,
    pub row: i32,
    pub seat: i32,
    #[sqlx(flatten)]
    pub performance: PerformanceListItem,
}

impl ReservationListView {
    /// Groups ticket rows under their reservations, keeping reservation order.
    pub fn assemble(
        reservations: Vec<Reservation>,
        rows: Vec<ReservationTicketRow>,
    ) -> Vec<ReservationListView> {
        let mut by_reservation: std::collections::HashMap<i64, Vec<TicketListView>> =
            std::collections::HashMap::new();
        for r in rows {
            by_reservation.entry(r.reservation_id).or_default().push(TicketListView {
                id: r.ticket_id,
                row: r.row,
                seat: r.seat,
                performance: r.performance,
            });
        }

        reservations
            .into_iter()
            .map(|res| ReservationListView {
                tickets: by_reservation.remove(&res.id).unwrap_or_default(),
                id: res.id,
                created_at: res.created_at,
            })
            .collect()
    }
}
