//! booking.rs
//!
//! Reservation checkout: validates every requested ticket against the hall
//! of its performance and writes the reservation with all of its tickets in
//! one transaction. Seat uniqueness per performance is ultimately enforced
//! by the `tickets_performance_row_seat_key` index, so two concurrent
//! requests for the same place end with one success and one 400.

use std::collections::HashMap;

use sqlx::{Postgres, Transaction};
use tracing::info;

use crate::{
    error::{is_constraint_violation, ApiError, FieldErrors},
    models::{
        reservation::{NewReservation, NewTicket, ReservationView},
        Reservation, TheaterHall, Ticket,
    },
};

const SEAT_TAKEN: &str = "This seat is already taken for the performance.";

fn ticket_field(index: usize, field: &str) -> String {
    format!("tickets[{index}].{field}")
}

/// Validates tickets against their halls. `halls` maps performance id to
/// hall; a performance missing from it does not exist.
pub fn check_tickets(tickets: &[NewTicket], halls: &HashMap<i64, TheaterHall>) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();

    for (index, ticket) in tickets.iter().enumerate() {
        match halls.get(&ticket.performance) {
            None => {
                errors.insert(
                    ticket_field(index, "performance"),
                    vec![format!("Invalid pk \"{}\" - object does not exist.", ticket.performance)],
                );
            }
            Some(hall) => {
                if let Err(place_errors) = Ticket::validate_place(ticket.row, ticket.seat, hall) {
                    for (field, messages) in place_errors {
                        errors.insert(ticket_field(index, &field), messages);
                    }
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Halls of the requested performances, share-locked until commit so the
/// hall assignment cannot change under the validation.
async fn lock_halls(
    tx: &mut Transaction<'_, Postgres>,
    performance_ids: &[i64],
) -> Result<HashMap<i64, TheaterHall>, sqlx::Error> {
    #[derive(sqlx::FromRow)]
    struct Row {
        performance_id: i64,
        #[sqlx(flatten)]
        hall: TheaterHall,
    }

    let rows = sqlx::query_as::<_, Row>(
        "SELECT pf.id AS performance_id, th.id, th.name, th.rows, th.seats_in_row
         FROM performances pf
         JOIN theater_halls th ON th.id = pf.theater_hall_id
         WHERE pf.id = ANY($1)
         FOR SHARE OF pf",
    )
    .bind(performance_ids)
    .fetch_all(&mut **tx)
    .await?;

    Ok(rows.into_iter().map(|r| (r.performance_id, r.hall)).collect())
}

/// Creates a reservation for `user_id` holding every requested ticket, or
/// nothing at all.
pub async fn reserve(pool: &sqlx::PgPool, user_id: i64, request: &NewReservation) -> Result<ReservationView, ApiError> {
    let duplicates = request.duplicate_places();
    if !duplicates.is_empty() {
        let errors = duplicates
            .into_iter()
            .map(|i| (ticket_field(i, "seat"), vec!["Duplicate place in the reservation.".to_string()]))
            .collect();
        return Err(ApiError::Validation(errors));
    }

    let mut performance_ids: Vec<i64> = request.tickets.iter().map(|t| t.performance).collect();
    performance_ids.sort_unstable();
    performance_ids.dedup();

    let mut tx = pool.begin().await?;

    let halls = lock_halls(&mut tx, &performance_ids).await?;
    check_tickets(&request.tickets, &halls).map_err(ApiError::Validation)?;

    let reservation = sqlx::query_as::<_, Reservation>(
        "INSERT INTO reservations (user_id) VALUES ($1) RETURNING id, created_at, user_id",
    )
    .bind(user_id)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        // the account behind a still valid token was removed
        if is_constraint_violation(&e) {
            ApiError::Unauthorized
        } else {
            ApiError::Database(e)
        }
    })?;

    let mut tickets = Vec::with_capacity(request.tickets.len());
    for (index, ticket) in request.tickets.iter().enumerate() {
        let created = sqlx::query_as::<_, Ticket>(
            "INSERT INTO tickets (row, seat, performance_id, reservation_id)
             VALUES ($1, $2, $3, $4)
             RETURNING id, row, seat, performance_id, reservation_id",
        )
        .bind(ticket.row)
        .bind(ticket.seat)
        .bind(ticket.performance)
        .bind(reservation.id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| ApiError::from_write(e, &ticket_field(index, "seat"), SEAT_TAKEN))?;
        tickets.push(created);
    }

    tx.commit().await?;

    info!(
        "Reservation {} created for user {} with {} tickets",
        reservation.id,
        user_id,
        tickets.len()
    );

    Ok(ReservationView {
        id: reservation.id,
        created_at: reservation.created_at,
        tickets,
    })
}
