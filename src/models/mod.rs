pub mod actor;
pub mod genre;
pub mod performance;
pub mod play;
pub mod reservation;
pub mod theater_hall;
pub mod user;

pub use actor::Actor;
pub use genre::Genre;
pub use performance::{Performance, PerformanceListItem};
pub use play::Play;
pub use reservation::{Reservation, Ticket};
pub use theater_hall::TheaterHall;
pub use user::User;
