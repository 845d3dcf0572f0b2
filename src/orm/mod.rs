//! SeaORM entities, one module per table.

pub mod movie_petitions;
pub mod movies;
pub mod petition_votes;
pub mod reports;
pub mod reviews;
pub mod users;
