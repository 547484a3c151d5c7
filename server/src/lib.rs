pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod leaderboard;
pub mod locks;
pub mod scoring;
pub mod season;

pub use db::Database;
pub use error::{Error, Result};
