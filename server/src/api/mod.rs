pub mod auth;
pub mod error;
pub mod games;
pub mod jwt;
pub mod leaderboard;
pub mod leagues;
pub mod middleware;
pub mod picks;
pub mod rate_limit;
pub mod server;
pub mod teams;
pub mod users;

use std::collections::HashSet;
use std::sync::Arc;

use crate::db::Database;
use jwt::JwtManager;

pub use server::{router, run_api_server};

/// Shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub jwt_manager: Arc<JwtManager>,
    pub scoring_concurrency: usize,
    /// Usernames granted admin rights when they register
    pub admin_usernames: Arc<HashSet<String>>,
}

impl AppState {
    pub fn new(db: Database, jwt_manager: JwtManager, scoring_concurrency: usize) -> Self {
        Self {
            db,
            jwt_manager: Arc::new(jwt_manager),
            scoring_concurrency,
            admin_usernames: Arc::new(HashSet::new()),
        }
    }

    pub fn with_admins<I, S>(mut self, usernames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.admin_usernames = Arc::new(usernames.into_iter().map(Into::into).collect());
        self
    }
}
