pub mod auth;
pub mod handlers;
pub mod leaderboard;
pub mod migration;
pub mod storage;
