use crate::modules::{
    auth::AuthenticatedUser,
    handlers::ApiResponse,
    leaderboard::{
        model::{RankingEntry, RefreshReport},
        publisher::FanoutPublisher,
        refresh::RefreshOrchestrator,
    },
};
use axum::{extract::Extension, http::StatusCode, Json};
use std::{sync::Arc, time::Instant};

pub async fn get_friend_leaderboard(
    user: AuthenticatedUser,
    Extension(publisher): Extension<Arc<FanoutPublisher>>,
) -> (StatusCode, Json<ApiResponse<Vec<RankingEntry>>>) {
    let start = Instant::now();
    match publisher.ranking_for(user.id).await {
        Ok(ranking) => {
            let elapsed_time = start.elapsed().as_millis();
            tracing::info!(
                target: "querylog",
                "elapsed_time={} user={} entries={}",
                elapsed_time,
                user.id,
                ranking.len()
            );
            (StatusCode::OK, Json(ApiResponse::ok(ranking)))
        }
        Err(e) => {
            tracing::error!("failed to build leaderboard of {}: {:?}", user.id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error("Failed to fetch friend leaderboard")),
            )
        }
    }
}

/// Refresh the caller's group. Responds once every member has been processed;
/// the fan-out keeps running in the background.
pub async fn refresh_leaderboard(
    user: AuthenticatedUser,
    Extension(orchestrator): Extension<Arc<RefreshOrchestrator>>,
) -> (StatusCode, Json<ApiResponse<RefreshReport>>) {
    match orchestrator.refresh_group(user.id).await {
        Ok(outcome) => {
            let report = outcome.report;
            let message = format!(
                "Refreshed {} of {} member(s)",
                report.succeeded,
                report.members.len()
            );
            (
                StatusCode::OK,
                Json(ApiResponse::ok(report).with_message(message)),
            )
        }
        // Only a failure to resolve the group reaches here; member failures are in the report.
        Err(e) => {
            tracing::error!("failed to refresh group of {}: {}", user.id, e.describe());
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error("Failed to refresh leaderboard data")),
            )
        }
    }
}
