use crate::modules::{
    auth::AuthenticatedUser,
    handlers::{
        request::{AddFriendRequest, HandleSearchParameters, ValidatedQuery},
        ApiResponse,
    },
    storage::{FriendSummary, FriendshipChange, PgStore, UserDigest},
};
use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    Json,
};
use serde_json::Value;
use uuid::Uuid;

const DEFAULT_SEARCH_LIMIT: i64 = 10;

type Reply<T> = (StatusCode, Json<ApiResponse<T>>);

fn internal_error<T>(context: &str, e: anyhow::Error) -> Reply<T> {
    tracing::error!("{}: {:?}", context, e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiResponse::error(context)),
    )
}

pub async fn add_friend(
    user: AuthenticatedUser,
    Extension(store): Extension<PgStore>,
    Json(request): Json<AddFriendRequest>,
) -> Reply<Value> {
    if request.friend_id == user.id {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error("Cannot add yourself as a friend")),
        );
    }

    match store.add_friendship(user.id, request.friend_id).await {
        Ok(FriendshipChange::Created) => {
            tracing::info!("{} and {} are now friends", user.id, request.friend_id);
            (
                StatusCode::CREATED,
                Json(ApiResponse::ok(Value::Null).with_message("Friend added successfully")),
            )
        }
        Ok(FriendshipChange::AlreadyExists) => (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error("Already friends with this user")),
        ),
        Ok(FriendshipChange::UnknownUser) => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error("User not found")),
        ),
        Err(e) => internal_error("Failed to add friend", e),
    }
}

pub async fn list_friends(
    user: AuthenticatedUser,
    Extension(store): Extension<PgStore>,
) -> Reply<Vec<FriendSummary>> {
    match store.friends_of(user.id).await {
        Ok(friends) => (StatusCode::OK, Json(ApiResponse::ok(friends))),
        Err(e) => internal_error("Failed to fetch friends", e),
    }
}

pub async fn remove_friend(
    user: AuthenticatedUser,
    Extension(store): Extension<PgStore>,
    Path(friend_id): Path<Uuid>,
) -> Reply<Value> {
    match store.remove_friendship(user.id, friend_id).await {
        Ok(0) => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error("Friendship not found")),
        ),
        Ok(_) => (
            StatusCode::OK,
            Json(ApiResponse::ok(Value::Null).with_message("Friend removed successfully")),
        ),
        Err(e) => internal_error("Failed to remove friend", e),
    }
}

pub async fn search_users(
    user: AuthenticatedUser,
    Extension(store): Extension<PgStore>,
    ValidatedQuery(params): ValidatedQuery<HandleSearchParameters>,
) -> Reply<Vec<UserDigest>> {
    let limit = params.limit.unwrap_or(DEFAULT_SEARCH_LIMIT);
    match store.search_by_handle(user.id, &params.handle, limit).await {
        Ok(users) => (StatusCode::OK, Json(ApiResponse::ok(users))),
        Err(e) => internal_error("Failed to search users", e),
    }
}
