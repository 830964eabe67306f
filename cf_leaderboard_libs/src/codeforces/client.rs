use crate::codeforces::model::*;
use async_trait::async_trait;
use reqwest::{self, Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::time::Duration;

type Result<T> = std::result::Result<T, CodeforcesError>;

#[derive(Debug, Error)]
pub enum CodeforcesError {
    #[error("failed to request to Codeforces API")]
    RequestError(#[from] reqwest::Error),
    #[error("failed to deserialize JSON data")]
    DeserializeError(#[from] serde_json::Error),
    #[error("invalid Codeforces API url given")]
    InvalidUrlError(#[from] url::ParseError),
    #[error("Codeforces API returned FAILED: {0}")]
    ApiError(String),
    #[error("user {0} not found")]
    UserNotFound(String),
    #[error("{0}")]
    UnexpectedError(String),
}

/// Read-only access to one handle's standing on the external rating service.
///
/// The three calls are independent; each may fail without affecting the others.
#[async_trait]
pub trait RatingClient {
    async fn get_user_info(&self, handle: &str) -> Result<CodeforcesUser>;
    async fn get_user_rating(&self, handle: &str) -> Result<Vec<RatingChange>>;
    async fn get_user_submissions(&self, handle: &str) -> Result<Vec<Submission>>;
}

pub struct CodeforcesClient {
    user_info_url: Url,
    user_rating_url: Url,
    user_status_url: Url,
    client: Client,
}

impl CodeforcesClient {
    pub fn new(api_url: &str) -> Result<Self> {
        let mut base_url = Url::parse(api_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let user_info_url = base_url.join("user.info")?;
        let user_rating_url = base_url.join("user.rating")?;
        let user_status_url = base_url.join("user.status")?;

        let client = Client::builder()
            .gzip(true)
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(CodeforcesClient {
            user_info_url,
            user_rating_url,
            user_status_url,
            client,
        })
    }

    async fn call<T>(&self, url: &Url, params: &[(&str, &str)]) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let res = self.client.get(url.clone()).query(params).send().await?;
        let status = res.status();
        tracing::debug!("GET {} {:?} -> {}", url.path(), params, status);
        let body = res.text().await?;

        decode_response(url.path(), status, &body)
    }
}

/// Unwrap the `{status, comment, result}` envelope of a Codeforces response.
///
/// Codeforces reports API-level failures as a JSON envelope with a 4xx status.
fn decode_response<T>(path: &str, status: StatusCode, body: &str) -> Result<T>
where
    T: DeserializeOwned,
{
    let response: CodeforcesResponse<T> = match serde_json::from_str(body) {
        Ok(response) => response,
        Err(e) if status.is_success() => {
            tracing::error!("failed to deserialize response from {}: {}", path, e);
            return Err(CodeforcesError::DeserializeError(e));
        }
        Err(_) => {
            let message = format!("unexpected response [{}] from {}", status, path);
            tracing::error!(message);
            return Err(CodeforcesError::UnexpectedError(message));
        }
    };

    match (response.status.as_str(), response.result) {
        ("OK", Some(result)) => Ok(result),
        _ => {
            let comment = response.comment.unwrap_or_default();
            tracing::warn!("Codeforces API {} returned FAILED: {}", path, comment);
            Err(CodeforcesError::ApiError(comment))
        }
    }
}

#[async_trait]
impl RatingClient for CodeforcesClient {
    async fn get_user_info(&self, handle: &str) -> Result<CodeforcesUser> {
        let users: Vec<CodeforcesUser> = self
            .call(&self.user_info_url, &[("handles", handle)])
            .await?;
        users
            .into_iter()
            .next()
            .ok_or(CodeforcesError::UserNotFound(handle.to_string()))
    }

    async fn get_user_rating(&self, handle: &str) -> Result<Vec<RatingChange>> {
        self.call(&self.user_rating_url, &[("handle", handle)]).await
    }

    async fn get_user_submissions(&self, handle: &str) -> Result<Vec<Submission>> {
        self.call(&self.user_status_url, &[("handle", handle)]).await
    }
}
