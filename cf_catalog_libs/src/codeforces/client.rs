use crate::codeforces::{
    model::{ApiResponse, CfProblem, CfUserInfo, ProblemsetResult},
    problem_id::ProblemId,
};
use async_trait::async_trait;
use reqwest::{Client, Url};
use thiserror::Error;
use tokio::time::Duration;

pub const DEFAULT_API_URL: &str = "https://codeforces.com/api/";

type Result<T> = std::result::Result<T, FetchError>;

/// Any upstream failure (transport, timeout, non-OK envelope, missing entity)
/// normalized into one error type carrying a human-readable message.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to request to codeforces api: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("invalid codeforces api url given: {0}")]
    InvalidUrlError(#[from] url::ParseError),
    #[error("codeforces api returned an error: {0}")]
    ApiError(String),
    #[error("{0} was not found on codeforces")]
    NotFound(String),
}

/// Source of canonical problem/user metadata.
///
/// The domain modules depend on this trait so batch jobs and handlers can be
/// exercised against a stub source in tests.
#[async_trait]
pub trait MetadataSource {
    async fn fetch_user_info(&self, handle: &str) -> Result<CfUserInfo>;
    async fn fetch_problem(&self, problem_id: &ProblemId) -> Result<CfProblem>;
}

pub struct CodeforcesClient {
    user_info_url: Url,
    problemset_url: Url,
    client: Client,
}

impl CodeforcesClient {
    pub fn new(api_url: &str) -> Result<Self> {
        // Url::join replaces the last path segment unless the base ends in `/`.
        let mut api_url = api_url.to_string();
        if !api_url.ends_with('/') {
            api_url.push('/');
        }
        let base_url = Url::parse(&api_url)?;
        let user_info_url = base_url.join("user.info")?;
        let problemset_url = base_url.join("problemset.problems")?;

        let client = Client::builder()
            .gzip(true)
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(CodeforcesClient {
            user_info_url,
            problemset_url,
            client,
        })
    }

    fn unwrap_envelope<T>(response: ApiResponse<T>) -> Result<T> {
        if response.status != "OK" {
            return Err(FetchError::ApiError(
                response
                    .comment
                    .unwrap_or_else(|| String::from("api returned non-OK status")),
            ));
        }
        response
            .result
            .ok_or_else(|| FetchError::ApiError(String::from("api returned an empty result")))
    }
}

#[async_trait]
impl MetadataSource for CodeforcesClient {
    async fn fetch_user_info(&self, handle: &str) -> Result<CfUserInfo> {
        tracing::info!("fetching codeforces user info for {}", handle);
        let res = self
            .client
            .get(self.user_info_url.clone())
            .query(&[("handles", handle)])
            .send()
            .await?;

        // Codeforces answers failed lookups with a JSON envelope and a non-2xx
        // status, so the envelope is parsed before the status is considered.
        let body: ApiResponse<Vec<CfUserInfo>> = res.json().await?;
        let mut users = Self::unwrap_envelope(body)?;
        if users.is_empty() {
            return Err(FetchError::NotFound(handle.to_string()));
        }

        Ok(users.remove(0))
    }

    async fn fetch_problem(&self, problem_id: &ProblemId) -> Result<CfProblem> {
        tracing::info!("fetching codeforces metadata for problem {}", problem_id);
        let res = self.client.get(self.problemset_url.clone()).send().await?;

        let body: ApiResponse<ProblemsetResult> = res.json().await?;
        let problems = Self::unwrap_envelope(body)?.problems;

        problems
            .into_iter()
            .find(|problem| {
                problem.contest_id == Some(problem_id.contest_id())
                    && problem.index.eq_ignore_ascii_case(problem_id.index())
            })
            .ok_or_else(|| FetchError::NotFound(format!("problem {}", problem_id)))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn new_rejects_malformed_url() {
        assert!(CodeforcesClient::new("not a url").is_err());
        assert!(CodeforcesClient::new(DEFAULT_API_URL).is_ok());
    }

    #[test]
    fn unwrap_envelope_maps_failed_status_to_api_error() {
        let response: ApiResponse<Vec<CfUserInfo>> = ApiResponse {
            status: String::from("FAILED"),
            comment: Some(String::from("handles: User with handle x not found")),
            result: None,
        };

        match CodeforcesClient::unwrap_envelope(response) {
            Err(FetchError::ApiError(message)) => assert!(message.contains("not found")),
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn unwrap_envelope_rejects_ok_status_without_result() {
        let response: ApiResponse<ProblemsetResult> = ApiResponse {
            status: String::from("OK"),
            comment: None,
            result: None,
        };

        assert!(matches!(
            CodeforcesClient::unwrap_envelope(response),
            Err(FetchError::ApiError(_))
        ));
    }
}
