//! A small REST client for the project tracker.

mod html;
mod types;

use std::fmt::{self, Debug};
use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;

pub use html::html_to_text;
pub use types::*;

const DEFAULT_BASE_URL: &str = "https://elateral.tpondemand.com/api/";
const DEFAULT_API_VERSION: &str = "v1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_ERROR_BODY_CHARS: usize = 300;

/// Errors returned by [`TrackerClient`].
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    /// The id is not a plain number.
    #[error("invalid id `{0}`, expected a non-empty string of digits")]
    InvalidId(String),
    /// A setting required by the operation is missing.
    #[error("{0} is not configured")]
    MissingConfig(&'static str),
    /// The request URL can't be built.
    #[error("invalid tracker URL: {0}")]
    Url(String),
    /// The request failed before a response was received, or the response
    /// body was malformed.
    #[error("tracker request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The tracker answered with an error status.
    #[error("tracker returned {status}: {body}")]
    Status {
        /// The HTTP status.
        status: StatusCode,
        /// The beginning of the response body.
        body: String,
    },
}

/// Checks that a ticket id is a non-empty string of ASCII digits.
pub fn validate_id(id: &str) -> Result<u64, TrackerError> {
    if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
        return Err(TrackerError::InvalidId(id.to_owned()));
    }
    id.parse().map_err(|_| TrackerError::InvalidId(id.to_owned()))
}

/// Connection settings of the tracker.
#[derive(Clone, PartialEq, Eq)]
pub struct TrackerConfig {
    base_url: String,
    api_version: String,
    token: String,
    owner_id: Option<u64>,
    project_id: Option<u64>,
}

impl TrackerConfig {
    /// Creates a configuration with the given access token and the default
    /// endpoint.
    pub fn with_token<S: Into<String>>(token: S) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            api_version: DEFAULT_API_VERSION.to_owned(),
            token: token.into(),
            owner_id: None,
            project_id: None,
        }
    }

    /// Sets the API root, e.g. `https://example.tpondemand.com/api/`.
    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        self.base_url = base_url;
        self
    }

    /// Sets the API version segment, e.g. `v1`.
    pub fn with_api_version<S: Into<String>>(mut self, version: S) -> Self {
        self.api_version = version.into();
        self
    }

    /// Sets the user that owns comments posted by the client.
    pub fn with_owner_id(mut self, owner_id: Option<u64>) -> Self {
        self.owner_id = owner_id;
        self
    }

    /// Sets the project new bugs are created in.
    pub fn with_project_id(mut self, project_id: Option<u64>) -> Self {
        self.project_id = project_id;
        self
    }
}

impl Debug for TrackerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackerConfig")
            .field("base_url", &self.base_url)
            .field("api_version", &self.api_version)
            .field("token", &"<deducted>")
            .field("owner_id", &self.owner_id)
            .field("project_id", &self.project_id)
            .finish()
    }
}

/// A client of the tracker REST API.
#[derive(Clone, Debug)]
pub struct TrackerClient {
    client: Client,
    config: Arc<TrackerConfig>,
}

impl TrackerClient {
    /// Creates a client with the given configuration.
    pub fn new(config: TrackerConfig) -> Result<Self, TrackerError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            config: Arc::new(config),
        })
    }

    /// Fetches a user story.
    pub async fn get_user_story(&self, id: &str) -> Result<UserStory, TrackerError> {
        let id = validate_id(id)?;
        self.get(self.url("UserStories", Some(id))?).await
    }

    /// Fetches a bug.
    pub async fn get_bug(&self, id: &str) -> Result<Bug, TrackerError> {
        let id = validate_id(id)?;
        self.get(self.url("Bugs", Some(id))?).await
    }

    /// Posts a comment on the entity with the given id.
    pub async fn add_comment(
        &self,
        id: &str,
        comment: &str,
    ) -> Result<Comment, TrackerError> {
        let id = validate_id(id)?;
        let owner_id = self
            .config
            .owner_id
            .ok_or(TrackerError::MissingConfig("TP_OWNER_ID"))?;
        let body = NewComment {
            description: comment,
            owner: EntityRef { id: owner_id },
            general: EntityRef { id },
        };
        self.post(self.url("Comments", None)?, &body).await
    }

    /// Creates a bug in the configured project.
    pub async fn create_bug(
        &self,
        name: &str,
        description: &str,
        user_story_id: Option<&str>,
    ) -> Result<Bug, TrackerError> {
        let project_id = self
            .config
            .project_id
            .ok_or(TrackerError::MissingConfig("TP_PROJECT_ID"))?;
        let user_story = match user_story_id {
            Some(id) => Some(EntityRef {
                id: validate_id(id)?,
            }),
            None => None,
        };
        let body = NewBug {
            name: name.to_owned(),
            description: description.to_owned(),
            project: EntityRef { id: project_id },
            user_story,
        };
        self.post(self.url("Bugs", None)?, &body).await
    }

    fn url(&self, resource: &str, id: Option<u64>) -> Result<Url, TrackerError> {
        let mut raw = format!(
            "{}{}/{}",
            self.config.base_url, self.config.api_version, resource
        );
        if let Some(id) = id {
            raw.push_str(&format!("/{id}"));
        }
        let mut url =
            Url::parse(&raw).map_err(|err| TrackerError::Url(err.to_string()))?;
        url.query_pairs_mut()
            .append_pair("format", "json")
            .append_pair("access_token", &self.config.token);
        Ok(url)
    }

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, TrackerError> {
        debug!("GET {}", url.path());
        let resp = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;
        decode(resp).await
    }

    async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        url: Url,
        body: &B,
    ) -> Result<T, TrackerError> {
        debug!("POST {}", url.path());
        let resp = self
            .client
            .post(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(body)
            .send()
            .await?;
        decode(resp).await
    }
}

async fn decode<T: DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, TrackerError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        warn!("tracker returned {status}");
        return Err(TrackerError::Status {
            status,
            body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
        });
    }
    Ok(resp.json().await?)
}
