//! Mattermost chat platform client
//!
//! Talks to the Mattermost v4 REST API: authenticates the bot, lists channel
//! members, and posts messages into channels, group messages and direct
//! messages.

use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use shared::{ChannelRef, MemberId};
use tokio::sync::RwLock;
use url::Url;

use crate::config::{Credentials, MattermostSettings};
use crate::error::{PairbotError, PairbotResult};
use crate::traits::ChatPlatform;

/// Mattermost caps `per_page` at 200
const MEMBERS_PER_PAGE: usize = 200;

#[derive(Debug, Clone)]
struct Session {
    token: String,
    user_id: MemberId,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ChannelResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ChannelMemberResponse {
    user_id: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    message: String,
}

/// Real chat platform client
pub struct MattermostClient {
    http: reqwest::Client,
    api_base: Url,
    credentials: Credentials,
    session: RwLock<Option<Session>>,
}

impl MattermostClient {
    pub fn new(settings: MattermostSettings) -> PairbotResult<Self> {
        let api_base = settings
            .server_url
            .join("api/v4/")
            .map_err(|e| PairbotError::config("PAIRBOT_MATTERMOST_URL", e.to_string()))?;

        Ok(Self {
            http: reqwest::Client::new(),
            api_base,
            credentials: settings.credentials,
            session: RwLock::new(None),
        })
    }

    /// Build an endpoint URL, percent-encoding each path segment
    fn endpoint(&self, segments: &[&str]) -> PairbotResult<Url> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| PairbotError::config("PAIRBOT_MATTERMOST_URL", "URL cannot be a base"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn session(&self) -> PairbotResult<Session> {
        if let Some(session) = self.session.read().await.as_ref() {
            return Ok(session.clone());
        }
        self.login().await?;
        self.session
            .read()
            .await
            .clone()
            .ok_or_else(|| PairbotError::Platform {
                status: None,
                message: "login did not establish a session".to_string(),
            })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> PairbotResult<T> {
        let session = self.session().await?;
        let response = self.http.get(url).bearer_auth(&session.token).send().await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn post_json<T: DeserializeOwned>(&self, url: Url, body: serde_json::Value) -> PairbotResult<T> {
        let session = self.session().await?;
        let response = self.http.post(url).bearer_auth(&session.token).json(&body).send().await?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// Map non-success statuses to a platform error carrying the API message
    async fn check(response: Response) -> PairbotResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorResponse>(&body)
            .map(|e| e.message)
            .unwrap_or(body);
        Err(PairbotError::Platform {
            status: Some(status.as_u16()),
            message,
        })
    }

    async fn channel_id(&self, channel: &ChannelRef) -> PairbotResult<String> {
        let url = self.endpoint(&["teams", "name", &channel.team, "channels", "name", &channel.channel])?;
        let response: ChannelResponse = self.get_json(url).await?;
        Ok(response.id)
    }

    async fn create_post(&self, channel_id: &str, message: &str) -> PairbotResult<()> {
        let url = self.endpoint(&["posts"])?;
        let _: serde_json::Value = self
            .post_json(url, json!({ "channel_id": channel_id, "message": message }))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ChatPlatform for MattermostClient {
    async fn login(&self) -> PairbotResult<MemberId> {
        let session = match &self.credentials {
            Credentials::Token(token) => {
                let url = self.endpoint(&["users", "me"])?;
                let response = self.http.get(url).bearer_auth(token).send().await?;
                let user: UserResponse = Self::check(response).await?.json().await?;
                Session {
                    token: token.clone(),
                    user_id: MemberId::new(user.id),
                }
            }
            Credentials::Password { login_id, password } => {
                let url = self.endpoint(&["users", "login"])?;
                let response = self
                    .http
                    .post(url)
                    .json(&json!({ "login_id": login_id, "password": password }))
                    .send()
                    .await?;
                let response = Self::check(response).await?;
                let token = response
                    .headers()
                    .get("Token")
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string)
                    .ok_or_else(|| PairbotError::Platform {
                        status: Some(StatusCode::OK.as_u16()),
                        message: "login response carried no session token".to_string(),
                    })?;
                let user: UserResponse = response.json().await?;
                Session {
                    token,
                    user_id: MemberId::new(user.id),
                }
            }
        };

        tracing::debug!(bot_id = %session.user_id, "Authenticated with Mattermost");
        let user_id = session.user_id.clone();
        *self.session.write().await = Some(session);
        Ok(user_id)
    }

    async fn channel_members(&self, channel: &ChannelRef) -> PairbotResult<Vec<MemberId>> {
        let channel_id = self.channel_id(channel).await?;
        let mut members = Vec::new();

        for page in 0usize.. {
            let mut url = self.endpoint(&["channels", &channel_id, "members"])?;
            url.query_pairs_mut()
                .append_pair("page", &page.to_string())
                .append_pair("per_page", &MEMBERS_PER_PAGE.to_string());

            let batch: Vec<ChannelMemberResponse> = self.get_json(url).await?;
            let fetched = batch.len();
            members.extend(batch.into_iter().map(|m| MemberId::new(m.user_id)));
            if fetched < MEMBERS_PER_PAGE {
                break;
            }
        }

        tracing::debug!(%channel, count = members.len(), "Fetched channel members");
        Ok(members)
    }

    async fn post_to_channel(&self, channel: &ChannelRef, message: &str) -> PairbotResult<()> {
        let channel_id = self.channel_id(channel).await?;
        self.create_post(&channel_id, message).await
    }

    async fn message_group(&self, members: &[MemberId], message: &str) -> PairbotResult<()> {
        let session = self.session().await?;
        let ids: Vec<&str> = members.iter().map(MemberId::as_str).collect();

        // Group channels need at least three users including the bot; a lone
        // recipient gets a direct message instead
        let response: ChannelResponse = if ids.len() == 1 {
            let url = self.endpoint(&["channels", "direct"])?;
            self.post_json(url, json!([session.user_id.as_str(), ids[0]])).await?
        } else {
            let url = self.endpoint(&["channels", "group"])?;
            self.post_json(url, json!(ids)).await?
        };

        self.create_post(&response.id, message).await
    }
}
