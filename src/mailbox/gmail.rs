//! Gmail REST client implementing [`MailboxClient`] over the Gmail v1 API.

use std::collections::HashSet;

use async_trait::async_trait;
use reqwest::{RequestBuilder, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::de::{DeserializeOwned, IgnoredAny};
use tracing::debug;

use crate::config::GmailConfig;
use crate::error::MailboxError;
use crate::mailbox::auth::TokenProvider;
use crate::mailbox::types::{
    CreateLabelRequest, ErrorEnvelope, Label, LabelList, Message, MessageList,
    ModifyMessageRequest,
};
use crate::mailbox::{LabelInfo, MailboxClient};

/// Gmail caps `maxResults` for `messages.list` at 500.
const MAX_PAGE_SIZE: u32 = 500;

/// Gmail API client for one mailbox.
pub struct GmailClient {
    http: reqwest::Client,
    api_base: String,
    user_id: String,
    auth: TokenProvider,
}

impl GmailClient {
    /// Build a client from config: a raw access token wins over the token file.
    pub fn new(config: &GmailConfig) -> Self {
        let auth = match &config.access_token {
            Some(token) => TokenProvider::from_access_token(token.clone()),
            None => TokenProvider::from_token_file(&config.token_path),
        };
        Self::with_auth(&config.api_base, &config.user_id, auth)
    }

    /// Client with a fixed bearer token.
    pub fn with_access_token(api_base: &str, user_id: &str, token: SecretString) -> Self {
        Self::with_auth(api_base, user_id, TokenProvider::from_access_token(token))
    }

    fn with_auth(api_base: &str, user_id: &str, auth: TokenProvider) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            user_id: user_id.to_string(),
            auth,
        }
    }

    /// `{api_base}/gmail/v1/users/{user_id}/{segments..}`, each segment
    /// percent-encoded.
    fn url(&self, segments: &[&str]) -> Result<Url, MailboxError> {
        let base = &self.api_base;
        let mut url = Url::parse(base)
            .map_err(|e| MailboxError::Transport(format!("invalid API base {base}: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| MailboxError::Transport(format!("API base {base} cannot take a path")))?
            .pop_if_empty()
            .extend(["gmail", "v1", "users", self.user_id.as_str()])
            .extend(segments);
        Ok(url)
    }

    /// Attach auth, send, map non-2xx responses to `MailboxError::Api`.
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, MailboxError> {
        let token = self.auth.access_token().await?;
        let resp = request.bearer_auth(token.expose_secret()).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|env| env.error.message)
                .unwrap_or(body);
            return Err(MailboxError::Api {
                status: status.as_u16(),
                body: message,
            });
        }

        Ok(resp.json::<T>().await?)
    }

    /// Ids of messages matching a Gmail search query, up to `max_results`.
    pub async fn list_message_ids(
        &self,
        query: &str,
        max_results: u32,
    ) -> Result<Vec<String>, MailboxError> {
        let mut ids = Vec::new();
        let mut page_token: Option<String> = None;

        while ids.len() < max_results as usize {
            let remaining = max_results - ids.len() as u32;
            let mut params = vec![
                ("q", query.to_string()),
                ("maxResults", remaining.min(MAX_PAGE_SIZE).to_string()),
            ];
            if let Some(token) = &page_token {
                params.push(("pageToken", token.clone()));
            }

            let page: MessageList = self
                .send(self.http.get(self.url(&["messages"])?).query(&params))
                .await?;
            if page.messages.is_empty() {
                break;
            }
            ids.extend(page.messages.into_iter().map(|m| m.id));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        ids.truncate(max_results as usize);
        debug!(query, count = ids.len(), "Listed message ids");
        Ok(ids)
    }

    /// Fetch a message in `raw` format (base64url RFC 822 plus label ids).
    pub async fn get_raw_message(&self, message_id: &str) -> Result<Message, MailboxError> {
        self.send(
            self.http
                .get(self.url(&["messages", message_id])?)
                .query(&[("format", "raw")]),
        )
        .await
    }
}

#[async_trait]
impl MailboxClient for GmailClient {
    async fn list_labels(&self) -> Result<Vec<LabelInfo>, MailboxError> {
        let list: LabelList = self.send(self.http.get(self.url(&["labels"])?)).await?;
        Ok(list
            .labels
            .into_iter()
            .map(|l| LabelInfo {
                id: l.id,
                name: l.name,
            })
            .collect())
    }

    async fn create_label(&self, name: &str) -> Result<String, MailboxError> {
        let created: Label = self
            .send(
                self.http
                    .post(self.url(&["labels"])?)
                    .json(&CreateLabelRequest::visible(name)),
            )
            .await?;
        Ok(created.id)
    }

    async fn get_message_labels(&self, message_id: &str) -> Result<HashSet<String>, MailboxError> {
        let msg: Message = self
            .send(
                self.http
                    .get(self.url(&["messages", message_id])?)
                    .query(&[("format", "minimal")]),
            )
            .await?;
        Ok(msg.label_ids.into_iter().collect())
    }

    async fn modify_message_labels(
        &self,
        message_id: &str,
        add: &[String],
        remove: &[String],
    ) -> Result<(), MailboxError> {
        let body = ModifyMessageRequest {
            add_label_ids: add.to_vec(),
            remove_label_ids: remove.to_vec(),
        };
        let _: IgnoredAny = self
            .send(
                self.http
                    .post(self.url(&["messages", message_id, "modify"])?)
                    .json(&body),
            )
            .await?;
        Ok(())
    }
}
