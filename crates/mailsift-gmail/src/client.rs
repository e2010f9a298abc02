//! Gmail REST client.
//!
//! One client instance per user/invocation; the access token is injected by
//! the caller and never refreshed here. "Batch" fetches are issued as
//! rounds of at most [`BATCH_LIMIT`] concurrent sub-requests, mirroring the
//! API's batch ceiling; rounds run sequentially to bound pressure on the
//! remote end.

use std::collections::HashMap;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use futures::future;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::model::{Draft, History, HistoryPage, Label, Message, Thread, ThreadList, WatchResponse};

/// Maximum sub-requests per batch round, per the Gmail batch guidelines.
pub const BATCH_LIMIT: usize = 50;

/// Default number of threads requested per list page.
pub const THREAD_PAGE_SIZE: u32 = 50;

const BASE_URL: &str = "https://gmail.googleapis.com/gmail/v1/users/me";

/// One page of thread ids from `threads.list`.
#[derive(Debug, Clone, Default)]
pub struct ThreadIdPage {
    /// Thread ids on this page.
    pub ids: Vec<String>,
    /// Cursor for the next page, `None` on the last one.
    pub next_page_token: Option<String>,
}

/// Client for one user's mailbox.
pub struct GmailClient {
    http: reqwest::Client,
    access_token: String,
    base_url: String,
}

impl GmailClient {
    /// Create a client around an already-issued access token.
    #[must_use]
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            access_token: access_token.into(),
            base_url: BASE_URL.to_string(),
        }
    }

    /// Create a client pointed at a non-default endpoint (tests, proxies).
    #[must_use]
    pub fn with_base_url(access_token: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            access_token: access_token.into(),
            base_url: base_url.into(),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.access_token)
            .query(query)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn post_json<T: DeserializeOwned>(&self, path: &str, body: &serde_json::Value) -> Result<T> {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(body)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(Error::Unauthorized {
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                message,
            });
        }
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// List one page of thread ids.
    ///
    /// # Errors
    ///
    /// Returns an error if the request or decoding fails.
    pub async fn list_thread_ids(
        &self,
        page_token: Option<&str>,
        page_size: u32,
    ) -> Result<ThreadIdPage> {
        let mut query = vec![("maxResults", page_size.to_string())];
        if let Some(token) = page_token {
            query.push(("pageToken", token.to_string()));
        }
        let list: ThreadList = self.get_json("/threads", &query).await?;
        Ok(ThreadIdPage {
            ids: list.threads.into_iter().map(|t| t.id).collect(),
            next_page_token: list.next_page_token,
        })
    }

    /// Fetch one thread with full message detail.
    ///
    /// # Errors
    ///
    /// Returns an error if the request or decoding fails.
    pub async fn get_thread(&self, thread_id: &str) -> Result<Thread> {
        self.get_json(&format!("/threads/{thread_id}"), &[]).await
    }

    /// Fetch one message with full payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the request or decoding fails.
    pub async fn get_message(&self, message_id: &str) -> Result<Message> {
        self.get_json(&format!("/messages/{message_id}"), &[]).await
    }

    /// Fetch one label with counters.
    ///
    /// # Errors
    ///
    /// Returns an error if the request or decoding fails.
    pub async fn get_label(&self, label_id: &str) -> Result<Label> {
        self.get_json(&format!("/labels/{label_id}"), &[]).await
    }

    /// Batch-fetch threads by id. Failed sub-requests are logged and
    /// dropped from the result; rejected credentials abort the whole call.
    ///
    /// # Errors
    ///
    /// Returns an error only when the access token is rejected.
    pub async fn get_threads_by_ids(&self, thread_ids: &[String]) -> Result<HashMap<String, Thread>> {
        let mut threads = HashMap::with_capacity(thread_ids.len());
        for round in thread_ids.chunks(BATCH_LIMIT) {
            let results = future::join_all(round.iter().map(|id| self.get_thread(id))).await;
            for (id, result) in round.iter().zip(results) {
                match result {
                    Ok(thread) => {
                        threads.insert(thread.id.clone(), thread);
                    }
                    Err(e) if e.is_auth() => return Err(e),
                    Err(e) => warn!(thread_id = %id, error = %e, "failed to fetch thread"),
                }
            }
        }
        debug!(requested = thread_ids.len(), fetched = threads.len(), "thread batch done");
        Ok(threads)
    }

    /// Batch-fetch messages by id, same degradation rules as
    /// [`Self::get_threads_by_ids`].
    ///
    /// # Errors
    ///
    /// Returns an error only when the access token is rejected.
    pub async fn get_messages_by_ids(
        &self,
        message_ids: &[String],
    ) -> Result<HashMap<String, Message>> {
        let mut messages = HashMap::with_capacity(message_ids.len());
        for round in message_ids.chunks(BATCH_LIMIT) {
            let results = future::join_all(round.iter().map(|id| self.get_message(id))).await;
            for (id, result) in round.iter().zip(results) {
                match result {
                    Ok(message) => {
                        messages.insert(message.id.clone(), message);
                    }
                    Err(e) if e.is_auth() => return Err(e),
                    Err(e) => warn!(message_id = %id, error = %e, "failed to fetch message"),
                }
            }
        }
        debug!(requested = message_ids.len(), fetched = messages.len(), "message batch done");
        Ok(messages)
    }

    /// Batch-fetch label detail, same degradation rules as
    /// [`Self::get_threads_by_ids`].
    ///
    /// # Errors
    ///
    /// Returns an error only when the access token is rejected.
    pub async fn get_labels_by_ids(&self, label_ids: &[String]) -> Result<Vec<Label>> {
        let mut labels = Vec::with_capacity(label_ids.len());
        for round in label_ids.chunks(BATCH_LIMIT) {
            let results = future::join_all(round.iter().map(|id| self.get_label(id))).await;
            for (id, result) in round.iter().zip(results) {
                match result {
                    Ok(label) => labels.push(label),
                    Err(e) if e.is_auth() => return Err(e),
                    Err(e) => warn!(label_id = %id, error = %e, "failed to fetch label"),
                }
            }
        }
        Ok(labels)
    }

    /// List every history record strictly after `start_history_id`,
    /// following pagination to exhaustion.
    ///
    /// # Errors
    ///
    /// Returns an error if any page request or decoding fails.
    pub async fn list_history(&self, start_history_id: u64) -> Result<Vec<History>> {
        let mut records = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut query = vec![("startHistoryId", start_history_id.to_string())];
            if let Some(token) = &page_token {
                query.push(("pageToken", token.clone()));
            }
            let page: HistoryPage = self.get_json("/history", &query).await?;
            records.extend(page.history);
            page_token = page.next_page_token;
            if page_token.is_none() {
                break;
            }
        }
        Ok(records)
    }

    /// Register the mailbox push subscription for inbox changes.
    ///
    /// # Errors
    ///
    /// Returns an error if the request or decoding fails.
    pub async fn watch(&self, topic_name: &str) -> Result<WatchResponse> {
        let body = json!({
            "labelIds": ["INBOX"],
            "topicName": topic_name,
            "labelFilterBehavior": "INCLUDE",
        });
        self.post_json("/watch", &body).await
    }

    /// Tear the mailbox push subscription down.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn stop_watch(&self) -> Result<()> {
        let url = format!("{}/stop", self.base_url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(Error::Unauthorized {
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(())
    }

    /// Create a plain-text reply draft on an existing thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the request or decoding fails.
    pub async fn create_draft(
        &self,
        body_text: &str,
        to: &str,
        from: &str,
        thread_id: &str,
    ) -> Result<Draft> {
        let raw = format!(
            "From: {from}\r\nTo: {to}\r\nContent-Type: text/plain; charset=\"utf-8\"\r\n\r\n{body_text}"
        );
        let encoded = URL_SAFE.encode(raw.as_bytes());
        let body = json!({
            "message": {
                "threadId": thread_id,
                "raw": encoded,
            }
        });
        self.post_json("/drafts", &body).await
    }
}
