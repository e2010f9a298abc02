//! Provider abstraction over the remote mailbox.

use std::collections::HashMap;

use mailsift_gmail::{
    Draft, GmailClient, History, Label, Message, Thread, ThreadIdPage, WatchResponse,
};

/// The remote operations the sync engines need.
///
/// [`GmailClient`] is the production implementation; tests drive the
/// engines with a scripted stand-in.
pub trait MailProvider: Send + Sync {
    /// List one page of thread ids.
    fn list_thread_ids(
        &self,
        page_token: Option<&str>,
        page_size: u32,
    ) -> impl Future<Output = mailsift_gmail::Result<ThreadIdPage>> + Send;

    /// Batch-fetch threads with full message detail.
    fn get_threads_by_ids(
        &self,
        thread_ids: &[String],
    ) -> impl Future<Output = mailsift_gmail::Result<HashMap<String, Thread>>> + Send;

    /// Batch-fetch messages with full payload.
    fn get_messages_by_ids(
        &self,
        message_ids: &[String],
    ) -> impl Future<Output = mailsift_gmail::Result<HashMap<String, Message>>> + Send;

    /// Batch-fetch label detail.
    fn get_labels_by_ids(
        &self,
        label_ids: &[String],
    ) -> impl Future<Output = mailsift_gmail::Result<Vec<Label>>> + Send;

    /// List every change record strictly after `start_history_id`.
    fn list_history(
        &self,
        start_history_id: u64,
    ) -> impl Future<Output = mailsift_gmail::Result<Vec<History>>> + Send;

    /// Register the mailbox push subscription.
    fn watch(
        &self,
        topic_name: &str,
    ) -> impl Future<Output = mailsift_gmail::Result<WatchResponse>> + Send;

    /// Create a plain-text reply draft on an existing thread.
    fn create_draft(
        &self,
        body_text: &str,
        to: &str,
        from: &str,
        thread_id: &str,
    ) -> impl Future<Output = mailsift_gmail::Result<Draft>> + Send;
}

impl MailProvider for GmailClient {
    async fn list_thread_ids(
        &self,
        page_token: Option<&str>,
        page_size: u32,
    ) -> mailsift_gmail::Result<ThreadIdPage> {
        GmailClient::list_thread_ids(self, page_token, page_size).await
    }

    async fn get_threads_by_ids(
        &self,
        thread_ids: &[String],
    ) -> mailsift_gmail::Result<HashMap<String, Thread>> {
        GmailClient::get_threads_by_ids(self, thread_ids).await
    }

    async fn get_messages_by_ids(
        &self,
        message_ids: &[String],
    ) -> mailsift_gmail::Result<HashMap<String, Message>> {
        GmailClient::get_messages_by_ids(self, message_ids).await
    }

    async fn get_labels_by_ids(&self, label_ids: &[String]) -> mailsift_gmail::Result<Vec<Label>> {
        GmailClient::get_labels_by_ids(self, label_ids).await
    }

    async fn list_history(&self, start_history_id: u64) -> mailsift_gmail::Result<Vec<History>> {
        GmailClient::list_history(self, start_history_id).await
    }

    async fn watch(&self, topic_name: &str) -> mailsift_gmail::Result<WatchResponse> {
        GmailClient::watch(self, topic_name).await
    }

    async fn create_draft(
        &self,
        body_text: &str,
        to: &str,
        from: &str,
        thread_id: &str,
    ) -> mailsift_gmail::Result<Draft> {
        GmailClient::create_draft(self, body_text, to, from, thread_id).await
    }
}
