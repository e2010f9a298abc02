//! `mailsift` - Gmail mailbox synchronization CLI
//!
//! Thin wrapper around the core engines. Configuration comes from the
//! environment; every subcommand opens the store, resolves the user and
//! delegates.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

use anyhow::{Context, bail};
use mailsift_assist::OpenAiAssistant;
use mailsift_core::{
    HistoryRepository, Store, User, UserRepository, draft_reply_for_thread,
    handle_mailbox_change, reconcile, refresh_subscriptions, register_watch, sync_mailbox,
};
use mailsift_gmail::GmailClient;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const USAGE: &str = "\
usage: mailsift <command> [args]

commands:
  sync <email>                 full mailbox load
  reconcile <email> [since]    replay the change log from the watermark
  watch <email>                register the mailbox push subscription
  refresh                      re-register the subscription for all active users
  notify <payload>             handle one base64 push notification payload
  draft <email> <thread-id>    draft a reply to a synced thread

environment:
  MAILSIFT_DB          sqlite database path (default: mailsift.db)
  GMAIL_ACCESS_TOKEN   OAuth access token for the mailbox
  GOOGLE_PROJECT_ID    project for the push topic (watch, refresh)
  PUBSUB_TOPIC         topic name for the push subscription (watch, refresh)
  OPENAI_API_KEY       assistant credentials (draft)";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mailsift=info,mailsift_core=info,mailsift_gmail=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first().map(String::as_str) else {
        println!("{USAGE}");
        return Ok(());
    };

    let store = open_store().await?;
    match command {
        "sync" => {
            let user = resolve_user(&store, arg(&args, 1, "email")?).await?;
            let client = gmail_client()?;
            let report = sync_mailbox(&store, &client, user.pk).await?;
            info!(
                threads = report.threads,
                new_messages = report.new_messages,
                labels = report.labels,
                "sync finished"
            );
        }
        "reconcile" => {
            let user = resolve_user(&store, arg(&args, 1, "email")?).await?;
            let since = match args.get(2) {
                Some(raw) => raw.parse().context("since must be a history position")?,
                None => HistoryRepository::new(&store)
                    .latest_history_id(user.pk)
                    .await?
                    .context("no watermark stored; run sync first or pass a start position")?,
            };
            let client = gmail_client()?;
            let report = reconcile(&store, &client, user.pk, since).await?;
            info!(
                events = report.events,
                messages_added = report.messages_added,
                messages_deleted = report.messages_deleted,
                labels_added = report.labels_added,
                labels_removed = report.labels_removed,
                "reconcile finished"
            );
        }
        "watch" => {
            let user = resolve_user(&store, arg(&args, 1, "email")?).await?;
            let client = gmail_client()?;
            let expiration = register_watch(&store, &client, user.pk, &topic_name()?).await?;
            info!(%expiration, "watch registered");
        }
        "refresh" => {
            let client = gmail_client()?;
            let refreshed = refresh_subscriptions(&store, &client, &topic_name()?).await?;
            info!(refreshed, "subscriptions refreshed");
        }
        "notify" => {
            let payload = arg(&args, 1, "payload")?;
            let client = gmail_client()?;
            let report = handle_mailbox_change(&store, &client, payload).await?;
            info!(
                events = report.events,
                messages_added = report.messages_added,
                "notification handled"
            );
        }
        "draft" => {
            let user = resolve_user(&store, arg(&args, 1, "email")?).await?;
            let thread_id = arg(&args, 2, "thread-id")?;
            let client = gmail_client()?;
            let assistant = OpenAiAssistant::new(env("OPENAI_API_KEY")?);
            match draft_reply_for_thread(&store, &client, &assistant, &user, thread_id).await? {
                Some(draft) => info!(draft_id = %draft.draft_id, "draft created"),
                None => info!(thread_id, "drafting skipped"),
            }
        }
        other => {
            println!("{USAGE}");
            bail!("unknown command: {other}");
        }
    }

    Ok(())
}

async fn open_store() -> anyhow::Result<Store> {
    let path = std::env::var("MAILSIFT_DB").unwrap_or_else(|_| "mailsift.db".to_string());
    Ok(Store::new(&path).await?)
}

fn gmail_client() -> anyhow::Result<GmailClient> {
    Ok(GmailClient::new(env("GMAIL_ACCESS_TOKEN")?))
}

fn env(name: &str) -> anyhow::Result<String> {
    std::env::var(name).with_context(|| format!("{name} must be set"))
}

fn topic_name() -> anyhow::Result<String> {
    let project = env("GOOGLE_PROJECT_ID")?;
    let topic = env("PUBSUB_TOPIC")?;
    Ok(format!("projects/{project}/topics/{topic}"))
}

fn arg<'a>(args: &'a [String], index: usize, name: &str) -> anyhow::Result<&'a str> {
    args.get(index)
        .map(String::as_str)
        .with_context(|| format!("missing argument: {name}\n\n{USAGE}"))
}

/// Look the mailbox owner up, registering them on first contact.
async fn resolve_user(store: &Store, email: &str) -> anyhow::Result<User> {
    let users = UserRepository::new(store);
    if let Some(user) = users.get_by_email(email).await? {
        return Ok(user);
    }
    info!(email, "registering new mailbox owner");
    Ok(users.create(email).await?)
}
