//! Mailbox threads.

mod model;
mod repository;

pub use model::MailThread;
pub use repository::ThreadRepository;
