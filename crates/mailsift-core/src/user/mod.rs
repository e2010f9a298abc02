//! Mailbox owners.

mod model;
mod repository;

pub use model::{User, UserId};
pub use repository::UserRepository;
