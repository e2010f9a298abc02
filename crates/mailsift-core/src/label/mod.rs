//! Label registry.

mod model;
mod repository;

pub use model::StoredLabel;
pub use repository::LabelRepository;
