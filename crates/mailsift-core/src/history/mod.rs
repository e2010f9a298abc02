//! Change-log bookkeeping and the resume watermark.

mod repository;

pub use repository::HistoryRepository;
