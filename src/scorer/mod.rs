pub mod alignment;
pub mod listing_score;

pub use alignment::{alignment_score, ALIGNMENT_RUBRIC};
