pub mod metrics;
pub mod report;
pub mod service;

pub use service::{parse_zip, PricingAnalysis, PricingService};
