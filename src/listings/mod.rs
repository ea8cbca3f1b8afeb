pub mod analytics;
pub mod recommend;
pub mod search;

pub use analytics::{summarize, MarketOverview};
pub use recommend::{recommend, Preferences};
pub use search::{location_key, ListingFilters, ListingService};
