pub mod get_by_ruc;
pub mod search;

pub use get_by_ruc::{GetRucError, GetRucQuery};
pub use search::{MatchType, SearchError, SearchQuery, SearchResponse};
