pub mod queries;
pub mod routes;
pub mod types;

pub use routes::lookup_routes;
pub use types::LookupRecord;
