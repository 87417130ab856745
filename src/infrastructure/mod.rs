pub mod api_client;
pub mod core;
pub mod mock;
pub mod observability;

pub use api_client::HttpRaceDataClient;
pub use mock::InMemoryRaceDataClient;
