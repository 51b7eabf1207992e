mod domain;
mod models;
mod provider;
mod repository;

pub use domain::{MalMetadataRow, Mapping, MappingUpsert};
pub use provider::{is_known_provider, PROVIDERS};
pub use repository::{ListingRow, MappingRepository};
