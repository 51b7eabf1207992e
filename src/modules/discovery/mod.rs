mod coalesce;
mod pipeline;

pub use pipeline::{full_to_row as mal_metadata_from_full, DiscoveryConfig, DiscoveryService};
