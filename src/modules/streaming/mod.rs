mod cache;
mod enrichment;
mod sites;
mod types;

pub use enrichment::StreamingService;
pub use sites::{detail, episode_list, episode_servers, search, Site};
pub use types::{EpisodeEntry, ScrapedDetail, SearchCard, StreamingServer};
