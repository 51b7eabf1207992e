use std::sync::Arc;

use crate::modules::discovery::DiscoveryService;
use crate::modules::mal::MalClient;
use crate::modules::mapping::MappingRepository;
use crate::modules::streaming::StreamingService;

/// Everything the HTTP handlers need, constructed once at startup and
/// shared via axum's `State` extractor.
#[derive(Clone)]
pub struct ApiState {
    pub mapping_repo: Arc<MappingRepository>,
    pub mal: Arc<MalClient>,
    pub discovery: Arc<DiscoveryService>,
    pub streaming: Arc<StreamingService>,
    pub archival_salt: String,
}
