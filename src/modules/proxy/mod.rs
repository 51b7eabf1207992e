mod handlers;
mod m3u8;
mod router;
mod types;

pub use m3u8::looks_like_hls;
pub use router::build_router;
pub use types::ProxyState;
