mod cloud_spa;
mod dispatcher;
mod packed_js;
mod player_config;
mod remote_api;
mod types;

pub use dispatcher::{dispatch, requires_embed_url_for_download};
pub use types::{ResolveCtx, BROWSER_UA};
