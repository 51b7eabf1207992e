mod error;
mod genres;
mod handlers;
mod router;
mod state;

pub use error::{into_response, ApiError};
pub use router::build_router;
pub use state::ApiState;
