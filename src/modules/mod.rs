pub mod api;
pub mod archival;
pub mod discovery;
pub mod hash;
pub mod mal;
pub mod mapping;
pub mod proxy;
pub mod resolvers;
pub mod streaming;
pub mod title;
pub mod worker_http;
