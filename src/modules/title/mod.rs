mod normalizer;

pub use normalizer::{canonical_slug, clean_title, normalise_season, similarity};
