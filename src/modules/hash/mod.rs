mod phash;

pub use phash::{hamming, phash, phash_bytes};
