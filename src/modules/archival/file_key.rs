use sha2::{Digest, Sha256};

/// `SHA-256(salt || ':' || mal_id || ':' || episode || ':' || provider || ':' || resolution)[:32]`
/// (§3). Deterministic and stable across processes given the same salt.
pub fn file_key(
    salt: &str,
    mal_id: i32,
    episode: i32,
    provider: &str,
    resolution: Option<&str>,
) -> String {
    let resolution = resolution.unwrap_or("");
    let input = format!("{}:{}:{}:{}:{}", salt, mal_id, episode, provider, resolution);

    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let digest = hasher.finalize();

    hex::encode(digest)[..32].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_key_is_deterministic() {
        let a = file_key("salt", 1, 2, "animasu", Some("720p"));
        let b = file_key("salt", 1, 2, "animasu", Some("720p"));
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn file_key_differs_on_any_field() {
        let base = file_key("salt", 1, 2, "animasu", Some("720p"));
        assert_ne!(base, file_key("salt", 2, 2, "animasu", Some("720p")));
        assert_ne!(base, file_key("salt", 1, 3, "animasu", Some("720p")));
        assert_ne!(base, file_key("salt", 1, 2, "samehadaku", Some("720p")));
        assert_ne!(base, file_key("salt", 1, 2, "animasu", Some("480p")));
        assert_ne!(base, file_key("salt", 1, 2, "animasu", None));
        assert_ne!(base, file_key("other", 1, 2, "animasu", Some("720p")));
    }
}
