/// The closed set of providers this crate knows about. Each gets one
/// nullable `slug_<provider>` column on the `mappings` table (§3).
pub const PROVIDERS: &[&str] = &["animasu", "samehadaku", "otakudesu"];

pub fn is_known_provider(provider: &str) -> bool {
    PROVIDERS.iter().any(|p| p.eq_ignore_ascii_case(provider))
}
