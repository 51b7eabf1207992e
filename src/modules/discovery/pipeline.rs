use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::modules::discovery::coalesce::CoalesceLock;
use crate::modules::hash::{hamming, phash};
use crate::modules::mal::{MalCandidate, MalClient, MetadataGate};
use crate::modules::mapping::{is_known_provider, MalMetadataRow, Mapping, MappingRepository, MappingUpsert, PROVIDERS};
use crate::modules::streaming::{self, ScrapedDetail, Site};
use crate::modules::title::{canonical_slug, clean_title, normalise_season, similarity};
use crate::shared::errors::{AppError, AppResult};

#[derive(Debug, Clone, Copy)]
pub struct DiscoveryConfig {
    pub phash_threshold: u32,
    pub title_similarity_threshold: f64,
    pub episode_tolerance: i32,
}

/// Mapping resolver (C6): discovers and caches the cross-provider identity
/// record for one anime, behind a request-coalescing lock.
pub struct DiscoveryService {
    mapping_repo: Arc<MappingRepository>,
    mal: Arc<MalClient>,
    coalesce: CoalesceLock,
    config: DiscoveryConfig,
}

impl DiscoveryService {
    pub fn new(mapping_repo: Arc<MappingRepository>, mal: Arc<MalClient>, config: DiscoveryConfig) -> Self {
        Self {
            mapping_repo,
            mal,
            coalesce: CoalesceLock::new(),
            config,
        }
    }

    /// Returns the mapping plus whether it came straight from the store
    /// (`cached`) rather than a fresh discovery (§6, §9 S1/S2).
    pub async fn resolve_by_slug(&self, provider: &str, slug: &str) -> AppResult<(Mapping, bool)> {
        if !is_known_provider(provider) {
            return Err(AppError::InvalidInput(format!("unknown provider: {}", provider)));
        }
        if let Some(existing) = self.mapping_repo.find_by_slug(provider, slug).await? {
            return Ok((existing, true));
        }

        let key = format!("{}:{}", provider, slug);
        let mapping_repo = Arc::clone(&self.mapping_repo);
        let mal = Arc::clone(&self.mal);
        let config = self.config;
        let provider = provider.to_string();
        let slug = slug.to_string();

        let mapping = self
            .coalesce
            .run(key, move || {
                Box::pin(async move {
                    discover_by_slug(mapping_repo, mal, config, provider, slug)
                        .await
                        .map_err(Arc::new)
                })
            })
            .await
            .map_err(flatten)?;
        Ok((mapping, false))
    }

    pub async fn resolve_by_mal_id(&self, mal_id: i32) -> AppResult<(Mapping, bool)> {
        if let Some(existing) = self.mapping_repo.find_by_mal_id(mal_id).await? {
            return Ok((existing, true));
        }

        let key = format!("mal:{}", mal_id);
        let mapping_repo = Arc::clone(&self.mapping_repo);
        let mal = Arc::clone(&self.mal);
        let config = self.config;

        let mapping = self
            .coalesce
            .run(key, move || {
                Box::pin(async move {
                    discover_by_mal_id(mapping_repo, mal, config, mal_id)
                        .await
                        .map_err(Arc::new)
                })
            })
            .await
            .map_err(flatten)?;
        Ok((mapping, false))
    }
}

fn flatten(e: Arc<AppError>) -> AppError {
    AppError::InternalError(e.to_string())
}

/// Discovery pipeline by slug (§4.6, steps 1-6).
async fn discover_by_slug(
    mapping_repo: Arc<MappingRepository>,
    mal: Arc<MalClient>,
    config: DiscoveryConfig,
    provider: String,
    slug: String,
) -> AppResult<Mapping> {
    let site = Site::by_name(&provider).ok_or_else(|| AppError::InvalidInput(format!("unknown provider: {}", provider)))?;

    let detail: ScrapedDetail = streaming::detail(site, &slug)
        .await
        .ok_or_else(|| AppError::NotFound(format!("no detail page for {}/{}", provider, slug)))?;

    let source_phash = match &detail.cover_url {
        Some(cover) if site.cover_host_is_valid(cover) => phash(cover).await,
        _ => None,
    };

    let mut accepted: Option<MalCandidate> = None;

    if let Some(hash) = &source_phash {
        if let Ok(Some(existing)) = mapping_repo.find_nearest_phash(hash, config.phash_threshold).await {
            // A pHash hit is accepted unconditionally (§4.6 step 3): the
            // Jikan refresh only enriches the candidate, it never gates
            // acceptance, so a transient Jikan failure falls back to the
            // store row instead of discarding the match.
            accepted = Some(mal.get_by_id(existing.mal_id).await.unwrap_or(MalCandidate {
                mal_id: existing.mal_id,
                title: existing.title_main.clone(),
                title_english: None,
                title_japanese: None,
                year: existing.release_year,
                total_episodes: existing.total_episodes,
                image_url: None,
            }));
        }
    }

    if accepted.is_none() {
        let clean = clean_title(&detail.title);
        if let Some(candidate) = mal.search_by_title(&clean, detail.release_year).await {
            let gate = MetadataGate {
                year: detail.release_year,
                total_episodes: detail.total_episodes,
            };
            let title_ok = candidate
                .title_variants()
                .into_iter()
                .any(|v| similarity(&normalise_season(&clean), &normalise_season(v)) >= config.title_similarity_threshold);
            let meta_ok = MalClient::validate_metadata(&candidate, gate, config.episode_tolerance);

            // §4.6.2: a known scraped year requires both gates; an unknown
            // year lets either gate carry acceptance.
            let accept = if detail.release_year.is_some() {
                title_ok && meta_ok
            } else {
                title_ok || meta_ok
            };

            if accept {
                accepted = Some(candidate);
            }
        }
    }

    let candidate = accepted.ok_or_else(|| AppError::NotFound(format!("no MAL match for {}/{}", provider, slug)))?;

    let mut acquired_phash = source_phash;
    let mut upsert = MappingUpsert::new(candidate.mal_id).with_slug(&provider, slug.clone());
    upsert.title_main = Some(candidate.title.clone());
    upsert.release_year = candidate.year;
    upsert.total_episodes = candidate.total_episodes;

    for other in PROVIDERS.iter().filter(|p| **p != provider) {
        if let Some(found) = discover_on(other, &candidate, acquired_phash.as_deref(), config).await {
            upsert = upsert.with_slug(other, found.slug);
            if acquired_phash.is_none() {
                acquired_phash = found.phash;
            }
        }
    }
    upsert.phash_v1 = acquired_phash;

    let mapping = mapping_repo.upsert(upsert).await?;
    cache_mal_metadata(&mapping_repo, &mal, candidate.mal_id).await;

    Ok(mapping)
}

/// Discovery pipeline by MAL id (§4.6).
async fn discover_by_mal_id(
    mapping_repo: Arc<MappingRepository>,
    mal: Arc<MalClient>,
    config: DiscoveryConfig,
    mal_id: i32,
) -> AppResult<Mapping> {
    let full = mal
        .get_full_by_id(mal_id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("MAL id {} not found", mal_id)))?;
    let candidate = full.as_candidate();

    let mut upsert = MappingUpsert::new(mal_id);
    upsert.title_main = Some(candidate.title.clone());
    upsert.release_year = candidate.year;
    upsert.total_episodes = candidate.total_episodes;

    let mut acquired_phash: Option<String> = None;
    for provider in PROVIDERS {
        if let Some(found) = discover_on(provider, &candidate, acquired_phash.as_deref(), config).await {
            upsert = upsert.with_slug(provider, found.slug);
            if acquired_phash.is_none() {
                acquired_phash = found.phash;
            }
        }
    }
    upsert.phash_v1 = acquired_phash;

    // Still upsert a partial mapping (no provider slug found) so the MAL
    // metadata is cached, per §4.6.
    let mapping = mapping_repo.upsert(upsert).await?;
    mapping_repo.upsert_mal_metadata(full_to_row(&full)).await.ok();

    Ok(mapping)
}

async fn cache_mal_metadata(mapping_repo: &MappingRepository, mal: &MalClient, mal_id: i32) {
    if let Some(full) = mal.get_full_by_id(mal_id).await {
        let _ = mapping_repo.upsert_mal_metadata(full_to_row(&full)).await;
    }
}

pub fn full_to_row(full: &crate::modules::mal::MalFull) -> MalMetadataRow {
    MalMetadataRow {
        mal_id: full.mal_id,
        title: full.title.clone(),
        title_english: full.title_english.clone(),
        title_japanese: full.title_japanese.clone(),
        synopsis: full.synopsis.clone(),
        anime_type: full.anime_type.clone(),
        total_episodes: full.total_episodes,
        status: full.status.clone(),
        duration: full.duration.clone(),
        score: full.score,
        rank: full.rank,
        year: full.year,
        season: full.season.clone(),
        genres: full.genres.clone(),
        studios: full.studios.clone(),
        image_url: full.image_url.clone(),
        large_image_url: full.large_image_url.clone(),
    }
}

struct DiscoveredSlug {
    slug: String,
    phash: Option<String>,
}

/// Cross-provider search (§4.6.1): `discover_on(target, jikan, known_phash)`.
async fn discover_on(
    provider: &str,
    candidate: &MalCandidate,
    known_phash: Option<&str>,
    config: DiscoveryConfig,
) -> Option<DiscoveredSlug> {
    let site = Site::by_name(provider)?;

    for query in build_search_queries(candidate) {
        let cards = streaming::search(site, &query).await;
        let skip_prefilter = site.skips_title_prefilter(cards.len());

        for card in &cards {
            let cover = match &card.cover_url {
                Some(c) if site.cover_host_is_valid(c) => c,
                _ => continue,
            };

            if !skip_prefilter {
                let title_ok = candidate.title_variants().into_iter().any(|v| {
                    similarity(&normalise_season(v), &normalise_season(&card.card_title)) >= config.title_similarity_threshold
                });
                if !title_ok {
                    continue;
                }
            }

            // Hash path: accept immediately on a close visual match.
            if let Some(known) = known_phash {
                if let Some(card_hash) = phash(cover).await {
                    let distance = hamming(known, &card_hash);
                    if distance >= 0 && (distance as u32) < 5 {
                        return Some(DiscoveredSlug { slug: card.slug.clone(), phash: Some(card_hash) });
                    }
                }
            }

            // Metadata path.
            if let Some(detail) = streaming::detail(site, &card.slug).await {
                if !detail_cover_is_valid(site, &detail) {
                    continue;
                }
                if detail.release_year.is_none() && detail.total_episodes.is_none() {
                    continue;
                }
                let title_ok = candidate
                    .title_variants()
                    .into_iter()
                    .any(|v| similarity(&normalise_season(v), &normalise_season(&detail.title)) >= config.title_similarity_threshold)
                    || prefix_related(candidate, &detail.title);
                if !title_ok {
                    continue;
                }
                if !validate_against_mal(&detail, candidate, config.episode_tolerance) {
                    continue;
                }

                let card_hash = match &detail.cover_url {
                    Some(c) if site.cover_host_is_valid(c) => phash(c).await,
                    _ => None,
                };
                return Some(DiscoveredSlug { slug: card.slug.clone(), phash: card_hash });
            }
        }
    }

    // Direct-slug last resort (§4.6.1 step 5).
    let has_season_marker = season_number(&candidate.title).is_some();
    for slug in derive_direct_slugs(candidate) {
        let detail = match streaming::detail(site, &slug).await {
            Some(d) => d,
            None => continue,
        };
        if !detail_cover_is_valid(site, &detail) {
            continue;
        }

        let title_ok = candidate
            .title_variants()
            .iter()
            .any(|v| similarity(&normalise_season(v), &normalise_season(&detail.title)) >= config.title_similarity_threshold);
        if !title_ok {
            continue;
        }

        let metadata_absent = detail.release_year.is_none() && detail.total_episodes.is_none();
        let accept = if metadata_absent {
            !has_season_marker
        } else {
            validate_against_mal(&detail, candidate, config.episode_tolerance)
        };

        if accept {
            let card_hash = match &detail.cover_url {
                Some(c) if site.cover_host_is_valid(c) => phash(c).await,
                _ => None,
            };
            return Some(DiscoveredSlug { slug, phash: card_hash });
        }
    }

    None
}

fn detail_cover_is_valid(site: Site, detail: &ScrapedDetail) -> bool {
    match &detail.cover_url {
        Some(c) => site.cover_host_is_valid(c),
        None => false,
    }
}

fn validate_against_mal(detail: &ScrapedDetail, mal: &MalCandidate, episode_tolerance: i32) -> bool {
    let pseudo = MalCandidate {
        mal_id: 0,
        title: detail.title.clone(),
        title_english: None,
        title_japanese: None,
        year: detail.release_year,
        total_episodes: detail.total_episodes,
        image_url: None,
    };
    let gate = MetadataGate {
        year: mal.year,
        total_episodes: mal.total_episodes,
    };
    MalClient::validate_metadata(&pseudo, gate, episode_tolerance)
}

fn prefix_related(candidate: &MalCandidate, other_title: &str) -> bool {
    let other_slug = canonical_slug(&normalise_season(other_title));
    if other_slug.is_empty() {
        return false;
    }
    candidate.title_variants().into_iter().any(|v| {
        let v_slug = canonical_slug(&normalise_season(v));
        !v_slug.is_empty() && (v_slug.starts_with(&other_slug) || other_slug.starts_with(&v_slug))
    })
}

/// Ordered, deduped query list (§4.6.1 step 1 preamble): full title,
/// pre-colon prefix, season-stripped base, first-three-words prefix.
fn build_search_queries(candidate: &MalCandidate) -> Vec<String> {
    let mut queries = Vec::new();
    for title in candidate.title_variants() {
        push_unique(&mut queries, title.to_string());

        if let Some(idx) = title.find(':') {
            push_unique(&mut queries, title[..idx].trim().to_string());
        }

        let base = strip_season_markers(title);
        push_unique(&mut queries, base);

        let prefix: String = title.split_whitespace().take(3).collect::<Vec<_>>().join(" ");
        if prefix.chars().count() >= 8 {
            push_unique(&mut queries, prefix);
        }
    }
    queries
}

static PART_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\s*\bpart\s*\d+\b").unwrap());
static PART_NUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bpart\s*(\d+)\b").unwrap());

fn strip_season_markers(raw: &str) -> String {
    let normalised = normalise_season(raw);
    PART_SUFFIX.replace_all(&normalised, "").trim().to_string()
}

fn season_number(raw: &str) -> Option<i32> {
    let normalised = normalise_season(raw);
    PART_NUM.captures(&normalised).and_then(|c| c.get(1)).and_then(|m| m.as_str().parse().ok())
}

/// Direct-slug derivation (§4.6.1 step 5): full/pre-colon/base canonical
/// slugs, light-novel separator cuts, season-suffix variants, year suffixes.
fn derive_direct_slugs(candidate: &MalCandidate) -> Vec<String> {
    let mut slugs = Vec::new();
    let title = &candidate.title;

    let full_slug = canonical_slug(title);
    push_unique(&mut slugs, full_slug.clone());

    if let Some(idx) = title.find(':') {
        push_unique(&mut slugs, canonical_slug(title[..idx].trim()));
    }

    let base_title = strip_season_markers(title);
    let base_slug = canonical_slug(&base_title);
    push_unique(&mut slugs, base_slug.clone());

    let lower = title.to_lowercase();
    for sep in [" to ", " node ", " ga ", " de ", " ni ", " wo "] {
        if let Some(idx) = lower.find(sep) {
            push_unique(&mut slugs, canonical_slug(title[..idx].trim()));
        }
    }

    if let Some(n) = season_number(title) {
        if n >= 2 {
            push_unique(&mut slugs, format!("{}-season-{}", base_slug, n));
            push_unique(&mut slugs, format!("{}-{}nd-season", base_slug, n));
            push_unique(&mut slugs, format!("{}-part-{}", base_slug, n));
            push_unique(&mut slugs, format!("{}-s{}", base_slug, n));
        }
    }

    if let Some(year) = candidate.year {
        push_unique(&mut slugs, format!("{}-{}", base_slug, year));
        push_unique(&mut slugs, format!("{}-{}", full_slug, year));
    }

    slugs
}

fn push_unique(list: &mut Vec<String>, item: String) {
    if !item.is_empty() && !list.contains(&item) {
        list.push(item);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(title: &str, year: Option<i32>) -> MalCandidate {
        MalCandidate {
            mal_id: 1,
            title: title.to_string(),
            title_english: None,
            title_japanese: None,
            year,
            total_episodes: None,
            image_url: None,
        }
    }

    #[test]
    fn build_search_queries_includes_full_and_base_title() {
        let c = candidate("Jigokuraku Season 2", None);
        let queries = build_search_queries(&c);
        assert!(queries.contains(&"Jigokuraku Season 2".to_string()));
        assert!(queries.contains(&"Jigokuraku".to_string()));
    }

    #[test]
    fn derive_direct_slugs_includes_season_suffix_variants() {
        let c = candidate("Jigokuraku Season 2", Some(2023));
        let slugs = derive_direct_slugs(&c);
        assert!(slugs.contains(&"jigokuraku-season-2".to_string()));
        assert!(slugs.contains(&"jigokuraku-2nd-season".to_string()));
        assert!(slugs.iter().any(|s| s.ends_with("-2023")));
    }

    #[test]
    fn season_number_reads_any_marker_form() {
        assert_eq!(season_number("Jigokuraku S2"), Some(2));
        assert_eq!(season_number("Jigokuraku"), None);
    }
}
