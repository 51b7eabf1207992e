use once_cell::sync::Lazy;
use regex::Regex;
use strsim::normalized_levenshtein;

static PARENTHETICAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\([^)]*\)|\[[^\]]*\]").unwrap());
static AFFIXES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(sub\s?indo|batch|nonton\s?anime)\b").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static NON_ALNUM_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").unwrap());

static SEASON_COUR: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bcour\s*(\d+)\b").unwrap());
static SEASON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bseason\s*(\d+)\b").unwrap());
static SEASON_ORDINAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(\d+)(?:st|nd|rd|th)\s*season\b").unwrap());
static SEASON_SHORT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bs(\d+)\b").unwrap());
static SEASON_PART: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bpart\s*(\d+)\b").unwrap());

/// Quotation/exclamation punctuation stripped before comparison. Long titles
/// with different localisation conventions fail Levenshtein by a percent or
/// two otherwise.
const STRIPPED_PUNCTUATION: &[char] = &[
    '\'', '"', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}', '\u{FF02}', '\u{FF07}', '?', '!',
    '\u{FF01}',
];

/// Remove parenthetical segments and localisation affixes, strip a closed
/// punctuation set, collapse whitespace.
pub fn clean_title(raw: &str) -> String {
    let no_parens = PARENTHETICAL.replace_all(raw, " ");
    let no_affixes = AFFIXES.replace_all(&no_parens, " ");
    let stripped: String = no_affixes
        .chars()
        .filter(|c| !STRIPPED_PUNCTUATION.contains(c))
        .collect();
    WHITESPACE.replace_all(stripped.trim(), " ").to_string()
}

/// Rewrite season/cour suffixes into a canonical `part <n>` form, applied
/// symmetrically on both sides of any cross-provider or cross-MAL comparison.
pub fn normalise_season(raw: &str) -> String {
    let s = SEASON_COUR.replace_all(raw, "part $1").to_string();
    let s = SEASON_ORDINAL.replace_all(&s, "part $1").to_string();
    let s = SEASON_WORD.replace_all(&s, "part $1").to_string();
    let s = SEASON_SHORT.replace_all(&s, "part $1").to_string();
    let s = SEASON_PART.replace_all(&s, "part $1").to_string();
    WHITESPACE.replace_all(s.trim(), " ").to_string()
}

/// Normalised Levenshtein similarity, with the identical-empty-string pair
/// defined as a perfect match (strsim returns 1.0 for that case already).
pub fn similarity(a: &str, b: &str) -> f64 {
    normalized_levenshtein(a, b)
}

/// Lower-case, ASCII-fold, collapse non-alphanumeric runs into a single `-`,
/// trim leading/trailing `-` — matches the slug shape providers expose in
/// their own URLs.
pub fn canonical_slug(raw: &str) -> String {
    let lower = raw.to_lowercase();
    let folded: String = lower
        .chars()
        .map(|c| if c.is_ascii() { c } else { ' ' })
        .collect();
    let slug = NON_ALNUM_RUN.replace_all(&folded, "-").to_string();
    slug.trim_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn similarity_is_reflexive_and_symmetric() {
        assert_eq!(similarity("", ""), 1.0);
        assert_eq!(similarity("jigokuraku", "jigokuraku"), 1.0);
        assert_eq!(similarity("abc", "abd"), similarity("abd", "abc"));
        let s = similarity("kimetsu no yaiba", "kimetsu no yaibaa");
        assert!((0.0..=1.0).contains(&s));
    }

    #[test]
    fn normalise_season_maps_all_forms_to_part_n() {
        assert_eq!(normalise_season("Jigokuraku Season 2"), "Jigokuraku part 2");
        assert_eq!(normalise_season("Jigokuraku 2nd Season"), "Jigokuraku part 2");
        assert_eq!(normalise_season("Jigokuraku S2"), "Jigokuraku part 2");
        assert_eq!(normalise_season("Jigokuraku Cour 2"), "Jigokuraku part 2");
        assert_eq!(normalise_season("Jigokuraku Part 2"), "Jigokuraku part 2");
    }

    #[test]
    fn clean_title_strips_affixes_and_punctuation() {
        let raw = "Jigokuraku (Sub Indo) Batch \u{2019}Special\u{2019}!";
        let cleaned = clean_title(raw);
        assert!(!cleaned.to_lowercase().contains("sub indo"));
        assert!(!cleaned.contains('!'));
        assert!(!cleaned.contains('\u{2019}'));
    }

    #[test]
    fn canonical_slug_collapses_punctuation() {
        assert_eq!(canonical_slug("Jigokuraku: Season 2!"), "jigokuraku-season-2");
    }

    #[test]
    fn similarity_handles_empty_strings() {
        assert_eq!(similarity("", ""), 1.0);
        assert_eq!(similarity("abc", ""), 0.0);
    }
}
