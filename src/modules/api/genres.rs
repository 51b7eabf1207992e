/// A fixed slice of MAL's genre taxonomy, just enough to resolve
/// `?genre=<name|id>` on `/api/v1/search` (§6) without a live genre-list
/// call. Ids match Jikan's public `genres/anime` numbering.
const GENRES: &[(i32, &str)] = &[
    (1, "Action"),
    (2, "Adventure"),
    (4, "Comedy"),
    (7, "Mystery"),
    (8, "Drama"),
    (10, "Fantasy"),
    (14, "Horror"),
    (18, "Mecha"),
    (19, "Music"),
    (22, "Romance"),
    (24, "Sci-Fi"),
    (27, "Shounen"),
    (30, "Sports"),
    (36, "Slice of Life"),
    (37, "Supernatural"),
    (40, "Psychological"),
    (41, "Thriller"),
];

/// Resolves a `genre` query value to `(id, canonical name)`, accepting
/// either form the client might send.
pub fn resolve(input: &str) -> Option<(i32, &'static str)> {
    let trimmed = input.trim();
    if let Ok(id) = trimmed.parse::<i32>() {
        return GENRES.iter().find(|(gid, _)| *gid == id).map(|(id, name)| (*id, *name));
    }
    GENRES
        .iter()
        .find(|(_, name)| name.eq_ignore_ascii_case(trimmed))
        .map(|(id, name)| (*id, *name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_by_name_case_insensitively() {
        assert_eq!(resolve("sci-fi"), Some((24, "Sci-Fi")));
    }

    #[test]
    fn resolves_by_numeric_id() {
        assert_eq!(resolve("30"), Some((30, "Sports")));
    }

    #[test]
    fn unknown_genre_resolves_to_none() {
        assert_eq!(resolve("not-a-genre"), None);
    }
}
