use url::Url;

use crate::shared::errors::AppError;

pub struct Validator;

impl Validator {
    pub fn validate_mal_id(mal_id: i32) -> Result<(), AppError> {
        if mal_id <= 0 {
            return Err(AppError::ValidationError(
                "mal_id must be a positive integer".to_string(),
            ));
        }
        Ok(())
    }

    pub fn validate_episode(episode: i32) -> Result<(), AppError> {
        if episode <= 0 {
            return Err(AppError::ValidationError(
                "episode must be a positive integer".to_string(),
            ));
        }
        Ok(())
    }

    pub fn validate_slug(slug: &str) -> Result<(), AppError> {
        if slug.is_empty() {
            return Err(AppError::ValidationError("slug cannot be empty".to_string()));
        }
        if slug.len() > 255 {
            return Err(AppError::ValidationError(
                "slug too long (max 255 characters)".to_string(),
            ));
        }
        Ok(())
    }

    pub fn validate_provider(provider: &str, known: &[&str]) -> Result<(), AppError> {
        if !known.iter().any(|p| p.eq_ignore_ascii_case(provider)) {
            return Err(AppError::ValidationError(format!(
                "unknown provider: {}",
                provider
            )));
        }
        Ok(())
    }

    pub fn validate_genre(genre: &str) -> Result<(), AppError> {
        if genre.trim().is_empty() {
            return Err(AppError::ValidationError("genre cannot be empty".to_string()));
        }
        Ok(())
    }

    pub fn validate_pagination(offset: i64, limit: i64) -> Result<(), AppError> {
        if offset < 0 {
            return Err(AppError::ValidationError(
                "offset cannot be negative".to_string(),
            ));
        }
        if limit <= 0 {
            return Err(AppError::ValidationError("limit must be positive".to_string()));
        }
        if limit > 100 {
            return Err(AppError::ValidationError(
                "limit cannot exceed 100".to_string(),
            ));
        }
        Ok(())
    }

    /// Validate that `raw` parses as an absolute URL, per the proxy's `?url=` contract.
    pub fn validate_absolute_url(raw: &str) -> Result<Url, AppError> {
        let url = Url::parse(raw)
            .map_err(|e| AppError::InvalidInput(format!("invalid url: {}", e)))?;
        if url.cannot_be_a_base() {
            return Err(AppError::InvalidInput("url must be absolute".to_string()));
        }
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(AppError::InvalidInput(format!(
                "unsupported url scheme: {}",
                other
            ))),
        }
    }

    pub fn validate_phash(hash: &str) -> Result<(), AppError> {
        if hash.len() != 64 || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(AppError::ValidationError(
                "phash must be 64 lowercase hex characters".to_string(),
            ));
        }
        Ok(())
    }
}
