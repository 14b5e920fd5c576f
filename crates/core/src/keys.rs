//! Well-known settings keys.
//!
//! The settings table is an open key→JSON store, so staff can add keys the
//! code does not know about. The keys below are the ones the binaries read.
//! Public keys may be served to anonymous storefront visitors; everything
//! else (API keys in particular) stays server-side.

/// [`crate::DeliveryConfig`] as JSON.
pub const DELIVERY_CONFIG: &str = "delivery.config";

/// Geocoding API key (JSON string).
pub const GEOCODING_API_KEY: &str = "geocoding.api_key";

/// Hero banner block for the home page.
pub const CONTENT_HERO: &str = "content.hero";

/// "About us" markdown (JSON string).
pub const CONTENT_ABOUT: &str = "content.about";

/// Current offers list.
pub const CONTENT_OFFERS: &str = "content.offers";

/// Display name override.
pub const BRANDING_NAME: &str = "branding.name";

/// Primary colour override.
pub const BRANDING_PRIMARY_COLOR: &str = "branding.primary_color";

/// Opening hours block.
pub const BRANDING_OPENING_HOURS: &str = "branding.opening_hours";

const PUBLIC_PREFIXES: &[&str] = &["content.", "branding."];

/// Maximum key length accepted by the admin API.
pub const MAX_KEY_LENGTH: usize = 128;

/// Whether `key` may be exposed on the public storefront.
#[must_use]
pub fn is_public(key: &str) -> bool {
    PUBLIC_PREFIXES.iter().any(|prefix| key.starts_with(prefix))
}

/// Whether `key` is well-formed: non-empty, at most [`MAX_KEY_LENGTH`] bytes,
/// and made of lowercase ASCII letters, digits, `.`, `_` and `-`.
#[must_use]
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key.len() <= MAX_KEY_LENGTH
        && key
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || matches!(b, b'.' | b'_' | b'-'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_keys() {
        assert!(is_public(CONTENT_HERO));
        assert!(is_public(BRANDING_NAME));
        assert!(!is_public(GEOCODING_API_KEY));
        assert!(!is_public(DELIVERY_CONFIG));
        assert!(!is_public("contents"));
    }

    #[test]
    fn test_key_validation() {
        assert!(is_valid_key("content.gallery_2"));
        assert!(!is_valid_key(""));
        assert!(!is_valid_key("Content.Hero"));
        assert!(!is_valid_key("content/hero"));
        assert!(!is_valid_key(&"a".repeat(MAX_KEY_LENGTH + 1)));
    }
}
