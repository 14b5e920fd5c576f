//! Storefront branding variants.

use serde::{Deserialize, Serialize};

/// The restaurant flavour a deployment is branded as.
///
/// The same binaries serve every brand; the brand only picks display
/// defaults that the `branding.*` settings can override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Brand {
    #[default]
    Pizzeria,
    Kebab,
}

impl Brand {
    /// Default display name used when `branding.name` is not set.
    #[must_use]
    pub const fn default_name(self) -> &'static str {
        match self {
            Self::Pizzeria => "Pizzeria",
            Self::Kebab => "Kebab House",
        }
    }

    /// Default primary colour (CSS hex).
    #[must_use]
    pub const fn default_primary_color(self) -> &'static str {
        match self {
            Self::Pizzeria => "#c0392b",
            Self::Kebab => "#e67e22",
        }
    }
}

impl std::str::FromStr for Brand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pizzeria" | "pizza" => Ok(Self::Pizzeria),
            "kebab" => Ok(Self::Kebab),
            other => Err(format!("unknown brand: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_brand_parse() {
        assert_eq!("Pizzeria".parse::<Brand>(), Ok(Brand::Pizzeria));
        assert_eq!(" kebab ".parse::<Brand>(), Ok(Brand::Kebab));
        assert!("sushi".parse::<Brand>().is_err());
    }
}
