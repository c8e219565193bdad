//! Keyword slugs for catalog tags

use crate::domain::{GeoPublishError, Result};
use fancy_regex::Regex as FancyRegex;
use regex::Regex;

/// Turns theme keywords into catalog tag slugs
///
/// Whitespace runs and camel case boundaries become dashes, the result is
/// lower-cased and repeated or edge dashes are removed:
/// `"LandUse"` becomes `land-use`, `"Building Footprints"` becomes
/// `building-footprints`, `"GIS"` stays `gis`.
#[derive(Debug, Clone)]
pub struct Slugifier {
    whitespace: Regex,
    camel_boundary: FancyRegex,
    dashes: Regex,
}

impl Slugifier {
    pub fn new() -> Result<Self> {
        let invalid = |e: String| GeoPublishError::Configuration(format!("Invalid slug pattern: {e}"));

        Ok(Self {
            whitespace: Regex::new(r"\s+").map_err(|e| invalid(e.to_string()))?,
            // An upper-case letter after a lower-case one, or one starting a
            // capitalized word (not inside an acronym, not at the end)
            camel_boundary: FancyRegex::new(r"(((?<=[a-z])[A-Z])|([A-Z](?![A-Z]|$)))")
                .map_err(|e| invalid(e.to_string()))?,
            dashes: Regex::new(r"-+").map_err(|e| invalid(e.to_string()))?,
        })
    }

    pub fn slugify(&self, input: &str) -> String {
        let slug = self.whitespace.replace_all(input.trim(), "-");
        let slug = self.camel_boundary.replace_all(&slug, "-$1").to_lowercase();
        self.dashes
            .replace_all(&slug, "-")
            .trim_matches('-')
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("Building Footprints", "building-footprints" ; "words")]
    #[test_case("LandUse", "land-use" ; "pascal case")]
    #[test_case("parcelBoundaries", "parcel-boundaries" ; "camel case")]
    #[test_case("Transportation", "transportation" ; "single word")]
    #[test_case("GIS", "gis" ; "acronym")]
    #[test_case("  Open   Space ", "open-space" ; "padded whitespace")]
    #[test_case("Water - Rivers", "water-rivers" ; "existing dashes")]
    fn test_slugify(input: &str, expected: &str) {
        let slugifier = Slugifier::new().unwrap();
        assert_eq!(slugifier.slugify(input), expected);
    }
}
