//! Breakdown-combination validation for insights queries.
//!
//! Pure rule-checker over the fixed catalog of report dimensions Meta
//! accepts. All rules are evaluated independently and every violation is
//! reported; the caller receives the full list, never just the first.

use serde::Serialize;
use utoipa::ToSchema;

/// All dimension names this service accepts for `breakdowns`.
pub const VALID_BREAKDOWNS: [&str; 12] = [
    "age",
    "gender",
    "country",
    "region",
    "publisher_platform",
    "platform_position",
    "device_platform",
    "image_asset",
    "video_asset",
    "title_asset",
    "body_asset",
    "product_id",
];

const MAX_BREAKDOWNS: usize = 3;

const CREATIVE_BREAKDOWNS: [&str; 4] = ["image_asset", "video_asset", "title_asset", "body_asset"];
const DEMOGRAPHIC_BREAKDOWNS: [&str; 2] = ["age", "gender"];
const GEO_BREAKDOWNS: [&str; 2] = ["country", "region"];

/// Outcome of validating a breakdown combination.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BreakdownValidation {
    pub valid: bool,
    /// Every violated rule, in evaluation order.
    pub errors: Vec<String>,
}

/// Validate a requested breakdown combination.
///
/// Creative-asset dimensions cannot be mixed with demographic (age, gender)
/// or geographic (country, region) ones; creative + platform/device/product
/// and demographic + geographic combinations are fine.
pub fn validate_breakdowns(breakdowns: &[String]) -> BreakdownValidation {
    let mut errors = Vec::new();

    if breakdowns.len() > MAX_BREAKDOWNS {
        errors.push(format!("Maximum {} breakdowns allowed", MAX_BREAKDOWNS));
    }

    for b in breakdowns {
        if !VALID_BREAKDOWNS.contains(&b.as_str()) {
            errors.push(format!("Unknown breakdown: \"{}\"", b));
        }
    }

    let has = |catalog: &[&str]| breakdowns.iter().any(|b| catalog.contains(&b.as_str()));
    let has_creative = has(&CREATIVE_BREAKDOWNS);

    if has_creative && has(&DEMOGRAPHIC_BREAKDOWNS) {
        errors.push(
            "Creative asset breakdowns (image_asset, video_asset, title_asset, body_asset) \
             cannot be combined with demographic breakdowns (age, gender)"
                .to_string(),
        );
    }

    if has_creative && has(&GEO_BREAKDOWNS) {
        errors.push(
            "Creative asset breakdowns cannot be combined with geographic breakdowns \
             (country, region)"
                .to_string(),
        );
    }

    BreakdownValidation {
        valid: errors.is_empty(),
        errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bd(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_empty_is_valid() {
        let result = validate_breakdowns(&[]);
        assert!(result.valid);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_max_three_breakdowns() {
        let result = validate_breakdowns(&bd(&["age", "gender", "country", "region"]));
        assert!(!result.valid);
        assert!(result.errors.iter().any(|e| e.contains("Maximum 3")));
    }

    #[test]
    fn test_unknown_breakdown_named() {
        let result = validate_breakdowns(&bd(&["not_a_field"]));
        assert!(!result.valid);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("not_a_field"));
    }

    #[test]
    fn test_one_error_per_unknown_name() {
        let result = validate_breakdowns(&bd(&["bogus_one", "bogus_two"]));
        assert_eq!(result.errors.len(), 2);
    }

    #[test]
    fn test_creative_with_demographic_rejected() {
        let result = validate_breakdowns(&bd(&["image_asset", "age"]));
        assert!(!result.valid);
        assert!(result.errors.iter().any(|e| e.contains("demographic")));
    }

    #[test]
    fn test_creative_with_geo_rejected() {
        let result = validate_breakdowns(&bd(&["video_asset", "country"]));
        assert!(!result.valid);
        assert!(result.errors.iter().any(|e| e.contains("geographic")));
    }

    #[test]
    fn test_creative_pair_is_valid() {
        assert!(validate_breakdowns(&bd(&["image_asset", "video_asset"])).valid);
    }

    #[test]
    fn test_creative_with_platform_is_valid() {
        assert!(validate_breakdowns(&bd(&["image_asset", "publisher_platform"])).valid);
        assert!(validate_breakdowns(&bd(&["title_asset", "device_platform", "product_id"])).valid);
    }

    #[test]
    fn test_demographic_with_geo_is_valid() {
        assert!(validate_breakdowns(&bd(&["age", "country"])).valid);
    }

    #[test]
    fn test_violations_accumulate() {
        // Too many + unknown + creative/demographic + creative/geo, all at once.
        let result = validate_breakdowns(&bd(&["image_asset", "age", "country", "mystery"]));
        assert!(!result.valid);
        assert_eq!(result.errors.len(), 4);
    }
}
