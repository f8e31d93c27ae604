//! Validation System - Rule/Policy Separation
//!
//! Rules inspect a decoded texture and produce structured violations. They
//! never modify the image. Policy: any `Error` violation fails the build,
//! warnings are recorded and shipped.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::png::{self, DecodedPng, RgbaImage};

pub const MIN_TEXTURE_SIZE: u32 = 16;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ViolationSeverity {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationViolation {
    pub rule: String,
    pub severity: ViolationSeverity,
    pub message: String,
    pub expected: Option<String>,
    pub actual: Option<String>,
    pub remediation: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub violations: Vec<ValidationViolation>,
    pub path: String,
}

impl ValidationResult {
    pub fn success(path: &str) -> Self {
        Self {
            valid: true,
            violations: vec![],
            path: path.to_string(),
        }
    }

    pub fn failure(path: &str, violations: Vec<ValidationViolation>) -> Self {
        Self {
            valid: false,
            violations,
            path: path.to_string(),
        }
    }

    pub fn has_errors(&self) -> bool {
        self.violations.iter().any(|v| v.severity == ViolationSeverity::Error)
    }

    /// `rule: message (expected X, got Y)` for the first error, if any.
    pub fn first_error(&self) -> Option<String> {
        self.violations
            .iter()
            .find(|v| v.severity == ViolationSeverity::Error)
            .map(|v| match (&v.expected, &v.actual) {
                (Some(e), Some(a)) => format!("{}: {} (expected {}, got {})", v.rule, v.message, e, a),
                _ => format!("{}: {}", v.rule, v.message),
            })
    }
}

/// A decoded texture as seen by the rules.
pub struct TextureFacts<'a> {
    pub header: &'a DecodedPng,
    pub rgba: &'a RgbaImage,
}

/// Validation rule trait - produces violations
pub trait ValidationRule {
    fn name(&self) -> &'static str;
    fn validate(&self, facts: &TextureFacts<'_>) -> Vec<ValidationViolation>;
}

fn error(rule: &str, message: &str, expected: String, actual: String, fix: &str) -> ValidationViolation {
    ValidationViolation {
        rule: rule.to_string(),
        severity: ViolationSeverity::Error,
        message: message.to_string(),
        expected: Some(expected),
        actual: Some(actual),
        remediation: vec![fix.to_string()],
    }
}

// --- Concrete Rules ---

pub struct ColorTypeRule;

impl ValidationRule for ColorTypeRule {
    fn name(&self) -> &'static str { "color_type" }

    fn validate(&self, facts: &TextureFacts<'_>) -> Vec<ValidationViolation> {
        if facts.header.color_type.is_truecolor() {
            return vec![];
        }
        vec![error(
            self.name(),
            "Texture must be RGB or RGBA",
            "color type 2 or 6".into(),
            format!("color type {}", facts.header.color_type.as_byte()),
            "Normalize the texture before writing",
        )]
    }
}

pub struct MinimumSizeRule;

impl ValidationRule for MinimumSizeRule {
    fn name(&self) -> &'static str { "minimum_size" }

    fn validate(&self, facts: &TextureFacts<'_>) -> Vec<ValidationViolation> {
        let (w, h) = (facts.rgba.width, facts.rgba.height);
        if w >= MIN_TEXTURE_SIZE && h >= MIN_TEXTURE_SIZE {
            return vec![];
        }
        vec![error(
            self.name(),
            "Texture too small",
            format!("{}x{} minimum", MIN_TEXTURE_SIZE, MIN_TEXTURE_SIZE),
            format!("{}x{}", w, h),
            "Synthesize at 16x16 or larger",
        )]
    }
}

pub struct AlphaRule;

impl ValidationRule for AlphaRule {
    fn name(&self) -> &'static str { "alpha" }

    fn validate(&self, facts: &TextureFacts<'_>) -> Vec<ValidationViolation> {
        if facts.rgba.pixels.chunks_exact(4).any(|p| p[3] != 0) {
            return vec![];
        }
        vec![error(
            self.name(),
            "Texture is fully transparent",
            "at least one pixel with alpha > 0".into(),
            "all pixels alpha = 0".into(),
            "Check the source texture or the synthesis profile",
        )]
    }
}

pub struct DistinctValuesRule;

impl ValidationRule for DistinctValuesRule {
    fn name(&self) -> &'static str { "distinct_values" }

    fn validate(&self, facts: &TextureFacts<'_>) -> Vec<ValidationViolation> {
        let mut seen = HashSet::new();
        for px in facts.rgba.pixels.chunks_exact(4) {
            seen.insert(px);
            if seen.len() >= 2 {
                return vec![];
            }
        }
        vec![error(
            self.name(),
            "Texture is a single flat color",
            "at least 2 distinct pixel values".into(),
            format!("{} distinct value", seen.len()),
            "Add noise or a motif to the texture",
        )]
    }
}

/// Dimensions that are not a multiple of 16 load, but look wrong next to
/// vanilla textures.
pub struct GridAlignmentRule;

impl ValidationRule for GridAlignmentRule {
    fn name(&self) -> &'static str { "grid_alignment" }

    fn validate(&self, facts: &TextureFacts<'_>) -> Vec<ValidationViolation> {
        let (w, h) = (facts.rgba.width, facts.rgba.height);
        if w % 16 == 0 && h % 16 == 0 {
            return vec![];
        }
        vec![ValidationViolation {
            rule: self.name().to_string(),
            severity: ViolationSeverity::Warning,
            message: "Texture size is not a multiple of 16".to_string(),
            expected: Some("multiples of 16".to_string()),
            actual: Some(format!("{}x{}", w, h)),
            remediation: vec!["Resize to a 16-pixel grid".to_string()],
        }]
    }
}

/// Validator orchestrates rules and applies policy
pub struct Validator {
    rules: Vec<Box<dyn ValidationRule + Send + Sync>>,
}

impl Validator {
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(ColorTypeRule),
                Box::new(MinimumSizeRule),
                Box::new(AlphaRule),
                Box::new(DistinctValuesRule),
                Box::new(GridAlignmentRule),
            ],
        }
    }

    /// Validate encoded PNG bytes that are about to be written to `path`.
    pub fn validate_png(&self, path: &str, bytes: &[u8]) -> ValidationResult {
        let decoded = match png::decode(bytes) {
            Ok(d) => d,
            Err(e) => {
                return ValidationResult::failure(
                    path,
                    vec![ValidationViolation {
                        rule: "decode".to_string(),
                        severity: ViolationSeverity::Error,
                        message: e.to_string(),
                        expected: None,
                        actual: None,
                        remediation: vec!["Re-encode the texture".to_string()],
                    }],
                )
            }
        };
        let rgba = match decoded.to_rgba() {
            Ok(r) => r,
            Err(e) => {
                return ValidationResult::failure(
                    path,
                    vec![ValidationViolation {
                        rule: "decode".to_string(),
                        severity: ViolationSeverity::Error,
                        message: e.to_string(),
                        expected: None,
                        actual: None,
                        remediation: vec![],
                    }],
                )
            }
        };
        self.validate(path, &TextureFacts { header: &decoded, rgba: &rgba })
    }

    pub fn validate(&self, path: &str, facts: &TextureFacts<'_>) -> ValidationResult {
        let mut all_violations = vec![];

        for rule in &self.rules {
            let violations = rule.validate(facts);
            all_violations.extend(violations);
        }

        let has_errors = all_violations.iter()
            .any(|v| v.severity == ViolationSeverity::Error);

        if has_errors {
            ValidationResult::failure(path, all_violations)
        } else {
            // Warnings don't block
            ValidationResult {
                valid: true,
                violations: all_violations,
                path: path.to_string(),
            }
        }
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}
