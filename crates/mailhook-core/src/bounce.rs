//! Bounce severity classification across provider taxonomies.
//!
//! Every provider reports bounces in its own vocabulary: SES uses
//! `Permanent`/`Transient`, Mailgun `permanent`/`temporary` severities,
//! Mailjet and Postmark `HardBounce`/`SoftBounce`, SparkPost numeric bounce
//! classes. [`classify_bounce`] reduces a `(bounce_type, bounce_category)`
//! pair to a [`BounceSeverity`] by trying an ordered list of rules; the first
//! rule with an opinion wins.
//!
//! Inputs nobody recognizes resolve through [`unrecognized_bounce_severity`],
//! which is soft: an unknown signal never marks a message as permanently
//! failed.

use serde::{Deserialize, Serialize};

/// Whether a bounce is permanent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BounceSeverity {
    /// Permanent failure; the message status is updated.
    Hard,
    /// Temporary or unknown failure; only the raw event is kept.
    Soft,
}

/// SparkPost bounce classes treated as permanent.
pub const SPARKPOST_HARD_CLASSES: &[&str] = &["10", "21", "30", "90"];

/// SparkPost bounce classes treated as temporary.
pub const SPARKPOST_SOFT_CLASSES: &[&str] = &[
    "1", "20", "22", "23", "24", "25", "40", "50", "51", "52", "53", "54", "60", "70", "80", "100",
];

type Rule = fn(&str, &str) -> Option<BounceSeverity>;

/// Classification rules in evaluation order. Inputs are lowercase.
const RULES: [Rule; 6] =
    [ses_rule, mailgun_rule, premapped_rule, blocked_rule, substring_rule, sparkpost_rule];

/// Severity for signals no rule recognizes.
pub const fn unrecognized_bounce_severity() -> BounceSeverity {
    BounceSeverity::Soft
}

/// Classifies a bounce from its provider type and category.
///
/// Comparison is case-insensitive.
pub fn classify_bounce(bounce_type: &str, bounce_category: &str) -> BounceSeverity {
    let bounce_type = bounce_type.to_lowercase();
    let bounce_category = bounce_category.to_lowercase();

    RULES
        .iter()
        .find_map(|rule| rule(&bounce_type, &bounce_category))
        .unwrap_or_else(unrecognized_bounce_severity)
}

/// Returns true when the bounce is permanent.
///
/// # Example
///
/// ```
/// use mailhook_core::bounce::is_hard_bounce;
///
/// assert!(is_hard_bounce("Permanent", "General"));
/// assert!(!is_hard_bounce("Transient", "General"));
/// assert!(!is_hard_bounce("unknown", "unknown"));
/// ```
pub fn is_hard_bounce(bounce_type: &str, bounce_category: &str) -> bool {
    classify_bounce(bounce_type, bounce_category) == BounceSeverity::Hard
}

fn ses_rule(bounce_type: &str, _category: &str) -> Option<BounceSeverity> {
    match bounce_type {
        "permanent" => Some(BounceSeverity::Hard),
        "transient" | "undetermined" => Some(BounceSeverity::Soft),
        _ => None,
    }
}

fn mailgun_rule(_bounce_type: &str, category: &str) -> Option<BounceSeverity> {
    match category {
        "hardbounce" | "permanent" => Some(BounceSeverity::Hard),
        "softbounce" | "temporary" => Some(BounceSeverity::Soft),
        _ => None,
    }
}

fn premapped_rule(bounce_type: &str, _category: &str) -> Option<BounceSeverity> {
    match bounce_type {
        "hardbounce" => Some(BounceSeverity::Hard),
        "softbounce" => Some(BounceSeverity::Soft),
        _ => None,
    }
}

// A block counts as permanent for contact-list purposes.
fn blocked_rule(bounce_type: &str, category: &str) -> Option<BounceSeverity> {
    (bounce_type == "blocked" || category == "blocked").then_some(BounceSeverity::Hard)
}

fn substring_rule(bounce_type: &str, category: &str) -> Option<BounceSeverity> {
    if bounce_type.contains("hard") || category.contains("hard") {
        Some(BounceSeverity::Hard)
    } else if bounce_type.contains("soft") || category.contains("soft") {
        Some(BounceSeverity::Soft)
    } else {
        None
    }
}

// Classes outside both tables fall through to the unrecognized policy.
fn sparkpost_rule(_bounce_type: &str, category: &str) -> Option<BounceSeverity> {
    if SPARKPOST_HARD_CLASSES.contains(&category) {
        Some(BounceSeverity::Hard)
    } else if SPARKPOST_SOFT_CLASSES.contains(&category) {
        Some(BounceSeverity::Soft)
    } else {
        None
    }
}
