use std::collections::BTreeSet;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Structured output of the intent-classification collaborator. Defaults are
/// the degrade path: literal keyword search with nothing excluded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntentFlags {
	#[serde(default)]
	pub negated_terms: BTreeSet<String>,
	#[serde(default)]
	pub is_compound_or: bool,
	#[serde(default)]
	pub is_abstract: bool,
}

/// Rule-based pre-check deciding whether the turn is complex enough to be
/// worth a classifier call at all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntentCues {
	pub negative: bool,
	pub compound: bool,
	pub abstract_shape: bool,
}

impl IntentCues {
	pub fn needs_classifier(self) -> bool {
		self.negative || self.compound || self.abstract_shape
	}
}

const NEGATIVE_PATTERNS: [&str; 11] = [
	r"아니[였었]",
	r"제외",
	r"없[는이]",
	r"빼고",
	r"말고",
	r"이하로?만",
	r"미만",
	r"안\s?되",
	r"\bnot\b",
	r"\bwithout\b",
	r"\bexcept\b",
];

const COMPOUND_PATTERNS: [&str; 6] = [
	r"[과와랑].*둘\s?다",
	r"이거나",
	r"또는",
	r"동시에",
	r"\bor\b",
	r"\bboth\b",
];

const ABSTRACT_PATTERNS: [&str; 6] = [
	r"어떤.*좋을까",
	r"뭐가\s?있",
	r"상황에서",
	r"하려는데",
	r"\bwhat\s+kind\b",
	r"\bwhich\b.*\bbest\b",
];

pub fn quick_intent_cues(text: &str) -> IntentCues {
	let text_lower = text.to_lowercase();

	IntentCues {
		negative: matches_any(&text_lower, &NEGATIVE_PATTERNS),
		compound: matches_any(&text_lower, &COMPOUND_PATTERNS),
		abstract_shape: matches_any(&text_lower, &ABSTRACT_PATTERNS),
	}
}

fn matches_any(text: &str, patterns: &[&str]) -> bool {
	patterns
		.iter()
		.any(|pattern| Regex::new(pattern).map(|re| re.is_match(text)).unwrap_or(false))
}
