use regex::Regex;

use fabrec_domain::{
	intent::IntentFlags,
	query::{RankPreference, StructuredQuery},
};

/// Follow-up shapes recognised in a turn's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowupKind {
	ConditionChange,
	ConditionReplace,
	ReferencePrevious,
	AddCondition,
	SimilarRequest,
	Comparison,
	AdjustRange,
}

/// How the turn combines with accumulated session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnClass {
	/// No usable session context; the turn stands alone.
	Fresh,
	/// The turn re-specifies hard attributes; overwrite only those fields.
	Replace,
	/// A follow-up with no new hard attributes; reuse the accumulated query.
	CarryOver { prefer: Option<RankPreference> },
}

const FOLLOWUP_PATTERNS: [(&str, FollowupKind); 14] = [
	(r"(그럼|그러면)\s*(이|저)\s*조건", FollowupKind::ConditionChange),
	(r"(대신|말고)\s*.+(으로|로)\s*(바꿔|변경)", FollowupKind::ConditionReplace),
	(r"(으로|로)\s*(바꿔|변경)", FollowupKind::ConditionReplace),
	(r"(그|저|이)\s*장비", FollowupKind::ReferencePrevious),
	(r"첫\s*번째|두\s*번째|세\s*번째", FollowupKind::ReferencePrevious),
	(r"맨\s*(위|아래|처음|마지막)", FollowupKind::ReferencePrevious),
	(r"(거기에|추가로)\s*.+(도|만)", FollowupKind::AddCondition),
	(r"(비슷한|유사한)\s*(다른|장비)", FollowupKind::SimilarRequest),
	(r"(더|가장)\s*(싼|저렴한|비싼|좋은|빠른)", FollowupKind::Comparison),
	(r"차이|비교", FollowupKind::Comparison),
	(r"\bcheaper\b|\bcheapest\b", FollowupKind::Comparison),
	(r"\bswitch\s+to\b|\bchange\s+to\b|\binstead\b", FollowupKind::ConditionReplace),
	(r"(더|좀)\s*(넓|좁)(게|히|혀)", FollowupKind::AdjustRange),
	(r"\bsimilar\b", FollowupKind::SimilarRequest),
];

/// Deictic words that mark a short turn as referring back to earlier results.
const DEICTIC_WORDS: [&str; 5] = ["이거", "저거", "그거", "이건", "그건"];
const SHORT_TURN_CHARS: usize = 20;

pub fn detect_followup(text: &str) -> Option<FollowupKind> {
	let text_lower = text.to_lowercase();

	for (pattern, kind) in FOLLOWUP_PATTERNS {
		if Regex::new(pattern).map(|re| re.is_match(&text_lower)).unwrap_or(false) {
			return Some(kind);
		}
	}

	if text.chars().count() < SHORT_TURN_CHARS
		&& DEICTIC_WORDS.iter().any(|word| text.contains(word))
	{
		return Some(FollowupKind::ReferencePrevious);
	}

	None
}

/// Classify the turn against the parsed constraints, intent flags, and prior
/// session state. The exact boundary between the three classes is a
/// heuristic; it is validated against conversational test cases rather than
/// derived from a closed rule.
pub fn classify_turn(
	parsed: &StructuredQuery,
	intent: &IntentFlags,
	followup: Option<FollowupKind>,
	accumulated: Option<&StructuredQuery>,
) -> TurnClass {
	if accumulated.is_none() {
		return TurnClass::Fresh;
	}

	if parsed.has_hard_attributes() || !intent.negated_terms.is_empty() {
		return TurnClass::Replace;
	}

	match followup {
		Some(FollowupKind::Comparison) => {
			TurnClass::CarryOver { prefer: Some(RankPreference::LowerCost) }
		},
		Some(_) => TurnClass::CarryOver { prefer: None },
		// An abstract turn ("something for this situation") leans on the
		// conversation even without an explicit follow-up cue.
		None if intent.is_abstract => TurnClass::CarryOver { prefer: None },
		None => TurnClass::Fresh,
	}
}

/// Produce the query the pipeline runs on. `Replace` overwrites only the
/// fields the new turn re-specifies; `CarryOver` reuses the accumulated
/// query verbatim apart from the soft preference.
pub fn merge_turn(
	class: TurnClass,
	parsed: StructuredQuery,
	accumulated: Option<&StructuredQuery>,
) -> StructuredQuery {
	match (class, accumulated) {
		(TurnClass::Fresh, _) | (_, None) => parsed,
		(TurnClass::Replace, Some(prior)) => {
			let mut merged = prior.clone();

			merged.raw_text = join_turn_text(&prior.raw_text, &parsed.raw_text);

			if !parsed.wafer_sizes.is_empty() {
				merged.wafer_sizes = parsed.wafer_sizes;
			}
			if !parsed.materials.is_empty() {
				merged.materials = parsed.materials;
			}
			if parsed.temp_min.is_some() {
				merged.temp_min = parsed.temp_min;
			}
			if parsed.temp_max.is_some() {
				merged.temp_max = parsed.temp_max;
			}
			if !parsed.category_hints.is_empty() {
				merged.category_hints = parsed.category_hints;
			}
			if !parsed.mapped_categories.is_empty() {
				merged.mapped_categories = parsed.mapped_categories;
			}

			merged.excluded_terms.extend(parsed.excluded_terms);
			merged.logical_mode = parsed.logical_mode;
			merged.prefer = None;

			merged
		},
		(TurnClass::CarryOver { prefer }, Some(prior)) => {
			let mut merged = prior.clone();

			if prefer.is_some() {
				merged.prefer = prefer;
			}

			merged
		},
	}
}

/// Keep the prior context searchable while bounding growth across many turns.
fn join_turn_text(prior: &str, current: &str) -> String {
	const MAX_CONTEXT_CHARS: usize = 512;

	let joined = format!("{} {}", prior.trim(), current.trim());
	let joined = joined.trim().to_string();

	if joined.chars().count() <= MAX_CONTEXT_CHARS {
		return joined;
	}

	let skip = joined.chars().count() - MAX_CONTEXT_CHARS;

	joined.chars().skip(skip).collect()
}
