use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// How multiple material/category hints combine when filtering candidates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicalMode {
	#[default]
	And,
	Or,
}

/// Soft ordering preference carried across follow-up turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankPreference {
	LowerCost,
}

/// One turn's constraints, merged with accumulated session state before the
/// pipeline runs. Hard attributes come from literal extraction, mapped
/// categories from the policy mapping table, excluded terms from negation
/// intent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredQuery {
	pub raw_text: String,
	pub wafer_sizes: BTreeSet<String>,
	pub materials: BTreeSet<String>,
	pub temp_min: Option<f32>,
	pub temp_max: Option<f32>,
	pub category_hints: BTreeSet<String>,
	pub mapped_categories: Vec<String>,
	pub excluded_terms: BTreeSet<String>,
	pub logical_mode: LogicalMode,
	pub prefer: Option<RankPreference>,
	pub session_id: Option<String>,
}

impl StructuredQuery {
	/// True when the turn re-specifies at least one hard constraint, which is
	/// what distinguishes a `replace` turn from a bare follow-up.
	pub fn has_hard_attributes(&self) -> bool {
		!self.wafer_sizes.is_empty()
			|| !self.materials.is_empty()
			|| self.temp_min.is_some()
			|| self.temp_max.is_some()
			|| !self.category_hints.is_empty()
			|| !self.mapped_categories.is_empty()
	}
}

/// Structured filter block sent to both search collaborators.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFilters {
	pub wafer_sizes: Vec<String>,
	pub materials: Vec<String>,
	pub categories: Vec<String>,
	pub temp_min: Option<f32>,
	pub temp_max: Option<f32>,
	pub logical_mode: LogicalMode,
}

impl SearchFilters {
	pub fn from_query(query: &StructuredQuery) -> Self {
		let mut categories: Vec<String> = query.mapped_categories.clone();

		for hint in &query.category_hints {
			if !categories.iter().any(|category| category == hint) {
				categories.push(hint.clone());
			}
		}

		Self {
			wafer_sizes: query.wafer_sizes.iter().cloned().collect(),
			materials: query.materials.iter().cloned().collect(),
			categories,
			temp_min: query.temp_min,
			temp_max: query.temp_max,
			logical_mode: query.logical_mode,
		}
	}
}
