use std::collections::HashMap;

use time::OffsetDateTime;
use tracing::warn;

use fabrec_config::PolicyDefaults;
use fabrec_domain::parse::contains_word;

use crate::tables::{
	InstitutionDocument, MappingDocument, SettingRow, SettingValue, SettingsDocument,
};

/// Number of mapped categories kept per query.
const MAPPED_CATEGORY_LIMIT: usize = 3;
/// Priority assigned to exact-keyword hits; substring hits start at 10.
const EXACT_MATCH_PRIORITY: u32 = 1;
const SUBSTRING_MATCH_BASE_PRIORITY: u32 = 10;

/// Immutable, internally consistent copy of all three rule tables. A snapshot
/// is swapped in as a unit; no field is ever read from a different load
/// generation.
#[derive(Debug)]
pub struct PolicySnapshot {
	pub generation: u64,
	pub loaded_at: OffsetDateTime,
	pub institutions: InstitutionTable,
	pub settings: SettingsTable,
	pub mapping: MappingTable,
}

impl PolicySnapshot {
	pub fn empty(defaults: PolicyDefaults, loaded_at: OffsetDateTime) -> Self {
		Self {
			generation: 0,
			loaded_at,
			institutions: InstitutionTable { by_id: HashMap::new() },
			settings: SettingsTable { values: HashMap::new(), defaults },
			mapping: MappingTable { entries: Vec::new(), exact: Vec::new() },
		}
	}
}

#[derive(Debug)]
pub struct InstitutionTable {
	by_id: HashMap<String, i32>,
}

impl InstitutionTable {
	pub fn from_document(doc: &InstitutionDocument) -> Self {
		let by_id = doc
			.institutions
			.iter()
			.filter(|row| row.is_active)
			.map(|row| (row.id.clone(), row.priority))
			.collect();

		Self { by_id }
	}

	pub fn priority(&self, institution_id: &str) -> Option<i32> {
		self.by_id.get(institution_id).copied()
	}

	pub fn len(&self) -> usize {
		self.by_id.len()
	}

	pub fn is_empty(&self) -> bool {
		self.by_id.is_empty()
	}
}

#[derive(Debug)]
pub struct SettingsTable {
	values: HashMap<String, SettingValue>,
	defaults: PolicyDefaults,
}

impl SettingsTable {
	pub fn from_document(doc: &SettingsDocument, defaults: &PolicyDefaults) -> Self {
		let mut values = HashMap::new();

		for row in &doc.policies {
			match SettingValue::parse(&row.value, &row.value_type) {
				Some(value) => {
					values.insert(row.key.clone(), value);
				},
				None => warn_malformed_setting(row),
			}
		}

		Self { values, defaults: defaults.clone() }
	}

	pub fn maintenance_exclude(&self) -> bool {
		self.values
			.get("maintenance_exclude")
			.and_then(SettingValue::as_bool)
			.unwrap_or(self.defaults.maintenance_exclude)
	}

	pub fn external_visible(&self) -> bool {
		self.values
			.get("external_visible")
			.and_then(SettingValue::as_bool)
			.unwrap_or(self.defaults.external_visible)
	}

	pub fn min_rag_score(&self) -> f32 {
		self.values
			.get("min_rag_score")
			.and_then(SettingValue::as_f32)
			.unwrap_or(self.defaults.min_rag_score)
	}

	pub fn max_recommendations(&self) -> usize {
		self.values
			.get("max_recommendations")
			.and_then(SettingValue::as_usize)
			.unwrap_or(self.defaults.max_recommendations as usize)
	}

	pub fn len(&self) -> usize {
		self.values.len()
	}

	pub fn is_empty(&self) -> bool {
		self.values.is_empty()
	}
}

#[derive(Debug)]
pub struct MappingTable {
	entries: Vec<MappingEntry>,
	exact: Vec<String>,
}

#[derive(Debug)]
struct MappingEntry {
	keyword: String,
	categories: Vec<(String, u32)>,
}

impl MappingTable {
	pub fn from_document(doc: &MappingDocument) -> Self {
		let mut entries = Vec::new();

		for row in &doc.mappings {
			let categories: Vec<(String, u32)> = row
				.categories
				.iter()
				.enumerate()
				.map(|(idx, category)| {
					(category.clone(), SUBSTRING_MATCH_BASE_PRIORITY + idx as u32)
				})
				.collect();

			entries.push(MappingEntry {
				keyword: row.keyword.to_lowercase(),
				categories: categories.clone(),
			});

			if let Some(keyword_en) = row.keyword_en.as_deref() {
				entries.push(MappingEntry { keyword: keyword_en.to_lowercase(), categories });
			}
		}

		let exact = doc.exact_matches.iter().map(|keyword| keyword.to_lowercase()).collect();

		Self { entries, exact }
	}

	/// Top categories inferred from process keywords in the query text.
	/// Exact keywords must appear as whole tokens; plain keywords match as
	/// substrings. The result is independent of table row order.
	pub fn mapped_categories(&self, query: &str) -> Vec<String> {
		let query_lower = query.to_lowercase();
		let mut matched: Vec<(bool, u32, String)> = Vec::new();

		for keyword in &self.exact {
			if contains_word(&query_lower, keyword) {
				matched.push((true, EXACT_MATCH_PRIORITY, keyword.to_uppercase()));
			}
		}

		for entry in &self.entries {
			if !query_lower.contains(entry.keyword.as_str()) {
				continue;
			}

			for (category, priority) in &entry.categories {
				let shadowed_by_exact =
					matched.iter().any(|(is_exact, _, existing)| *is_exact && existing == category);

				if !shadowed_by_exact {
					matched.push((false, *priority, category.clone()));
				}
			}
		}

		matched.sort_by(|a, b| {
			let (a_exact, a_priority, a_category) = a;
			let (b_exact, b_priority, b_category) = b;

			b_exact
				.cmp(a_exact)
				.then_with(|| a_priority.cmp(b_priority))
				.then_with(|| a_category.cmp(b_category))
		});

		let mut categories = Vec::new();

		for (_, _, category) in matched {
			if !categories.contains(&category) {
				categories.push(category);
			}
			if categories.len() == MAPPED_CATEGORY_LIMIT {
				break;
			}
		}

		categories
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

fn warn_malformed_setting(row: &SettingRow) {
	warn!(
		key = row.key.as_str(),
		value_type = row.value_type.as_str(),
		"Malformed settings row; the configured default will be served for this key."
	);
}
