use fabrec_domain::{parse, query::StructuredQuery};
use fabrec_policy::PolicySnapshot;

/// Parse one turn's text into a structured query. Cross-turn merging is owned
/// by the session reconciler; this sees the current turn only.
pub fn interpret(raw_text: &str, policy: &PolicySnapshot) -> StructuredQuery {
	let (temp_min, temp_max) = parse::extract_temperature(raw_text);

	StructuredQuery {
		raw_text: raw_text.to_string(),
		wafer_sizes: parse::extract_wafer_sizes(raw_text),
		materials: parse::extract_materials(raw_text),
		temp_min,
		temp_max,
		category_hints: parse::extract_category_hints(raw_text),
		mapped_categories: policy.mapping.mapped_categories(raw_text),
		..StructuredQuery::default()
	}
}
