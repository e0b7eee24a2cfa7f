use serde_json::Value;
use tracing::warn;

use fabrec_domain::intent::{IntentFlags, quick_intent_cues};

use crate::RecommendService;

impl RecommendService {
	/// Intent flags for the turn. Simple turns never pay the classifier
	/// call; collaborator failure or malformed output degrades to default
	/// flags rather than failing the request.
	pub(crate) async fn classify_intent(&self, query: &str) -> IntentFlags {
		let cues = quick_intent_cues(query);

		if !cues.needs_classifier() {
			return IntentFlags::default();
		}

		let messages = build_intent_messages(query);

		match self.providers.intent.classify(&self.cfg.providers.intent_llm, &messages).await {
			Ok(flags) => flags,
			Err(err) => {
				warn!(
					error = %err,
					"Intent classification failed; degrading to literal keyword search."
				);

				IntentFlags::default()
			},
		}
	}
}

fn build_intent_messages(query: &str) -> Vec<Value> {
	let schema = serde_json::json!({
		"negated_terms": ["string"],
		"is_compound_or": false,
		"is_abstract": false
	});
	let schema_text = serde_json::to_string_pretty(&schema).unwrap_or_else(|_| {
		"{\"negated_terms\": [\"string\"], \"is_compound_or\": false, \"is_abstract\": false}"
			.to_string()
	});
	let system_prompt = "You are the intent-classification module of a fab equipment search \
system. Output must be valid JSON only and must match the provided schema exactly. \
negated_terms lists the materials, categories, or process names the user excludes. \
is_compound_or is true when the request combines alternatives (A or B, both A and B). \
is_abstract is true when the request describes a goal or situation instead of naming \
equipment. Do not add explanations or extra fields.";
	let user_prompt = format!(
		"Return JSON matching this exact schema:\n{schema}\nUser query:\n{query}",
		schema = schema_text,
		query = query
	);

	vec![
		serde_json::json!({ "role": "system", "content": system_prompt }),
		serde_json::json!({ "role": "user", "content": user_prompt }),
	]
}
