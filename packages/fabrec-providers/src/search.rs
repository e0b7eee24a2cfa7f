use std::time::Duration;

use color_eyre::{Result, eyre};
use reqwest::Client;
use serde_json::Value;

use fabrec_config::SearchProviderConfig;
use fabrec_domain::query::SearchFilters;

/// One scored hit from a search collaborator. Only the identifier and score
/// travel on this wire; attributes come from the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
	pub id: String,
	pub score: f32,
}

/// Top-k request against one search modality. Both the lexical and the
/// semantic collaborators speak this contract; excluded terms are passed as
/// hard exclusions for collaborators that support them.
pub async fn search(
	cfg: &SearchProviderConfig,
	query: &str,
	filters: &SearchFilters,
	exclude_terms: &[String],
	top_k: u32,
) -> Result<Vec<SearchHit>> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"query": query,
		"filters": filters,
		"exclude_terms": exclude_terms,
		"top_k": top_k,
	});
	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_search_response(json)
}

fn parse_search_response(json: Value) -> Result<Vec<SearchHit>> {
	let results = json
		.get("results")
		.or_else(|| json.get("data"))
		.and_then(|v| v.as_array())
		.ok_or_else(|| eyre::eyre!("Search response is missing results array."))?;
	let mut hits = Vec::with_capacity(results.len());

	for item in results {
		let id = item
			.get("id")
			.or_else(|| item.get("equipment_id"))
			.and_then(|v| v.as_str())
			.ok_or_else(|| eyre::eyre!("Search result missing id."))?;
		let score = item
			.get("score")
			.and_then(|v| v.as_f64())
			.ok_or_else(|| eyre::eyre!("Search result missing score."))? as f32;

		hits.push(SearchHit { id: id.to_string(), score });
	}

	Ok(hits)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_results_with_either_id_key() {
		let json = serde_json::json!({
			"results": [
				{ "id": "EQ-001", "score": 0.91 },
				{ "equipment_id": "EQ-002", "score": 0.44 }
			]
		});
		let hits = parse_search_response(json).expect("parse failed");

		assert_eq!(hits.len(), 2);
		assert_eq!(hits[0].id, "EQ-001");
		assert!((hits[1].score - 0.44).abs() < f32::EPSILON);
	}

	#[test]
	fn rejects_results_without_scores() {
		let json = serde_json::json!({ "results": [{ "id": "EQ-001" }] });

		assert!(parse_search_response(json).is_err());
	}

	#[test]
	fn rejects_payload_without_results() {
		let json = serde_json::json!({ "hits": [] });

		assert!(parse_search_response(json).is_err());
	}
}
