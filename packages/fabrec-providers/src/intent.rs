use std::time::Duration;

use color_eyre::{Result, eyre};
use reqwest::Client;
use serde_json::Value;

use fabrec_config::LlmProviderConfig;
use fabrec_domain::intent::IntentFlags;

/// Intent classification through the text-understanding collaborator. The
/// caller degrades to default flags on any error, so this stays a single
/// attempt.
pub async fn classify(cfg: &LlmProviderConfig, messages: &[Value]) -> Result<IntentFlags> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"model": cfg.model,
		"temperature": cfg.temperature,
		"messages": messages,
	});
	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_intent_response(json)
}

fn parse_intent_response(json: Value) -> Result<IntentFlags> {
	let content = json
		.get("choices")
		.and_then(|v| v.as_array())
		.and_then(|arr| arr.first())
		.and_then(|choice| choice.get("message"))
		.and_then(|msg| msg.get("content"))
		.and_then(|c| c.as_str())
		.ok_or_else(|| eyre::eyre!("Intent response is missing message content."))?;
	let parsed: Value = serde_json::from_str(content)
		.map_err(|_| eyre::eyre!("Intent content is not valid JSON."))?;

	serde_json::from_value(parsed)
		.map_err(|err| eyre::eyre!("Intent content does not match the flags schema: {err}"))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_flags_from_choice_content() {
		let json = serde_json::json!({
			"choices": [{
				"message": {
					"content": "{\"negated_terms\": [\"rta\"], \"is_compound_or\": true, \"is_abstract\": false}"
				}
			}]
		});
		let flags = parse_intent_response(json).expect("parse failed");

		assert!(flags.negated_terms.contains("rta"));
		assert!(flags.is_compound_or);
		assert!(!flags.is_abstract);
	}

	#[test]
	fn missing_fields_default_to_empty() {
		let json = serde_json::json!({
			"choices": [{ "message": { "content": "{\"is_abstract\": true}" } }]
		});
		let flags = parse_intent_response(json).expect("parse failed");

		assert!(flags.negated_terms.is_empty());
		assert!(flags.is_abstract);
	}

	#[test]
	fn rejects_non_json_content() {
		let json = serde_json::json!({
			"choices": [{ "message": { "content": "no equipment matched" } }]
		});

		assert!(parse_intent_response(json).is_err());
	}
}
