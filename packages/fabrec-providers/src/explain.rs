use std::time::Duration;

use color_eyre::{Result, eyre};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use fabrec_config::LlmProviderConfig;

/// Structured explanation output: one reason per recommended identifier plus
/// an overall summary.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExplanationOutput {
	#[serde(default)]
	pub recommendations: Vec<ExplanationReason>,
	#[serde(default)]
	pub explanation: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExplanationReason {
	pub equipment_id: String,
	#[serde(default)]
	pub reason: String,
}

/// Explanation generation with a single retry when the collaborator times
/// out; any other failure propagates to the caller's degrade path.
pub async fn generate(cfg: &LlmProviderConfig, messages: &[Value]) -> Result<ExplanationOutput> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let mut retried = false;

	loop {
		match send(&client, cfg, messages).await {
			Ok(output) => return Ok(output),
			Err(err) if !retried && is_timeout(&err) => retried = true,
			Err(err) => return Err(err),
		}
	}
}

async fn send(
	client: &Client,
	cfg: &LlmProviderConfig,
	messages: &[Value],
) -> Result<ExplanationOutput> {
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

	parse_explanation_response(json)
}

fn is_timeout(err: &color_eyre::Report) -> bool {
	err.downcast_ref::<reqwest::Error>().map(reqwest::Error::is_timeout).unwrap_or(false)
}

fn parse_explanation_response(json: Value) -> Result<ExplanationOutput> {
	let content = json
		.get("choices")
		.and_then(|v| v.as_array())
		.and_then(|arr| arr.first())
		.and_then(|choice| choice.get("message"))
		.and_then(|msg| msg.get("content"))
		.and_then(|c| c.as_str())
		.ok_or_else(|| eyre::eyre!("Explanation response is missing message content."))?;
	let parsed: Value = serde_json::from_str(content)
		.map_err(|_| eyre::eyre!("Explanation content is not valid JSON."))?;

	serde_json::from_value(parsed)
		.map_err(|err| eyre::eyre!("Explanation content does not match the schema: {err}"))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_reasons_and_summary() {
		let json = serde_json::json!({
			"choices": [{
				"message": {
					"content": "{\"recommendations\": [{\"equipment_id\": \"EQ-001\", \"reason\": \"GaN epitaxy up to 1200C.\"}], \"explanation\": \"MOCVD systems fit the request.\"}"
				}
			}]
		});
		let output = parse_explanation_response(json).expect("parse failed");

		assert_eq!(output.recommendations.len(), 1);
		assert_eq!(output.recommendations[0].equipment_id, "EQ-001");
		assert!(output.explanation.contains("MOCVD"));
	}

	#[test]
	fn tolerates_missing_recommendation_reasons() {
		let json = serde_json::json!({
			"choices": [{
				"message": { "content": "{\"explanation\": \"Closest matches shown.\"}" }
			}]
		});
		let output = parse_explanation_response(json).expect("parse failed");

		assert!(output.recommendations.is_empty());
		assert_eq!(output.explanation, "Closest matches shown.");
	}

	#[test]
	fn rejects_prose_content() {
		let json = serde_json::json!({
			"choices": [{ "message": { "content": "Here are your recommendations." } }]
		});

		assert!(parse_explanation_response(json).is_err());
	}
}
