use std::time::Duration;

use color_eyre::{Result, eyre};
use reqwest::Client;
use serde_json::Value;

use fabrec_config::CatalogProviderConfig;
use fabrec_domain::equipment::EquipmentRecord;

/// Attribute lookup for one equipment identifier.
pub async fn get(cfg: &CatalogProviderConfig, equipment_id: &str) -> Result<EquipmentRecord> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}/{}", cfg.api_base, cfg.path, equipment_id);
	let res = client
		.get(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_catalog_response(json)
}

fn parse_catalog_response(json: Value) -> Result<EquipmentRecord> {
	// Some catalog deployments wrap the record in an envelope.
	let record = json.get("equipment").cloned().unwrap_or(json);

	serde_json::from_value(record)
		.map_err(|err| eyre::eyre!("Catalog response is not a valid equipment record: {err}"))
}
