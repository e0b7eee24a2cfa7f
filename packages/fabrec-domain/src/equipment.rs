use serde::{Deserialize, Serialize};

/// Catalog attributes for one piece of equipment, as returned by the
/// equipment-catalog collaborator. Scoring fields live on the pipeline's
/// candidate wrapper, not here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentRecord {
	pub equipment_id: String,
	pub name: String,
	pub category: String,
	pub institution: String,
	#[serde(default)]
	pub wafer_sizes: Vec<String>,
	#[serde(default)]
	pub materials: Vec<String>,
	#[serde(default)]
	pub temp_min: Option<f32>,
	#[serde(default)]
	pub temp_max: Option<f32>,
	#[serde(default)]
	pub hourly_cost: Option<f32>,
	#[serde(default)]
	pub is_maintenance: bool,
	#[serde(default = "default_is_internal")]
	pub is_internal: bool,
}

fn default_is_internal() -> bool {
	true
}
