use serde::Deserialize;
use serde_json::Value;

/// Institution table document: `{version, updated_at, institutions: [...]}`.
#[derive(Debug, Clone, Deserialize)]
pub struct InstitutionDocument {
	#[serde(default)]
	pub version: u32,
	#[serde(default)]
	pub updated_at: String,
	#[serde(default)]
	pub institutions: Vec<InstitutionRow>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InstitutionRow {
	pub id: String,
	pub name: String,
	pub priority: i32,
	#[serde(default = "default_is_active")]
	pub is_active: bool,
}

/// Settings table document: `{version, updated_at, policies: [...]}`.
#[derive(Debug, Clone, Deserialize)]
pub struct SettingsDocument {
	#[serde(default)]
	pub version: u32,
	#[serde(default)]
	pub updated_at: String,
	#[serde(default)]
	pub policies: Vec<SettingRow>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SettingRow {
	pub key: String,
	pub value: Value,
	#[serde(rename = "type", default)]
	pub value_type: String,
}

/// Mapping table document: `{version, updated_at, mappings: [...],
/// exact_matches: [...]}`.
#[derive(Debug, Clone, Deserialize)]
pub struct MappingDocument {
	#[serde(default)]
	pub version: u32,
	#[serde(default)]
	pub updated_at: String,
	#[serde(default)]
	pub mappings: Vec<MappingRow>,
	#[serde(default)]
	pub exact_matches: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MappingRow {
	pub keyword: String,
	#[serde(default)]
	pub keyword_en: Option<String>,
	#[serde(default)]
	pub categories: Vec<String>,
}

/// Typed settings value, constructed once at load time so reads never parse.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingValue {
	Boolean(bool),
	Integer(i64),
	Float(f64),
	Text(String),
}

impl SettingValue {
	/// Build from a raw row. `None` means the row is malformed and the
	/// configured default must be served for this key instead.
	pub fn parse(value: &Value, value_type: &str) -> Option<Self> {
		match value_type {
			"boolean" => match value {
				Value::Bool(flag) => Some(Self::Boolean(*flag)),
				Value::String(text) => match text.to_lowercase().as_str() {
					"true" => Some(Self::Boolean(true)),
					"false" => Some(Self::Boolean(false)),
					_ => None,
				},
				_ => None,
			},
			"integer" => match value {
				Value::Number(number) => number.as_i64().map(Self::Integer),
				Value::String(text) => text.trim().parse().ok().map(Self::Integer),
				_ => None,
			},
			"float" => match value {
				Value::Number(number) => number.as_f64().map(Self::Float),
				Value::String(text) => text.trim().parse().ok().map(Self::Float),
				_ => None,
			},
			"string" => match value {
				Value::String(text) => Some(Self::Text(text.clone())),
				_ => None,
			},
			_ => None,
		}
	}

	pub fn as_bool(&self) -> Option<bool> {
		match self {
			Self::Boolean(flag) => Some(*flag),
			_ => None,
		}
	}

	pub fn as_f32(&self) -> Option<f32> {
		match self {
			Self::Float(value) => Some(*value as f32),
			Self::Integer(value) => Some(*value as f32),
			_ => None,
		}
	}

	pub fn as_usize(&self) -> Option<usize> {
		match self {
			Self::Integer(value) => usize::try_from(*value).ok(),
			_ => None,
		}
	}
}

fn default_is_active() -> bool {
	true
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_boolean_from_string() {
		let value = SettingValue::parse(&Value::String("True".to_string()), "boolean");

		assert_eq!(value, Some(SettingValue::Boolean(true)));
	}

	#[test]
	fn rejects_unknown_type() {
		let value = SettingValue::parse(&Value::String("3".to_string()), "decimal");

		assert_eq!(value, None);
	}

	#[test]
	fn rejects_unparsable_integer() {
		let value = SettingValue::parse(&Value::String("five".to_string()), "integer");

		assert_eq!(value, None);
	}

	#[test]
	fn float_reads_accept_integer_rows() {
		let value =
			SettingValue::parse(&serde_json::json!(1), "integer").and_then(|v| v.as_f32());

		assert_eq!(value, Some(1.0));
	}
}
