use std::path::PathBuf;

use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub providers: Providers,
	#[serde(default)]
	pub retrieval: Retrieval,
	#[serde(default)]
	pub ranking: Ranking,
	pub policy: Policy,
	#[serde(default)]
	pub session: Session,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub admin_bind: String,
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub lexical: SearchProviderConfig,
	pub semantic: SearchProviderConfig,
	pub catalog: CatalogProviderConfig,
	pub intent_llm: LlmProviderConfig,
	pub explain_llm: LlmProviderConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	#[serde(default)]
	pub api_key: String,
	pub path: String,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	#[serde(default)]
	pub api_key: String,
	pub path: String,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct Retrieval {
	#[serde(default = "default_top_n")]
	pub top_n: u32,
	#[serde(default = "default_search_weight")]
	pub vector_weight: f32,
	#[serde(default = "default_search_weight")]
	pub bm25_weight: f32,
	#[serde(default = "default_category_boost")]
	pub category_boost: f32,
}

#[derive(Debug, Deserialize)]
pub struct Ranking {
	#[serde(default = "default_fused_weight")]
	pub fused_weight: f32,
	#[serde(default = "default_priority_weight")]
	pub priority_weight: f32,
}

#[derive(Debug, Deserialize)]
pub struct Policy {
	pub institution_path: PathBuf,
	pub settings_path: PathBuf,
	pub mapping_path: PathBuf,
	#[serde(default = "default_policy_ttl_secs")]
	pub cache_ttl_secs: u64,
	pub defaults: PolicyDefaults,
}

/// Fallback values used when a settings-table row is missing or malformed.
#[derive(Debug, Clone, Deserialize)]
pub struct PolicyDefaults {
	pub maintenance_exclude: bool,
	pub external_visible: bool,
	pub min_rag_score: f32,
	pub max_recommendations: u32,
}

#[derive(Debug, Deserialize)]
pub struct Session {
	#[serde(default = "default_session_ttl_secs")]
	pub ttl_secs: u64,
	#[serde(default = "default_max_sessions")]
	pub max_sessions: usize,
}

impl Default for Retrieval {
	fn default() -> Self {
		Self {
			top_n: default_top_n(),
			vector_weight: default_search_weight(),
			bm25_weight: default_search_weight(),
			category_boost: default_category_boost(),
		}
	}
}

impl Default for Ranking {
	fn default() -> Self {
		Self { fused_weight: default_fused_weight(), priority_weight: default_priority_weight() }
	}
}

impl Default for Session {
	fn default() -> Self {
		Self { ttl_secs: default_session_ttl_secs(), max_sessions: default_max_sessions() }
	}
}

fn default_top_n() -> u32 {
	20
}

fn default_search_weight() -> f32 {
	0.5
}

fn default_category_boost() -> f32 {
	0.2
}

fn default_fused_weight() -> f32 {
	0.7
}

fn default_priority_weight() -> f32 {
	0.3
}

fn default_policy_ttl_secs() -> u64 {
	300
}

fn default_session_ttl_secs() -> u64 {
	3_600
}

fn default_max_sessions() -> usize {
	1_000
}
