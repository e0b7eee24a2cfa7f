mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	CatalogProviderConfig, Config, LlmProviderConfig, Policy, PolicyDefaults, Providers, Ranking,
	Retrieval, SearchProviderConfig, Service, Session,
};

use std::{fs, path::Path};

const WEIGHT_SUM_TOLERANCE: f32 = 1e-6;

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if cfg.service.admin_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.admin_bind must be non-empty.".to_string(),
		});
	}
	if cfg.retrieval.top_n == 0 {
		return Err(Error::Validation {
			message: "retrieval.top_n must be greater than zero.".to_string(),
		});
	}

	for (label, weight) in [
		("retrieval.vector_weight", cfg.retrieval.vector_weight),
		("retrieval.bm25_weight", cfg.retrieval.bm25_weight),
		("ranking.fused_weight", cfg.ranking.fused_weight),
		("ranking.priority_weight", cfg.ranking.priority_weight),
	] {
		if !weight.is_finite() {
			return Err(Error::Validation { message: format!("{label} must be a finite number.") });
		}
		if !(0.0..=1.0).contains(&weight) {
			return Err(Error::Validation {
				message: format!("{label} must be in the range 0.0-1.0."),
			});
		}
	}

	if (cfg.retrieval.vector_weight + cfg.retrieval.bm25_weight - 1.0).abs() > WEIGHT_SUM_TOLERANCE
	{
		return Err(Error::Validation {
			message: "retrieval.vector_weight and retrieval.bm25_weight must sum to 1.0."
				.to_string(),
		});
	}
	if (cfg.ranking.fused_weight + cfg.ranking.priority_weight - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
		return Err(Error::Validation {
			message: "ranking.fused_weight and ranking.priority_weight must sum to 1.0."
				.to_string(),
		});
	}
	if !cfg.retrieval.category_boost.is_finite() || cfg.retrieval.category_boost < 0.0 {
		return Err(Error::Validation {
			message: "retrieval.category_boost must be a finite number of zero or greater."
				.to_string(),
		});
	}

	if cfg.policy.cache_ttl_secs == 0 {
		return Err(Error::Validation {
			message: "policy.cache_ttl_secs must be greater than zero.".to_string(),
		});
	}
	if cfg.policy.defaults.max_recommendations == 0 {
		return Err(Error::Validation {
			message: "policy.defaults.max_recommendations must be greater than zero.".to_string(),
		});
	}
	if !cfg.policy.defaults.min_rag_score.is_finite() {
		return Err(Error::Validation {
			message: "policy.defaults.min_rag_score must be a finite number.".to_string(),
		});
	}

	for (label, path) in [
		("policy.institution_path", &cfg.policy.institution_path),
		("policy.settings_path", &cfg.policy.settings_path),
		("policy.mapping_path", &cfg.policy.mapping_path),
	] {
		if path.as_os_str().is_empty() {
			return Err(Error::Validation { message: format!("{label} must be non-empty.") });
		}
	}

	if cfg.session.ttl_secs == 0 {
		return Err(Error::Validation {
			message: "session.ttl_secs must be greater than zero.".to_string(),
		});
	}
	if cfg.session.max_sessions == 0 {
		return Err(Error::Validation {
			message: "session.max_sessions must be greater than zero.".to_string(),
		});
	}

	for (label, key) in [
		("intent_llm", &cfg.providers.intent_llm.api_key),
		("explain_llm", &cfg.providers.explain_llm.api_key),
	] {
		if key.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("Provider {label} api_key must be non-empty."),
			});
		}
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	// URL joins are plain concatenation, so a trailing slash here would
	// produce double slashes against every provider path.
	for api_base in [
		&mut cfg.providers.lexical.api_base,
		&mut cfg.providers.semantic.api_base,
		&mut cfg.providers.catalog.api_base,
		&mut cfg.providers.intent_llm.api_base,
		&mut cfg.providers.explain_llm.api_base,
	] {
		while api_base.ends_with('/') {
			api_base.pop();
		}
	}
}
