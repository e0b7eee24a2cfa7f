use std::sync::Arc;

use fabrec_policy::{FileRuleSource, PolicyCache};
use fabrec_service::RecommendService;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<RecommendService>,
}
impl AppState {
	pub async fn new(config: fabrec_config::Config) -> Self {
		let source = FileRuleSource {
			institution_path: config.policy.institution_path.clone(),
			settings_path: config.policy.settings_path.clone(),
			mapping_path: config.policy.mapping_path.clone(),
		};
		let policy = PolicyCache::new(
			Arc::new(source),
			config.policy.defaults.clone(),
			config.policy.cache_ttl_secs,
		)
		.await;
		let service = RecommendService::new(config, policy);

		Self { service: Arc::new(service) }
	}
}
