pub mod chat;
pub mod classify;
pub mod filter;
pub mod fusion;
pub mod interpret;
pub mod rank;
pub mod status;

use std::{future::Future, pin::Pin, sync::Arc};

use serde_json::Value;

use fabrec_config::{CatalogProviderConfig, Config, LlmProviderConfig, SearchProviderConfig};
use fabrec_domain::{equipment::EquipmentRecord, intent::IntentFlags, query::SearchFilters};
use fabrec_policy::PolicyCache;
use fabrec_providers::{catalog, explain, intent, search};
use fabrec_session::SessionStore;

pub use chat::{ChatRequest, ChatResponse, RecommendedEquipment};
pub use fabrec_providers::{explain::ExplanationOutput, search::SearchHit};
pub use fusion::Candidate;
pub use status::{PolicyStatus, StatusResponse};

pub type ServiceResult<T> = Result<T, ServiceError>;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait SearchProvider
where
	Self: Send + Sync,
{
	fn search<'a>(
		&'a self,
		cfg: &'a SearchProviderConfig,
		query: &'a str,
		filters: &'a SearchFilters,
		exclude_terms: &'a [String],
		top_k: u32,
	) -> BoxFuture<'a, color_eyre::Result<Vec<SearchHit>>>;
}

pub trait CatalogProvider
where
	Self: Send + Sync,
{
	fn get<'a>(
		&'a self,
		cfg: &'a CatalogProviderConfig,
		equipment_id: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<EquipmentRecord>>;
}

pub trait IntentProvider
where
	Self: Send + Sync,
{
	fn classify<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [Value],
	) -> BoxFuture<'a, color_eyre::Result<IntentFlags>>;
}

pub trait ExplainProvider
where
	Self: Send + Sync,
{
	fn generate<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [Value],
	) -> BoxFuture<'a, color_eyre::Result<ExplanationOutput>>;
}

#[derive(Debug)]
pub enum ServiceError {
	InvalidRequest { message: String },
	Retrieval { stage: &'static str, message: String },
	Policy { message: String },
}

#[derive(Clone)]
pub struct Providers {
	pub lexical: Arc<dyn SearchProvider>,
	pub semantic: Arc<dyn SearchProvider>,
	pub catalog: Arc<dyn CatalogProvider>,
	pub intent: Arc<dyn IntentProvider>,
	pub explain: Arc<dyn ExplainProvider>,
}

pub struct RecommendService {
	pub cfg: Config,
	pub policy: PolicyCache,
	pub sessions: SessionStore,
	pub providers: Providers,
}

struct DefaultProviders;

impl std::fmt::Display for ServiceError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::InvalidRequest { message } => write!(f, "Invalid request: {message}"),
			Self::Retrieval { stage, message } => {
				write!(f, "Retrieval failed at {stage}: {message}")
			},
			Self::Policy { message } => write!(f, "Policy reload failed: {message}"),
		}
	}
}

impl std::error::Error for ServiceError {}

impl SearchProvider for DefaultProviders {
	fn search<'a>(
		&'a self,
		cfg: &'a SearchProviderConfig,
		query: &'a str,
		filters: &'a SearchFilters,
		exclude_terms: &'a [String],
		top_k: u32,
	) -> BoxFuture<'a, color_eyre::Result<Vec<SearchHit>>> {
		Box::pin(search::search(cfg, query, filters, exclude_terms, top_k))
	}
}

impl CatalogProvider for DefaultProviders {
	fn get<'a>(
		&'a self,
		cfg: &'a CatalogProviderConfig,
		equipment_id: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<EquipmentRecord>> {
		Box::pin(catalog::get(cfg, equipment_id))
	}
}

impl IntentProvider for DefaultProviders {
	fn classify<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [Value],
	) -> BoxFuture<'a, color_eyre::Result<IntentFlags>> {
		Box::pin(intent::classify(cfg, messages))
	}
}

impl ExplainProvider for DefaultProviders {
	fn generate<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [Value],
	) -> BoxFuture<'a, color_eyre::Result<ExplanationOutput>> {
		Box::pin(explain::generate(cfg, messages))
	}
}

impl Providers {
	pub fn new(
		lexical: Arc<dyn SearchProvider>,
		semantic: Arc<dyn SearchProvider>,
		catalog: Arc<dyn CatalogProvider>,
		intent: Arc<dyn IntentProvider>,
		explain: Arc<dyn ExplainProvider>,
	) -> Self {
		Self { lexical, semantic, catalog, intent, explain }
	}
}

impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);

		Self {
			lexical: provider.clone(),
			semantic: provider.clone(),
			catalog: provider.clone(),
			intent: provider.clone(),
			explain: provider,
		}
	}
}

impl RecommendService {
	pub fn new(cfg: Config, policy: PolicyCache) -> Self {
		let sessions = SessionStore::new(cfg.session.ttl_secs, cfg.session.max_sessions);

		Self { cfg, policy, sessions, providers: Providers::default() }
	}

	pub fn with_providers(cfg: Config, policy: PolicyCache, providers: Providers) -> Self {
		let sessions = SessionStore::new(cfg.session.ttl_secs, cfg.session.max_sessions);

		Self { cfg, policy, sessions, providers }
	}
}
