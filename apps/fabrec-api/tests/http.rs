use std::{collections::HashMap, path::PathBuf, sync::Arc};

use axum::{
	body::{self, Body},
	http::{Request, StatusCode},
};
use serde_json::{Map, Value};
use tower::util::ServiceExt;

use fabrec_api::{routes, state::AppState};
use fabrec_config::{
	CatalogProviderConfig, Config, LlmProviderConfig, Policy, PolicyDefaults,
	Providers as ProviderConfigs, Ranking, Retrieval, SearchProviderConfig, Service, Session,
};
use fabrec_domain::{equipment::EquipmentRecord, intent::IntentFlags, query::SearchFilters};
use fabrec_policy::{PolicyCache, RuleDocuments, RuleSource};
use fabrec_providers::{explain::ExplanationOutput, search::SearchHit};
use fabrec_service::{
	BoxFuture, CatalogProvider, ExplainProvider, IntentProvider, Providers, RecommendService,
	SearchProvider,
};

fn test_config() -> Config {
	let search = |provider_id: &str| SearchProviderConfig {
		provider_id: provider_id.to_string(),
		api_base: "http://localhost".to_string(),
		api_key: String::new(),
		path: "/search".to_string(),
		timeout_ms: 1_000,
		default_headers: Map::new(),
	};
	let llm = |model: &str| LlmProviderConfig {
		provider_id: "test-llm".to_string(),
		api_base: "http://localhost".to_string(),
		api_key: "key".to_string(),
		path: "/v1/chat/completions".to_string(),
		model: model.to_string(),
		temperature: 0.1,
		timeout_ms: 1_000,
		default_headers: Map::new(),
	};

	Config {
		service: Service {
			http_bind: "127.0.0.1:0".to_string(),
			admin_bind: "127.0.0.1:0".to_string(),
			log_level: "info".to_string(),
		},
		providers: ProviderConfigs {
			lexical: search("lexical-test"),
			semantic: search("semantic-test"),
			catalog: CatalogProviderConfig {
				provider_id: "catalog-test".to_string(),
				api_base: "http://localhost".to_string(),
				api_key: String::new(),
				path: "/v1/equipment".to_string(),
				timeout_ms: 1_000,
				default_headers: Map::new(),
			},
			intent_llm: llm("intent"),
			explain_llm: llm("explain"),
		},
		retrieval: Retrieval::default(),
		ranking: Ranking::default(),
		policy: Policy {
			institution_path: PathBuf::from("unused"),
			settings_path: PathBuf::from("unused"),
			mapping_path: PathBuf::from("unused"),
			cache_ttl_secs: 300,
			defaults: PolicyDefaults {
				maintenance_exclude: true,
				external_visible: true,
				min_rag_score: 0.0,
				max_recommendations: 5,
			},
		},
		session: Session::default(),
	}
}

struct StaticSource;

impl RuleSource for StaticSource {
	fn fetch<'a>(
		&'a self,
	) -> fabrec_policy::cache::BoxFuture<'a, color_eyre::Result<RuleDocuments>> {
		Box::pin(async move {
			let institutions = serde_json::from_value(serde_json::json!({
				"version": 1,
				"updated_at": "2025-06-01T00:00:00Z",
				"institutions": [
					{ "id": "KANC", "name": "한국나노기술원", "priority": 1, "is_active": true }
				]
			}))?;
			let settings = serde_json::from_value(serde_json::json!({
				"version": 1,
				"updated_at": "2025-06-01T00:00:00Z",
				"policies": [
					{ "key": "maintenance_exclude", "value": true, "type": "boolean" }
				]
			}))?;
			let mapping = serde_json::from_value(serde_json::json!({
				"version": 1,
				"updated_at": "2025-06-01T00:00:00Z",
				"mappings": [
					{ "keyword": "에피 성장", "categories": ["MOCVD", "MBE"] }
				],
				"exact_matches": ["mocvd"]
			}))?;

			Ok(RuleDocuments { institutions, settings, mapping })
		})
	}
}

struct StaticSearch {
	hits: Vec<SearchHit>,
}

impl SearchProvider for StaticSearch {
	fn search<'a>(
		&'a self,
		_cfg: &'a SearchProviderConfig,
		_query: &'a str,
		_filters: &'a SearchFilters,
		_exclude_terms: &'a [String],
		_top_k: u32,
	) -> BoxFuture<'a, color_eyre::Result<Vec<SearchHit>>> {
		let hits = self.hits.clone();

		Box::pin(async move { Ok(hits) })
	}
}

struct StaticCatalog {
	records: HashMap<String, EquipmentRecord>,
}

impl CatalogProvider for StaticCatalog {
	fn get<'a>(
		&'a self,
		_cfg: &'a CatalogProviderConfig,
		equipment_id: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<EquipmentRecord>> {
		let record = self.records.get(equipment_id).cloned();

		Box::pin(async move {
			record.ok_or_else(|| color_eyre::eyre::eyre!("unknown equipment id"))
		})
	}
}

struct StaticIntent;

impl IntentProvider for StaticIntent {
	fn classify<'a>(
		&'a self,
		_cfg: &'a LlmProviderConfig,
		_messages: &'a [Value],
	) -> BoxFuture<'a, color_eyre::Result<IntentFlags>> {
		Box::pin(async move { Ok(IntentFlags::default()) })
	}
}

struct StaticExplain;

impl ExplainProvider for StaticExplain {
	fn generate<'a>(
		&'a self,
		_cfg: &'a LlmProviderConfig,
		_messages: &'a [Value],
	) -> BoxFuture<'a, color_eyre::Result<ExplanationOutput>> {
		Box::pin(async move { Ok(ExplanationOutput::default()) })
	}
}

async fn test_state() -> AppState {
	let mut records = HashMap::new();

	records.insert(
		"EQ-MOCVD-1".to_string(),
		EquipmentRecord {
			equipment_id: "EQ-MOCVD-1".to_string(),
			name: "MOCVD System A".to_string(),
			category: "MOCVD".to_string(),
			institution: "KANC".to_string(),
			wafer_sizes: vec!["4 inch".to_string(), "6 inch".to_string()],
			materials: vec!["GaN".to_string()],
			temp_min: Some(400.0),
			temp_max: Some(1_200.0),
			hourly_cost: None,
			is_maintenance: false,
			is_internal: true,
		},
	);

	let providers = Providers::new(
		Arc::new(StaticSearch {
			hits: vec![SearchHit { id: "EQ-MOCVD-1".to_string(), score: 0.8 }],
		}),
		Arc::new(StaticSearch {
			hits: vec![SearchHit { id: "EQ-MOCVD-1".to_string(), score: 0.9 }],
		}),
		Arc::new(StaticCatalog { records }),
		Arc::new(StaticIntent),
		Arc::new(StaticExplain),
	);
	let policy = PolicyCache::new(
		Arc::new(StaticSource),
		test_config().policy.defaults.clone(),
		300,
	)
	.await;
	let service = RecommendService::with_providers(test_config(), policy, providers);

	AppState { service: Arc::new(service) }
}

async fn response_json(response: axum::response::Response) -> Value {
	let bytes = body::to_bytes(response.into_body(), usize::MAX)
		.await
		.expect("Failed to read response body.");

	serde_json::from_slice(&bytes).expect("Response body must be JSON.")
}

#[tokio::test]
async fn health_returns_ok() {
	let app = routes::router(test_state().await);
	let response = app
		.oneshot(Request::builder().uri("/health").body(Body::empty()).expect("request"))
		.await
		.expect("Request must succeed.");

	assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn chat_round_trips_through_the_router() {
	let app = routes::router(test_state().await);
	let payload = serde_json::json!({ "query": "6인치 GaN 에피 성장 장비 추천해줘" });
	let request = Request::builder()
		.method("POST")
		.uri("/v1/chat")
		.header("content-type", "application/json")
		.body(Body::from(payload.to_string()))
		.expect("request");
	let response = app.oneshot(request).await.expect("Request must succeed.");

	assert_eq!(response.status(), StatusCode::OK);

	let json = response_json(response).await;

	assert_eq!(json["turn_count"], 1);
	assert!(json["session_id"].as_str().map(|id| !id.is_empty()).unwrap_or(false));
	assert_eq!(json["recommendations"][0]["equipment_id"], "EQ-MOCVD-1");
}

#[tokio::test]
async fn blank_chat_query_is_a_bad_request() {
	let app = routes::router(test_state().await);
	let payload = serde_json::json!({ "query": "   " });
	let request = Request::builder()
		.method("POST")
		.uri("/v1/chat")
		.header("content-type", "application/json")
		.body(Body::from(payload.to_string()))
		.expect("request");
	let response = app.oneshot(request).await.expect("Request must succeed.");

	assert_eq!(response.status(), StatusCode::BAD_REQUEST);

	let json = response_json(response).await;

	assert_eq!(json["error_code"], "invalid_request");
}

#[tokio::test]
async fn status_reports_rule_counts() {
	let app = routes::router(test_state().await);
	let response = app
		.oneshot(Request::builder().uri("/v1/status").body(Body::empty()).expect("request"))
		.await
		.expect("Request must succeed.");

	assert_eq!(response.status(), StatusCode::OK);

	let json = response_json(response).await;

	assert_eq!(json["policy"]["institutions"], 1);
	assert_eq!(json["policy"]["stale"], false);
}

#[tokio::test]
async fn admin_reload_returns_fresh_policy_status() {
	let app = routes::admin_router(test_state().await);
	let request = Request::builder()
		.method("POST")
		.uri("/v1/admin/policy/reload")
		.body(Body::empty())
		.expect("request");
	let response = app.oneshot(request).await.expect("Request must succeed.");

	assert_eq!(response.status(), StatusCode::OK);

	let json = response_json(response).await;

	assert_eq!(json["generation"], 2);
	assert_eq!(json["settings"], 1);
}
