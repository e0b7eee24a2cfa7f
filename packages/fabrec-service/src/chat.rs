use std::{collections::HashMap, time::Instant};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use tracing::{debug, warn};

use fabrec_domain::query::LogicalMode;
use fabrec_session::{classify_turn, detect_followup, merge_turn};

use crate::{
	RecommendService, ServiceError, ServiceResult, filter, fusion::Candidate, interpret, rank,
};

const MAX_TOP_K: u32 = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
	pub query: String,
	#[serde(default)]
	pub session_id: Option<String>,
	#[serde(default)]
	pub user_institution: Option<String>,
	#[serde(default)]
	pub top_k: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendedEquipment {
	pub equipment_id: String,
	pub name: String,
	pub category: String,
	pub score: f32,
	pub reason: String,
	pub institution: String,
	pub wafer_sizes: Vec<String>,
	pub materials: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
	pub query: String,
	pub recommendations: Vec<RecommendedEquipment>,
	pub explanation: String,
	pub retryable_explanation: bool,
	pub processing_time: f64,
	pub session_id: String,
	pub turn_count: u32,
}

impl RecommendService {
	/// One conversational turn through the full pipeline: session
	/// reconciliation, interpretation, intent classification, retrieval
	/// fusion, policy filtering, priority ranking, cap, explanation. Session
	/// state is committed only after everything above has succeeded, so a
	/// cancelled or failed turn leaves the conversation untouched.
	pub async fn chat(&self, req: ChatRequest) -> ServiceResult<ChatResponse> {
		let started = Instant::now();
		let query_text = req.query.trim().to_string();

		if query_text.is_empty() {
			return Err(ServiceError::InvalidRequest {
				message: "query must be non-empty.".to_string(),
			});
		}
		if let Some(top_k) = req.top_k
			&& !(1..=MAX_TOP_K).contains(&top_k)
		{
			return Err(ServiceError::InvalidRequest {
				message: format!("top_k must be between 1 and {MAX_TOP_K}."),
			});
		}

		let policy = self.policy.snapshot().await;
		let now = OffsetDateTime::now_utc();
		let (session_id, handle) = self.sessions.get_or_create(req.session_id.as_deref(), now);
		// Turns against the same session serialize here; other sessions
		// proceed in parallel.
		let mut session = handle.lock().await;

		let mut parsed = interpret::interpret(&query_text, &policy);

		parsed.session_id = Some(session_id.clone());

		let intent = self.classify_intent(&query_text).await;

		if intent.is_compound_or {
			parsed.logical_mode = LogicalMode::Or;
		}

		parsed.excluded_terms.extend(intent.negated_terms.iter().cloned());

		let followup = detect_followup(&query_text);
		let class = classify_turn(&parsed, &intent, followup, session.accumulated.as_ref());
		let merged = merge_turn(class, parsed, session.accumulated.as_ref());

		debug!(?class, session_id = session_id.as_str(), "Turn reconciled.");

		let candidates = self.fuse(&merged).await?;
		let fused_count = candidates.len();
		let filtered = filter::apply_policy_filters(candidates, &policy.settings);
		let filtered_count = filtered.len();
		let mut ranked = rank::rank_candidates(
			filtered,
			&policy.institutions,
			req.user_institution.as_deref(),
			&self.cfg.ranking,
			merged.prefer,
		);

		// The cap is the pipeline's final step, after ranking, so priority
		// ordering is computed over the full filtered set.
		let cap = policy.settings.max_recommendations();
		let cap = req.top_k.map(|top_k| (top_k as usize).min(cap)).unwrap_or(cap);

		ranked.truncate(cap);
		debug!(
			fused = fused_count,
			filtered = filtered_count,
			returned = ranked.len(),
			"Pipeline stage counts."
		);

		let (explanation, reasons, retryable_explanation) =
			self.generate_explanation(&query_text, &ranked).await;
		let recommendations: Vec<RecommendedEquipment> = ranked
			.iter()
			.map(|candidate| {
				let equipment = &candidate.equipment;
				let reason = reasons
					.get(&equipment.equipment_id)
					.cloned()
					.unwrap_or_else(|| fallback_reason(&equipment.category));

				RecommendedEquipment {
					equipment_id: equipment.equipment_id.clone(),
					name: equipment.name.clone(),
					category: equipment.category.clone(),
					score: round2(candidate.final_score),
					reason,
					institution: equipment.institution.clone(),
					wafer_sizes: equipment.wafer_sizes.clone(),
					materials: equipment.materials.clone(),
				}
			})
			.collect();
		let recommended_ids: Vec<String> =
			recommendations.iter().map(|rec| rec.equipment_id.clone()).collect();

		session.commit_turn(merged, recommended_ids, OffsetDateTime::now_utc());

		Ok(ChatResponse {
			query: req.query,
			recommendations,
			explanation,
			retryable_explanation,
			processing_time: round2_f64(started.elapsed().as_secs_f64()),
			session_id,
			turn_count: session.turn_count,
		})
	}

	/// Explanation generation degrades rather than failing the turn: on
	/// collaborator failure the recommendations go out with fallback reasons
	/// and the retryable flag set.
	async fn generate_explanation(
		&self,
		query: &str,
		ranked: &[Candidate],
	) -> (String, HashMap<String, String>, bool) {
		if ranked.is_empty() {
			return (
				"No equipment matched the requested conditions; try relaxing a constraint."
					.to_string(),
				HashMap::new(),
				false,
			);
		}

		let messages = build_explanation_messages(query, ranked);

		match self.providers.explain.generate(&self.cfg.providers.explain_llm, &messages).await {
			Ok(output) => {
				let reasons = output
					.recommendations
					.into_iter()
					.map(|reason| (reason.equipment_id, reason.reason))
					.collect();

				(output.explanation, reasons, false)
			},
			Err(err) => {
				warn!(error = %err, "Explanation generation failed; returning recommendations without one.");

				(String::new(), HashMap::new(), true)
			},
		}
	}
}

fn build_explanation_messages(query: &str, ranked: &[Candidate]) -> Vec<Value> {
	let context = format_equipment_context(ranked);
	let system_prompt = "You are the recommendation writer for a fab equipment search system. \
Output must be valid JSON only, matching: {\"recommendations\": [{\"equipment_id\": \"...\", \
\"reason\": \"...\"}], \"explanation\": \"...\"}. Reference only the listed equipment, keep \
each reason to one sentence, and answer in the user's language.";
	let user_prompt = format!(
		"User query: {query}\n\nRanked equipment:\n{context}\nWrite one reason per equipment and an overall explanation."
	);

	vec![
		serde_json::json!({ "role": "system", "content": system_prompt }),
		serde_json::json!({ "role": "user", "content": user_prompt }),
	]
}

fn format_equipment_context(ranked: &[Candidate]) -> String {
	let mut out = String::new();

	for candidate in ranked {
		let equipment = &candidate.equipment;
		let temperature = match (equipment.temp_min, equipment.temp_max) {
			(Some(low), Some(high)) => format!("{low}~{high}C"),
			(Some(low), None) => format!("{low}C and above"),
			(None, Some(high)) => format!("up to {high}C"),
			(None, None) => "-".to_string(),
		};

		out.push_str(&format!(
			"[{id}] {name}\n- category: {category}\n- wafer sizes: {wafers}\n- materials: {materials}\n- temperature: {temperature}\n- institution: {institution}\n",
			id = equipment.equipment_id,
			name = equipment.name,
			category = equipment.category,
			wafers = equipment.wafer_sizes.join(", "),
			materials = equipment.materials.join(", "),
			temperature = temperature,
			institution = equipment.institution,
		));
	}

	out
}

fn fallback_reason(category: &str) -> String {
	format!("{category} equipment matching the requested process conditions.")
}

fn round2(value: f32) -> f32 {
	(value * 100.0).round() / 100.0
}

fn round2_f64(value: f64) -> f64 {
	(value * 100.0).round() / 100.0
}
