use std::{
	cmp::Ordering,
	collections::{BTreeMap, BTreeSet, HashMap},
};

use tokio::task::JoinSet;
use tracing::{debug, warn};

use fabrec_config::Retrieval;
use fabrec_domain::{
	equipment::EquipmentRecord,
	query::{SearchFilters, StructuredQuery},
};
use fabrec_providers::search::SearchHit;

use crate::{RecommendService, ServiceError, ServiceResult};

/// One equipment candidate flowing through the pipeline. Created here with
/// the modality scores; the filter and ranking stages attach the remaining
/// fields without ever removing one.
#[derive(Debug, Clone)]
pub struct Candidate {
	pub equipment: EquipmentRecord,
	pub lexical_score: f32,
	pub semantic_score: f32,
	pub fused_score: f32,
	pub priority_score: i32,
	pub final_score: f32,
}

impl RecommendService {
	/// Hybrid retrieval: both modalities queried concurrently, results merged
	/// under the configured weights, attributes attached from the catalog.
	pub(crate) async fn fuse(&self, query: &StructuredQuery) -> ServiceResult<Vec<Candidate>> {
		let filters = SearchFilters::from_query(query);
		let exclude_terms: Vec<String> = query.excluded_terms.iter().cloned().collect();
		let top_n = self.cfg.retrieval.top_n;
		let (lexical, semantic) = tokio::join!(
			self.providers.lexical.search(
				&self.cfg.providers.lexical,
				&query.raw_text,
				&filters,
				&exclude_terms,
				top_n,
			),
			self.providers.semantic.search(
				&self.cfg.providers.semantic,
				&query.raw_text,
				&filters,
				&exclude_terms,
				top_n,
			),
		);
		let (lexical, semantic) = reconcile_modalities(lexical, semantic)?;
		let records = self.fetch_records(&lexical, &semantic).await;

		Ok(build_candidates(lexical, semantic, records, query, &self.cfg.retrieval))
	}

	async fn fetch_records(
		&self,
		lexical: &[SearchHit],
		semantic: &[SearchHit],
	) -> HashMap<String, EquipmentRecord> {
		let ids: BTreeSet<String> =
			lexical.iter().chain(semantic).map(|hit| hit.id.clone()).collect();
		let mut lookups = JoinSet::new();

		for id in ids {
			let provider = self.providers.catalog.clone();
			let cfg = self.cfg.providers.catalog.clone();

			lookups.spawn(async move {
				let record = provider.get(&cfg, &id).await;

				(id, record)
			});
		}

		let mut records = HashMap::new();

		while let Some(joined) = lookups.join_next().await {
			let Ok((id, result)) = joined else {
				continue;
			};

			match result {
				Ok(record) => {
					records.insert(id, record);
				},
				Err(err) => {
					warn!(
						equipment_id = id.as_str(),
						error = %err,
						"Catalog lookup failed; dropping candidate."
					);
				},
			}
		}

		records
	}
}

/// Merge the union of both hit lists into scored candidates, ordered by
/// fused score with the identifier as the deterministic tie-break.
pub fn build_candidates(
	lexical: Vec<SearchHit>,
	semantic: Vec<SearchHit>,
	mut records: HashMap<String, EquipmentRecord>,
	query: &StructuredQuery,
	cfg: &Retrieval,
) -> Vec<Candidate> {
	// An identifier absent from one modality contributes zero for that term.
	let mut scores: BTreeMap<String, (f32, f32)> = BTreeMap::new();

	for hit in lexical {
		scores.entry(hit.id).or_default().0 = hit.score;
	}
	for hit in semantic {
		scores.entry(hit.id).or_default().1 = hit.score;
	}

	let mut candidates = Vec::with_capacity(scores.len());

	for (id, (lexical_score, semantic_score)) in scores {
		let Some(equipment) = records.remove(&id) else {
			continue;
		};

		if is_excluded(&equipment, &query.excluded_terms) {
			debug!(equipment_id = id.as_str(), "Candidate dropped by negation post-filter.");

			continue;
		}

		let mut fused_score =
			cfg.vector_weight * semantic_score + cfg.bm25_weight * lexical_score;

		if query
			.mapped_categories
			.iter()
			.any(|category| category.eq_ignore_ascii_case(&equipment.category))
		{
			fused_score += cfg.category_boost;
		}

		candidates.push(Candidate {
			equipment,
			lexical_score,
			semantic_score,
			fused_score,
			priority_score: 0,
			final_score: 0.0,
		});
	}

	candidates.sort_by(|a, b| {
		b.fused_score
			.partial_cmp(&a.fused_score)
			.unwrap_or(Ordering::Equal)
			.then_with(|| a.equipment.equipment_id.cmp(&b.equipment.equipment_id))
	});

	candidates
}

/// Safety net for collaborators that ignore the hard-exclusion parameter.
fn is_excluded(equipment: &EquipmentRecord, excluded_terms: &BTreeSet<String>) -> bool {
	excluded_terms.iter().any(|term| {
		let term = term.to_lowercase();

		equipment.name.to_lowercase().contains(&term)
			|| equipment.category.to_lowercase().contains(&term)
			|| equipment.materials.iter().any(|material| material.to_lowercase() == term)
	})
}

fn reconcile_modalities(
	lexical: color_eyre::Result<Vec<SearchHit>>,
	semantic: color_eyre::Result<Vec<SearchHit>>,
) -> ServiceResult<(Vec<SearchHit>, Vec<SearchHit>)> {
	match (lexical, semantic) {
		(Ok(lexical), Ok(semantic)) => Ok((lexical, semantic)),
		(Ok(lexical), Err(err)) => {
			warn!(error = %err, "Semantic search failed; degrading to lexical results only.");

			Ok((lexical, Vec::new()))
		},
		(Err(err), Ok(semantic)) => {
			warn!(error = %err, "Lexical search failed; degrading to semantic results only.");

			Ok((Vec::new(), semantic))
		},
		(Err(lexical_err), Err(semantic_err)) => Err(ServiceError::Retrieval {
			stage: "search",
			message: format!("lexical: {lexical_err}; semantic: {semantic_err}"),
		}),
	}
}
