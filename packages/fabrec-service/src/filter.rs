use tracing::debug;

use fabrec_policy::SettingsTable;

use crate::fusion::Candidate;

/// The ordered business-rule chain: maintenance exclusion, visibility,
/// minimum fused score. The result cap is NOT applied here; it is enforced
/// after ranking so priority ordering is computed over the full filtered
/// set.
pub fn apply_policy_filters(
	candidates: Vec<Candidate>,
	settings: &SettingsTable,
) -> Vec<Candidate> {
	let mut result = candidates;

	if settings.maintenance_exclude() {
		let before = result.len();

		result.retain(|candidate| !candidate.equipment.is_maintenance);
		log_dropped("maintenance_exclude", before, result.len());
	}

	if !settings.external_visible() {
		let before = result.len();

		result.retain(|candidate| candidate.equipment.is_internal);
		log_dropped("external_visible", before, result.len());
	}

	let min_score = settings.min_rag_score();
	let before = result.len();

	result.retain(|candidate| candidate.fused_score >= min_score);
	log_dropped("min_rag_score", before, result.len());

	result
}

fn log_dropped(rule: &'static str, before: usize, after: usize) {
	if before != after {
		debug!(rule, dropped = before - after, remaining = after, "Policy filter dropped candidates.");
	}
}
