use std::cmp::Ordering;

use fabrec_config::Ranking;
use fabrec_domain::query::RankPreference;
use fabrec_policy::InstitutionTable;

use crate::fusion::Candidate;

/// Sentinel priority for institutions missing from the table; sorts after
/// every known institution.
pub const UNKNOWN_INSTITUTION_PRIORITY: i32 = 999;

/// Institution-priority ordering. Position is governed by the two-key sort
/// (priority ascending, then fused score descending); the blended
/// final_score is reported as metadata, not used for ordering.
pub fn rank_candidates(
	mut candidates: Vec<Candidate>,
	institutions: &InstitutionTable,
	user_institution: Option<&str>,
	cfg: &Ranking,
	prefer: Option<RankPreference>,
) -> Vec<Candidate> {
	for candidate in &mut candidates {
		let institution = candidate.equipment.institution.as_str();
		let priority_score = if user_institution == Some(institution) {
			0
		} else {
			institutions.priority(institution).unwrap_or(UNKNOWN_INSTITUTION_PRIORITY)
		};

		candidate.priority_score = priority_score;
		candidate.final_score = candidate.fused_score * cfg.fused_weight
			+ priority_contribution(priority_score) * cfg.priority_weight;
	}

	candidates.sort_by(|a, b| {
		a.priority_score
			.cmp(&b.priority_score)
			.then_with(|| {
				b.fused_score.partial_cmp(&a.fused_score).unwrap_or(Ordering::Equal)
			})
			.then_with(|| cost_tiebreak(a, b, prefer))
			.then_with(|| a.equipment.equipment_id.cmp(&b.equipment.equipment_id))
	});

	candidates
}

/// Monotonically decreasing in priority_score, normalized to [0, 1].
fn priority_contribution(priority_score: i32) -> f32 {
	let clamped = priority_score.clamp(0, UNKNOWN_INSTITUTION_PRIORITY);

	1.0 - clamped as f32 / UNKNOWN_INSTITUTION_PRIORITY as f32
}

/// Cost ordering only applies when a comparison follow-up asked for it, and
/// only within equal (priority, fused) positions; costless candidates sort
/// last.
fn cost_tiebreak(a: &Candidate, b: &Candidate, prefer: Option<RankPreference>) -> Ordering {
	if prefer != Some(RankPreference::LowerCost) {
		return Ordering::Equal;
	}

	match (a.equipment.hourly_cost, b.equipment.hourly_cost) {
		(Some(a_cost), Some(b_cost)) => a_cost.partial_cmp(&b_cost).unwrap_or(Ordering::Equal),
		(Some(_), None) => Ordering::Less,
		(None, Some(_)) => Ordering::Greater,
		(None, None) => Ordering::Equal,
	}
}
