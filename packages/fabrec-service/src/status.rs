use serde::Serialize;
use time::OffsetDateTime;

use fabrec_policy::PolicySnapshot;

use crate::{RecommendService, ServiceError, ServiceResult};

/// Freshness and rule counts for the current policy snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct PolicyStatus {
	pub generation: u64,
	pub loaded_at_unix: i64,
	pub age_secs: i64,
	pub ttl_secs: u64,
	pub stale: bool,
	pub institutions: usize,
	pub settings: usize,
	pub mappings: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
	pub policy: PolicyStatus,
	pub active_sessions: usize,
}

impl RecommendService {
	pub async fn status(&self) -> StatusResponse {
		let snapshot = self.policy.snapshot().await;
		let now = OffsetDateTime::now_utc();

		StatusResponse {
			policy: policy_status(&snapshot, now, self.policy.ttl_secs()),
			active_sessions: self.sessions.active_count(now),
		}
	}

	/// Admin-triggered reload; unlike the TTL path, a failure is surfaced.
	pub async fn reload_policy(&self) -> ServiceResult<PolicyStatus> {
		let snapshot = self
			.policy
			.force_reload()
			.await
			.map_err(|err| ServiceError::Policy { message: err.to_string() })?;

		Ok(policy_status(&snapshot, OffsetDateTime::now_utc(), self.policy.ttl_secs()))
	}
}

fn policy_status(snapshot: &PolicySnapshot, now: OffsetDateTime, ttl_secs: u64) -> PolicyStatus {
	let age_secs = (now - snapshot.loaded_at).whole_seconds().max(0);

	PolicyStatus {
		generation: snapshot.generation,
		loaded_at_unix: snapshot.loaded_at.unix_timestamp(),
		age_secs,
		ttl_secs,
		stale: age_secs as u64 > ttl_secs,
		institutions: snapshot.institutions.len(),
		settings: snapshot.settings.len(),
		mappings: snapshot.mapping.len(),
	}
}
