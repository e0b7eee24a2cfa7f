pub mod reconcile;

use std::sync::Arc;

use dashmap::DashMap;
use time::{Duration, OffsetDateTime};
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use fabrec_domain::query::StructuredQuery;

pub use reconcile::{FollowupKind, TurnClass, classify_turn, detect_followup, merge_turn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
	New,
	Active,
	Expired,
}

/// Accumulated conversation state for one session. Mutated only under the
/// store's per-session mutex, and only after a turn's pipeline has finished.
#[derive(Debug, Clone)]
pub struct ConversationSession {
	pub session_id: String,
	pub state: SessionState,
	pub turn_count: u32,
	pub accumulated: Option<StructuredQuery>,
	pub last_recommended: Vec<String>,
	pub created_at: OffsetDateTime,
	pub last_active: OffsetDateTime,
}

impl ConversationSession {
	fn start(session_id: String, now: OffsetDateTime) -> Self {
		Self {
			session_id,
			state: SessionState::New,
			turn_count: 0,
			accumulated: None,
			last_recommended: Vec::new(),
			created_at: now,
			last_active: now,
		}
	}

	/// Record a completed turn. A cancelled or failed turn never reaches
	/// this, so the accumulated state stays at the last successful turn.
	pub fn commit_turn(
		&mut self,
		merged: StructuredQuery,
		recommended: Vec<String>,
		now: OffsetDateTime,
	) {
		self.state = SessionState::Active;
		self.accumulated = Some(merged);
		self.last_recommended = recommended;
		self.last_active = now;
		self.turn_count += 1;
	}
}

pub type SessionHandle = Arc<Mutex<ConversationSession>>;

/// In-process session store. Turns against the same session serialize on the
/// per-session mutex; distinct sessions run fully in parallel on the shard
/// map. Idle sessions past the TTL behave as if absent.
pub struct SessionStore {
	sessions: DashMap<String, SessionHandle>,
	ttl: Duration,
	max_sessions: usize,
}

impl SessionStore {
	pub fn new(ttl_secs: u64, max_sessions: usize) -> Self {
		Self {
			sessions: DashMap::new(),
			ttl: Duration::seconds(ttl_secs as i64),
			max_sessions,
		}
	}

	/// Resolve a requested session id to a live session, creating a fresh one
	/// when the id is absent, unknown, or expired. Returns the effective id
	/// and the handle to lock for the turn.
	pub fn get_or_create(
		&self,
		requested: Option<&str>,
		now: OffsetDateTime,
	) -> (String, SessionHandle) {
		if let Some(session_id) = requested
			&& let Some(handle) = self.live_handle(session_id, now)
		{
			return (session_id.to_string(), handle);
		}

		let session_id = Uuid::new_v4().to_string();
		let handle = Arc::new(Mutex::new(ConversationSession::start(session_id.clone(), now)));

		self.sessions.insert(session_id.clone(), handle.clone());
		self.enforce_capacity(now);

		(session_id, handle)
	}

	/// Sessions that have not idled past the TTL.
	pub fn active_count(&self, now: OffsetDateTime) -> usize {
		self.sessions
			.iter()
			.filter(|entry| {
				entry
					.value()
					.try_lock()
					.map(|session| now - session.last_active <= self.ttl)
					// A locked session has a turn in flight.
					.unwrap_or(true)
			})
			.count()
	}

	fn live_handle(&self, session_id: &str, now: OffsetDateTime) -> Option<SessionHandle> {
		let handle = self.sessions.get(session_id)?.value().clone();

		// A held lock means a concurrent turn, so the session is live.
		let expired = handle
			.try_lock()
			.map(|mut session| {
				if now - session.last_active > self.ttl {
					session.state = SessionState::Expired;

					true
				} else {
					false
				}
			})
			.unwrap_or(false);

		if expired {
			self.sessions.remove(session_id);
			debug!(session_id, "Session expired; a fresh session will be created.");

			return None;
		}

		Some(handle)
	}

	fn enforce_capacity(&self, now: OffsetDateTime) {
		if self.sessions.len() <= self.max_sessions {
			return;
		}

		let expired: Vec<String> = self
			.sessions
			.iter()
			.filter(|entry| {
				entry
					.value()
					.try_lock()
					.map(|session| now - session.last_active > self.ttl)
					.unwrap_or(false)
			})
			.map(|entry| entry.key().clone())
			.collect();

		for session_id in expired {
			self.sessions.remove(&session_id);
		}

		// Still over capacity: drop the longest-idle sessions, skipping any
		// with a turn in flight.
		while self.sessions.len() > self.max_sessions {
			let oldest = self
				.sessions
				.iter()
				.filter_map(|entry| {
					entry
						.value()
						.try_lock()
						.map(|session| (entry.key().clone(), session.last_active))
						.ok()
				})
				.min_by_key(|(_, last_active)| *last_active);

			let Some((session_id, _)) = oldest else {
				break;
			};

			self.sessions.remove(&session_id);
			debug!(session_id, "Session evicted to stay within capacity.");
		}
	}
}
