use time::{Duration, OffsetDateTime};

use fabrec_domain::{
	intent::IntentFlags,
	query::{RankPreference, StructuredQuery},
};
use fabrec_session::{
	FollowupKind, SessionState, SessionStore, TurnClass, classify_turn, detect_followup,
	merge_turn,
};

fn query_with_category(raw_text: &str, category: &str) -> StructuredQuery {
	let mut query = StructuredQuery { raw_text: raw_text.to_string(), ..Default::default() };

	query.mapped_categories.push(category.to_string());
	query.category_hints.insert(category.to_string());

	query
}

fn query_with_wafer(raw_text: &str, wafer: &str) -> StructuredQuery {
	let mut query = StructuredQuery { raw_text: raw_text.to_string(), ..Default::default() };

	query.wafer_sizes.insert(wafer.to_string());

	query
}

#[test]
fn detects_condition_replace_followup() {
	assert_eq!(detect_followup("6인치로 바꿔줘"), Some(FollowupKind::ConditionReplace));
}

#[test]
fn detects_comparison_followup() {
	assert_eq!(detect_followup("더 싼 장비는?"), Some(FollowupKind::Comparison));
	assert_eq!(detect_followup("any cheaper option?"), Some(FollowupKind::Comparison));
}

#[test]
fn plain_requests_are_not_followups() {
	assert_eq!(detect_followup("MOCVD 장비 추천해줘"), None);
}

#[test]
fn first_turn_is_always_fresh() {
	let parsed = query_with_category("MOCVD 장비 추천해줘", "MOCVD");
	let class = classify_turn(&parsed, &IntentFlags::default(), None, None);

	assert_eq!(class, TurnClass::Fresh);
}

#[test]
fn respecified_hard_attributes_replace() {
	let accumulated = query_with_category("MOCVD 장비 추천해줘", "MOCVD");
	let parsed = query_with_wafer("6인치로 바꿔줘", "6 inch");
	let class = classify_turn(
		&parsed,
		&IntentFlags::default(),
		detect_followup(&parsed.raw_text),
		Some(&accumulated),
	);

	assert_eq!(class, TurnClass::Replace);
}

#[test]
fn replace_overwrites_only_respecified_fields() {
	let accumulated = query_with_category("MOCVD 장비 추천해줘", "MOCVD");
	let parsed = query_with_wafer("6인치로 바꿔줘", "6 inch");
	let merged = merge_turn(TurnClass::Replace, parsed, Some(&accumulated));

	assert!(merged.wafer_sizes.contains("6 inch"));
	assert_eq!(merged.mapped_categories, vec!["MOCVD".to_string()]);
	assert!(merged.raw_text.contains("MOCVD"));
	assert!(merged.raw_text.contains("6인치"));
}

#[test]
fn bare_followup_carries_accumulated_state_over() {
	let accumulated = query_with_category("MOCVD 장비 추천해줘", "MOCVD");
	let parsed = StructuredQuery { raw_text: "더 싼 장비는?".to_string(), ..Default::default() };
	let class = classify_turn(
		&parsed,
		&IntentFlags::default(),
		detect_followup(&parsed.raw_text),
		Some(&accumulated),
	);

	assert_eq!(class, TurnClass::CarryOver { prefer: Some(RankPreference::LowerCost) });

	let merged = merge_turn(class, parsed, Some(&accumulated));

	assert_eq!(merged.mapped_categories, vec!["MOCVD".to_string()]);
	assert_eq!(merged.raw_text, "MOCVD 장비 추천해줘");
	assert_eq!(merged.prefer, Some(RankPreference::LowerCost));
}

#[test]
fn abstract_turns_keep_conversation_context() {
	let accumulated = query_with_category("MOCVD 장비 추천해줘", "MOCVD");
	let parsed =
		StructuredQuery { raw_text: "이런 상황에서 쓸 만한 게 있을까".to_string(), ..Default::default() };
	let intent = IntentFlags { is_abstract: true, ..Default::default() };
	let class = classify_turn(&parsed, &intent, None, Some(&accumulated));

	assert_eq!(class, TurnClass::CarryOver { prefer: None });
}

#[test]
fn non_followup_without_attributes_starts_fresh() {
	let accumulated = query_with_category("MOCVD 장비 추천해줘", "MOCVD");
	let parsed =
		StructuredQuery { raw_text: "예약은 어떻게 하나요".to_string(), ..Default::default() };
	let class = classify_turn(
		&parsed,
		&IntentFlags::default(),
		detect_followup(&parsed.raw_text),
		Some(&accumulated),
	);

	assert_eq!(class, TurnClass::Fresh);
}

#[tokio::test]
async fn store_reuses_live_sessions() {
	let store = SessionStore::new(3_600, 10);
	let now = OffsetDateTime::now_utc();
	let (session_id, handle) = store.get_or_create(None, now);

	{
		let mut session = handle.lock().await;

		assert_eq!(session.state, SessionState::New);
		session.commit_turn(
			query_with_category("MOCVD 장비 추천해줘", "MOCVD"),
			vec!["EQ-1".to_string()],
			now,
		);
	}

	let (resolved_id, handle) = store.get_or_create(Some(&session_id), now);

	assert_eq!(resolved_id, session_id);

	let session = handle.lock().await;

	assert_eq!(session.state, SessionState::Active);
	assert_eq!(session.turn_count, 1);
	assert_eq!(session.last_recommended, vec!["EQ-1".to_string()]);
}

#[tokio::test]
async fn expired_sessions_behave_as_absent() {
	let store = SessionStore::new(60, 10);
	let created = OffsetDateTime::now_utc() - Duration::seconds(120);
	let (session_id, handle) = store.get_or_create(None, created);

	{
		let mut session = handle.lock().await;

		session.commit_turn(
			query_with_category("MOCVD 장비 추천해줘", "MOCVD"),
			Vec::new(),
			created,
		);
	}

	let now = OffsetDateTime::now_utc();
	let (resolved_id, handle) = store.get_or_create(Some(&session_id), now);

	assert_ne!(resolved_id, session_id);

	let session = handle.lock().await;

	assert_eq!(session.state, SessionState::New);
	assert!(session.accumulated.is_none());
}

#[tokio::test]
async fn unknown_session_ids_start_fresh() {
	let store = SessionStore::new(3_600, 10);
	let now = OffsetDateTime::now_utc();
	let (resolved_id, _) = store.get_or_create(Some("no-such-session"), now);

	assert_ne!(resolved_id, "no-such-session");
}

#[tokio::test]
async fn store_evicts_longest_idle_session_over_capacity() {
	let store = SessionStore::new(3_600, 2);
	let base = OffsetDateTime::now_utc();
	let (oldest_id, _) = store.get_or_create(None, base - Duration::seconds(30));
	let (newer_id, _) = store.get_or_create(None, base - Duration::seconds(10));
	let (newest_id, _) = store.get_or_create(None, base);

	// The newer two survive; the oldest idle session is gone.
	let (resolved, _) = store.get_or_create(Some(&newer_id), base);

	assert_eq!(resolved, newer_id);

	let (resolved, _) = store.get_or_create(Some(&newest_id), base);

	assert_eq!(resolved, newest_id);

	let (resolved, _) = store.get_or_create(Some(&oldest_id), base);

	assert_ne!(resolved, oldest_id);
}
