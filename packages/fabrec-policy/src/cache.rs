use std::{
	future::Future,
	path::PathBuf,
	pin::Pin,
	sync::{
		Arc,
		atomic::{AtomicU64, Ordering},
	},
};

use time::{Duration, OffsetDateTime};
use tokio::sync::{Mutex, RwLock};
use tracing::warn;

use fabrec_config::PolicyDefaults;

use crate::{
	snapshot::{InstitutionTable, MappingTable, PolicySnapshot, SettingsTable},
	tables::{InstitutionDocument, MappingDocument, SettingsDocument},
};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// One load generation of the three rule tables, fetched together so a
/// snapshot never mixes documents from different generations.
#[derive(Debug, Clone)]
pub struct RuleDocuments {
	pub institutions: InstitutionDocument,
	pub settings: SettingsDocument,
	pub mapping: MappingDocument,
}

pub trait RuleSource
where
	Self: Send + Sync,
{
	fn fetch<'a>(&'a self) -> BoxFuture<'a, color_eyre::Result<RuleDocuments>>;
}

/// Default rule source: three JSON documents on disk, the shape the admin
/// tooling writes.
pub struct FileRuleSource {
	pub institution_path: PathBuf,
	pub settings_path: PathBuf,
	pub mapping_path: PathBuf,
}

impl RuleSource for FileRuleSource {
	fn fetch<'a>(&'a self) -> BoxFuture<'a, color_eyre::Result<RuleDocuments>> {
		Box::pin(async move {
			let institutions = read_document::<InstitutionDocument>(&self.institution_path).await?;
			let settings = read_document::<SettingsDocument>(&self.settings_path).await?;
			let mapping = read_document::<MappingDocument>(&self.mapping_path).await?;

			Ok(RuleDocuments { institutions, settings, mapping })
		})
	}
}

async fn read_document<T>(path: &PathBuf) -> color_eyre::Result<T>
where
	T: serde::de::DeserializeOwned,
{
	let raw = tokio::fs::read_to_string(path).await?;
	let doc = serde_json::from_str(&raw)?;

	Ok(doc)
}

/// Time-bounded cache over the rule tables. Readers always get a complete
/// snapshot; a reload builds a new snapshot and swaps it in whole, and a
/// failed reload keeps serving the last good one.
pub struct PolicyCache {
	source: Arc<dyn RuleSource>,
	defaults: PolicyDefaults,
	ttl: Duration,
	current: RwLock<Arc<PolicySnapshot>>,
	reload_lock: Mutex<()>,
	generation: AtomicU64,
}

impl PolicyCache {
	/// Load the initial snapshot. A failing source is not fatal at startup:
	/// the cache starts empty and keeps retrying on expiry.
	pub async fn new(source: Arc<dyn RuleSource>, defaults: PolicyDefaults, ttl_secs: u64) -> Self {
		let cache = Self {
			source,
			defaults: defaults.clone(),
			ttl: Duration::seconds(ttl_secs as i64),
			current: RwLock::new(Arc::new(PolicySnapshot::empty(
				defaults,
				OffsetDateTime::UNIX_EPOCH,
			))),
			reload_lock: Mutex::new(()),
			generation: AtomicU64::new(0),
		};

		match cache.load().await {
			Ok(snapshot) => *cache.current.write().await = snapshot,
			Err(err) => {
				warn!(error = %err, "Initial policy load failed; starting with empty rule tables.");
			},
		}

		cache
	}

	/// Current snapshot, reloading first when the TTL has lapsed. Concurrent
	/// callers during a reload observe either the old or the new snapshot,
	/// never a mixture.
	pub async fn snapshot(&self) -> Arc<PolicySnapshot> {
		let current = self.current.read().await.clone();
		let now = OffsetDateTime::now_utc();

		if now - current.loaded_at <= self.ttl {
			return current;
		}

		let _guard = self.reload_lock.lock().await;
		// Another caller may have finished the reload while this one waited.
		let current = self.current.read().await.clone();

		if now - current.loaded_at <= self.ttl {
			return current;
		}

		match self.load().await {
			Ok(next) => {
				*self.current.write().await = next.clone();

				next
			},
			Err(err) => {
				warn!(error = %err, "Policy reload failed; serving last good snapshot.");

				current
			},
		}
	}

	/// Admin-triggered reload, bypassing the TTL. Unlike `snapshot`, a
	/// failure here is reported to the caller.
	pub async fn force_reload(&self) -> color_eyre::Result<Arc<PolicySnapshot>> {
		let _guard = self.reload_lock.lock().await;
		let next = self.load().await?;

		*self.current.write().await = next.clone();

		Ok(next)
	}

	pub fn ttl_secs(&self) -> u64 {
		self.ttl.whole_seconds().max(0) as u64
	}

	async fn load(&self) -> color_eyre::Result<Arc<PolicySnapshot>> {
		let documents = self.source.fetch().await?;
		let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
		let snapshot = PolicySnapshot {
			generation,
			loaded_at: OffsetDateTime::now_utc(),
			institutions: InstitutionTable::from_document(&documents.institutions),
			settings: SettingsTable::from_document(&documents.settings, &self.defaults),
			mapping: MappingTable::from_document(&documents.mapping),
		};

		Ok(Arc::new(snapshot))
	}
}
