//! # Reconciler
//!
//! Diffs the desired sources sent by the Node against the cache of sources
//! already realized by the host, and drives the host through a
//! [`SourceBackend`].
//!
//! ## Pass Structure
//!
//! 1. Empty desired list: remove everything and clear the cache.
//! 2. Removal: cached ids missing from the desired list are removed.
//! 3. Upsert, in desired order:
//!    - no cache entry, or immutable hash changed → (remove) + create;
//!    - hash unchanged → update. Unchanged sources are still updated so
//!      the host re-applies base settings every pass.
//!
//! Failures are isolated per source: one source's error never blocks the
//! others and never rolls back earlier successes. Every error returned by
//! the backend is tagged with the Node id of the source it concerns.
//!
//! ## Post-condition
//!
//! Cache keys equal the ids of desired sources whose create or update
//! succeeded in this pass.

use crate::error::{LiveLinkError, LiveLinkErrorCode};
use crate::identifier::Identifier;
use crate::livelink::{LiveLinkSource, LiveLinkSourceSettings};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// BACKEND
// =============================================================================

/// The host's resource backend.
///
/// Calls may block; the reconciler imposes no timeout.
pub trait SourceBackend {
    /// Destroy the host resource `host_id`.
    fn remove_source(&mut self, host_id: Identifier) -> Vec<LiveLinkError>;

    /// Create a host resource for `source`, returning its host id.
    fn create_source(&mut self, source: &LiveLinkSource) -> Result<Identifier, Vec<LiveLinkError>>;

    /// Re-apply the mutable settings of `source` to `host_id`.
    fn update_source(&mut self, source: &LiveLinkSource, host_id: Identifier) -> Vec<LiveLinkError>;

    /// Current base settings of `host_id`, or `None` if the host no longer
    /// has it.
    fn observe_source(&self, host_id: Identifier) -> Option<LiveLinkSourceSettings>;
}

// =============================================================================
// CACHE
// =============================================================================

/// What the Service believes about one realized source.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceCacheEntry {
    pub host_id: Identifier,
    pub immutable_settings_hash: u64,
    pub last_known_value: LiveLinkSource,
}

/// Realized sources keyed by Node id.
///
/// Not synchronized; one reconciliation at a time.
#[derive(Debug, Clone, Default)]
pub struct SourceCache {
    entries: BTreeMap<Identifier, SourceCacheEntry>,
}

impl SourceCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, id: &Identifier) -> Option<&SourceCacheEntry> {
        self.entries.get(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Node ids in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = Identifier> + '_ {
        self.entries.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Identifier, &SourceCacheEntry)> {
        self.entries.iter()
    }
}

// =============================================================================
// RECONCILIATION
// =============================================================================

fn tag_all(errors: Vec<LiveLinkError>, id: Identifier) -> impl Iterator<Item = LiveLinkError> {
    errors.into_iter().map(move |error| error.tagged(id))
}

/// Bring the backend in line with `desired`, updating `cache` to match.
///
/// Returns every backend error of the pass, in call order.
pub fn reconcile<B: SourceBackend + ?Sized>(
    cache: &mut SourceCache,
    desired: &[LiveLinkSource],
    backend: &mut B,
) -> Vec<LiveLinkError> {
    let mut errors = Vec::new();

    if desired.is_empty() {
        for (id, entry) in std::mem::take(&mut cache.entries) {
            errors.extend(tag_all(backend.remove_source(entry.host_id), id));
        }
        return errors;
    }

    // Removal pass
    let wanted: BTreeSet<Identifier> = desired.iter().filter_map(LiveLinkSource::id).collect();
    let stale: Vec<Identifier> = cache.ids().filter(|id| !wanted.contains(id)).collect();
    for id in stale {
        if let Some(entry) = cache.entries.remove(&id) {
            errors.extend(tag_all(backend.remove_source(entry.host_id), id));
        }
    }

    // Upsert pass
    for source in desired {
        let (Some(id), Some(new_hash)) = (source.id(), source.immutable_settings_hash()) else {
            errors.push(LiveLinkError::new(
                LiveLinkErrorCode::InternalError,
                "desired source list contains an empty source",
            ));
            continue;
        };

        let existing = cache
            .entries
            .get(&id)
            .map(|entry| (entry.host_id, entry.immutable_settings_hash));

        match existing {
            Some((host_id, hash)) if hash == new_hash => {
                let update_errors = backend.update_source(source, host_id);
                if update_errors.is_empty() {
                    cache.entries.insert(
                        id,
                        SourceCacheEntry {
                            host_id,
                            immutable_settings_hash: new_hash,
                            last_known_value: source.clone(),
                        },
                    );
                } else {
                    cache.entries.remove(&id);
                    errors.extend(tag_all(update_errors, id));
                }
            }
            previous => {
                if let Some((host_id, _)) = previous {
                    // Immutable settings changed: destroy before recreating
                    errors.extend(tag_all(backend.remove_source(host_id), id));
                    cache.entries.remove(&id);
                }

                match backend.create_source(source) {
                    Ok(host_id) => {
                        cache.entries.insert(
                            id,
                            SourceCacheEntry {
                                host_id,
                                immutable_settings_hash: new_hash,
                                last_known_value: source.clone(),
                            },
                        );
                    }
                    Err(create_errors) if create_errors.is_empty() => {
                        errors.push(
                            LiveLinkError::new(
                                LiveLinkErrorCode::InternalError,
                                "source creation failed without reporting an error",
                            )
                            .tagged(id),
                        );
                    }
                    Err(create_errors) => errors.extend(tag_all(create_errors, id)),
                }
            }
        }
    }

    errors
}

/// Build the status list from the cache.
///
/// Sources the backend no longer knows are pruned from the cache and left
/// out. Survivors report the backend's current base settings.
pub fn collect_status<B: SourceBackend + ?Sized>(
    cache: &mut SourceCache,
    backend: &B,
) -> Vec<LiveLinkSource> {
    let mut sources = Vec::with_capacity(cache.len());

    cache.entries.retain(|_, entry| {
        let Some(observed) = backend.observe_source(entry.host_id) else {
            return false;
        };
        if let Some(base) = entry.last_known_value.base_mut() {
            *base = observed;
        }
        sources.push(entry.last_known_value.clone());
        true
    });

    sources
}
