//! # In-Memory Backend
//!
//! A [`SourceBackend`] that simulates the host's LiveLink sources.
//!
//! - Host ids are random identifiers.
//! - Kinds whose plugin is not enabled fail with `PluginNotEnabled`.
//! - Virtual subject and message bus sources cannot be created
//!   (`Unimplemented`).
//! - Removing or updating an unknown host id fails with
//!   `SourceDoesNotExist`.

use std::collections::{BTreeMap, BTreeSet};
use xrit_core::{
    Identifier, LiveLinkError, LiveLinkErrorCode, LiveLinkSource, LiveLinkSourceSettings,
    ReflectEnum, SourceBackend, SourceKind,
};

/// Simulated host source registry.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    enabled: BTreeSet<SourceKind>,
    sources: BTreeMap<Identifier, LiveLinkSource>,
}

impl MemoryBackend {
    /// Create a backend with the given plugins enabled.
    #[must_use]
    pub fn new(enabled: BTreeSet<SourceKind>) -> Self {
        Self {
            enabled,
            sources: BTreeMap::new(),
        }
    }

    /// Number of live host sources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// The source currently realized under `host_id`.
    #[must_use]
    pub fn get(&self, host_id: &Identifier) -> Option<&LiveLinkSource> {
        self.sources.get(host_id)
    }

    /// Drop a source as if the host destroyed it on its own.
    pub fn forget(&mut self, host_id: &Identifier) -> Option<LiveLinkSource> {
        self.sources.remove(host_id)
    }

    fn missing(host_id: Identifier) -> LiveLinkError {
        LiveLinkError::new(
            LiveLinkErrorCode::SourceDoesNotExist,
            format!("no source with host id {host_id}"),
        )
    }
}

impl SourceBackend for MemoryBackend {
    fn remove_source(&mut self, host_id: Identifier) -> Vec<LiveLinkError> {
        match self.sources.remove(&host_id) {
            Some(_) => {
                tracing::debug!("Removed source {}", host_id);
                Vec::new()
            }
            None => vec![Self::missing(host_id)],
        }
    }

    fn create_source(&mut self, source: &LiveLinkSource) -> Result<Identifier, Vec<LiveLinkError>> {
        let Some(kind) = source.kind() else {
            return Err(vec![LiveLinkError::new(
                LiveLinkErrorCode::InternalError,
                "cannot create an empty source",
            )]);
        };
        let name = kind.case_name().unwrap_or_default();

        if matches!(kind, SourceKind::VirtualSubject | SourceKind::MessageBus) {
            return Err(vec![LiveLinkError::new(
                LiveLinkErrorCode::Unimplemented,
                format!("creating {name} sources is not supported"),
            )]);
        }
        if !self.enabled.contains(&kind) {
            return Err(vec![LiveLinkError::new(
                LiveLinkErrorCode::PluginNotEnabled,
                format!("plugin for {name} is not enabled"),
            )]);
        }

        let host_id = Identifier::random();
        self.sources.insert(host_id, source.clone());
        tracing::debug!("Created {} source {}", name, host_id);
        Ok(host_id)
    }

    fn update_source(&mut self, source: &LiveLinkSource, host_id: Identifier) -> Vec<LiveLinkError> {
        let Some(existing) = self.sources.get_mut(&host_id) else {
            return vec![Self::missing(host_id)];
        };

        // Only the base settings are mutable on a live source
        match (existing.base_mut(), source.base()) {
            (Some(current), Some(desired)) => {
                current.clone_from(desired);
                Vec::new()
            }
            _ => vec![LiveLinkError::new(
                LiveLinkErrorCode::InternalError,
                "source has no base settings",
            )],
        }
    }

    fn observe_source(&self, host_id: Identifier) -> Option<LiveLinkSourceSettings> {
        self.sources
            .get(&host_id)
            .and_then(|source| source.base().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xrit_core::livelink::{LiveLinkSourceMode, Source};

    fn all_kinds() -> BTreeSet<SourceKind> {
        SourceKind::CASES.iter().map(|(kind, _)| *kind).collect()
    }

    #[test]
    fn creates_enabled_kind() {
        let mut backend = MemoryBackend::new(all_kinds());
        let host_id = backend
            .create_source(&LiveLinkSource::Dummy(Source::default()))
            .expect("create");

        assert!(backend.get(&host_id).is_some());
        assert_eq!(backend.len(), 1);
    }

    #[test]
    fn disabled_kind_is_plugin_not_enabled() {
        let mut backend = MemoryBackend::new(BTreeSet::new());
        let errors = backend
            .create_source(&LiveLinkSource::Mvn(Source::default()))
            .expect_err("disabled");

        assert_eq!(errors[0].code, LiveLinkErrorCode::PluginNotEnabled);
        assert!(backend.is_empty());
    }

    #[test]
    fn virtual_subject_is_unimplemented() {
        let mut backend = MemoryBackend::new(all_kinds());
        let errors = backend
            .create_source(&LiveLinkSource::VirtualSubject(Source::default()))
            .expect_err("unimplemented");

        assert_eq!(errors[0].code, LiveLinkErrorCode::Unimplemented);
    }

    #[test]
    fn update_replaces_base_only() {
        let mut backend = MemoryBackend::new(all_kinds());
        let source = LiveLinkSource::Xr(Source::default());
        let host_id = backend.create_source(&source).expect("create");

        let mut changed = source.clone();
        if let Some(base) = changed.base_mut() {
            base.mode = LiveLinkSourceMode::Timecode;
        }
        assert!(backend.update_source(&changed, host_id).is_empty());

        let observed = backend.observe_source(host_id).expect("observe");
        assert_eq!(observed.mode, LiveLinkSourceMode::Timecode);
    }

    #[test]
    fn unknown_host_id_does_not_exist() {
        let mut backend = MemoryBackend::new(all_kinds());
        let host_id = Identifier::random();

        assert_eq!(
            backend.remove_source(host_id)[0].code,
            LiveLinkErrorCode::SourceDoesNotExist
        );
        assert_eq!(
            backend.update_source(&LiveLinkSource::Dummy(Source::default()), host_id)[0].code,
            LiveLinkErrorCode::SourceDoesNotExist
        );
        assert!(backend.observe_source(host_id).is_none());
    }
}
