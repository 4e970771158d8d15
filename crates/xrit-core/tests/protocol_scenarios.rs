//! # Protocol Scenarios
//!
//! End-to-end behaviour of the core: wire text through the envelope and
//! codec into the reconciler, and back out.

#![allow(clippy::unwrap_used, clippy::panic)]

use std::collections::BTreeMap;
use xrit_core::livelink::{DummySettings, MvnSettings, Source, SourceSettings};
use xrit_core::{
    Configuration, Identifier, LiveLinkError, LiveLinkErrorCode, LiveLinkSource,
    LiveLinkSourceSettings, NodeCommand, ParseErrorCode, ServiceCommand, SetConfigurationResult,
    SourceBackend, SourceCache, codec, collect_status, create_node_message,
    create_service_message, decode_node_message, decode_service_message, reconcile,
};

// =============================================================================
// FIXTURES
// =============================================================================

/// Backend that counts calls and hands out sequential host ids.
#[derive(Debug, Default)]
struct CountingBackend {
    next_host: u32,
    live: BTreeMap<Identifier, LiveLinkSourceSettings>,
    creates: usize,
    updates: usize,
    removes: Vec<Identifier>,
}

impl CountingBackend {
    fn reset_counts(&mut self) {
        self.creates = 0;
        self.updates = 0;
        self.removes.clear();
    }
}

impl SourceBackend for CountingBackend {
    fn remove_source(&mut self, host_id: Identifier) -> Vec<LiveLinkError> {
        self.removes.push(host_id);
        match self.live.remove(&host_id) {
            Some(_) => Vec::new(),
            None => vec![LiveLinkError::new(
                LiveLinkErrorCode::SourceDoesNotExist,
                "unknown host id",
            )],
        }
    }

    fn create_source(&mut self, source: &LiveLinkSource) -> Result<Identifier, Vec<LiveLinkError>> {
        self.creates += 1;
        if matches!(source, LiveLinkSource::Mvn(_)) {
            return Err(vec![LiveLinkError::new(
                LiveLinkErrorCode::PluginNotEnabled,
                "mvn plugin is not enabled",
            )]);
        }
        self.next_host += 1;
        let host_id = Identifier::new(0xfeed, 0, 0, self.next_host);
        self.live
            .insert(host_id, source.base().cloned().unwrap_or_default());
        Ok(host_id)
    }

    fn update_source(&mut self, _source: &LiveLinkSource, host_id: Identifier) -> Vec<LiveLinkError> {
        self.updates += 1;
        if self.live.contains_key(&host_id) {
            Vec::new()
        } else {
            vec![LiveLinkError::new(LiveLinkErrorCode::SourceDoesNotExist, "gone")]
        }
    }

    fn observe_source(&self, host_id: Identifier) -> Option<LiveLinkSourceSettings> {
        self.live.get(&host_id).cloned()
    }
}

fn node_id(n: u32) -> Identifier {
    Identifier::new(0, 0, 0, n)
}

fn dummy(n: u32) -> LiveLinkSource {
    LiveLinkSource::Dummy(Source {
        id: node_id(n),
        settings: SourceSettings {
            immutable: DummySettings {
                ip_address: "127.0.0.1".to_string(),
                port: 9000 + i64::from(n),
            },
            base: LiveLinkSourceSettings::default(),
        },
        subjects: vec![u64::from(n)],
    })
}

// =============================================================================
// RECONCILIATION SCENARIOS
// =============================================================================

mod reconciliation {
    use super::*;

    #[test]
    fn create_then_shrink_then_steady_state() {
        let mut cache = SourceCache::new();
        let mut backend = CountingBackend::default();

        // Step 1: empty cache, two desired sources
        let errors = reconcile(&mut cache, &[dummy(1), dummy(2)], &mut backend);
        assert!(errors.is_empty());
        assert_eq!(backend.creates, 2);
        assert_eq!(backend.updates, 0);
        assert!(backend.removes.is_empty());
        assert_eq!(cache.ids().collect::<Vec<_>>(), vec![node_id(1), node_id(2)]);

        let host_a = cache.get(&node_id(1)).unwrap().host_id;
        let host_b = cache.get(&node_id(2)).unwrap().host_id;

        // Step 2: drop B
        backend.reset_counts();
        let errors = reconcile(&mut cache, &[dummy(1)], &mut backend);
        assert!(errors.is_empty());
        assert_eq!(backend.removes, vec![host_b]);
        assert_eq!(backend.creates, 0);
        assert_eq!(cache.ids().collect::<Vec<_>>(), vec![node_id(1)]);
        assert_eq!(cache.get(&node_id(1)).unwrap().host_id, host_a);

        // Step 3: unchanged desired list still updates
        backend.reset_counts();
        let errors = reconcile(&mut cache, &[dummy(1)], &mut backend);
        assert!(errors.is_empty());
        assert_eq!(backend.updates, 1);
        assert_eq!(backend.creates, 0);
        assert!(backend.removes.is_empty());
    }

    #[test]
    fn create_failure_is_isolated_and_tagged() {
        let mut cache = SourceCache::new();
        let mut backend = CountingBackend::default();
        let mvn = LiveLinkSource::Mvn(Source {
            id: node_id(7),
            settings: SourceSettings {
                immutable: MvnSettings { port: 9763 },
                base: LiveLinkSourceSettings::default(),
            },
            subjects: Vec::new(),
        });

        let errors = reconcile(&mut cache, &[dummy(1), mvn, dummy(2)], &mut backend);

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, LiveLinkErrorCode::PluginNotEnabled);
        assert_eq!(errors[0].source_id, node_id(7));
        assert!(cache.get(&node_id(7)).is_none());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn update_failure_evicts_entry() {
        let mut cache = SourceCache::new();
        let mut backend = CountingBackend::default();
        reconcile(&mut cache, &[dummy(1)], &mut backend);

        // Host loses the resource behind the reconciler's back
        backend.live.clear();
        let errors = reconcile(&mut cache, &[dummy(1)], &mut backend);

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, LiveLinkErrorCode::SourceDoesNotExist);
        assert_eq!(errors[0].source_id, node_id(1));
        assert!(cache.is_empty());

        // Next pass recreates it
        let errors = reconcile(&mut cache, &[dummy(1)], &mut backend);
        assert!(errors.is_empty());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn remove_errors_are_reported_and_entry_still_erased() {
        let mut cache = SourceCache::new();
        let mut backend = CountingBackend::default();
        reconcile(&mut cache, &[dummy(1), dummy(2)], &mut backend);
        backend.live.clear();

        let errors = reconcile(&mut cache, &[], &mut backend);

        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| e.code == LiveLinkErrorCode::SourceDoesNotExist));
        assert!(cache.is_empty());
    }

    #[test]
    fn status_reflects_cache() {
        let mut cache = SourceCache::new();
        let mut backend = CountingBackend::default();
        reconcile(&mut cache, &[dummy(2), dummy(1)], &mut backend);

        let status = collect_status(&mut cache, &backend);
        let ids: Vec<_> = status.iter().filter_map(LiveLinkSource::id).collect();

        assert_eq!(ids, vec![node_id(1), node_id(2)]);
    }
}

// =============================================================================
// WIRE SCENARIOS
// =============================================================================

mod wire {
    use super::*;

    #[test]
    fn set_configuration_message_to_reconciled_result() {
        let config = Configuration {
            livelink: xrit_core::LiveLink {
                sources: vec![dummy(1), dummy(2)],
            },
            ..Configuration::default()
        };
        let wire = create_service_message(
            ServiceCommand::SetConfiguration,
            &codec::to_string(&config),
        )
        .unwrap();

        let message = decode_service_message(&wire).unwrap();
        assert_eq!(message.command, ServiceCommand::SetConfiguration);

        let (parsed, parse_errors) = codec::from_str::<Configuration>(message.data);
        assert!(parse_errors.is_empty());

        let mut cache = SourceCache::new();
        let mut backend = CountingBackend::default();
        let livelink_errors = reconcile(&mut cache, &parsed.livelink.sources, &mut backend);

        let result = SetConfigurationResult {
            parse_errors,
            livelink_errors,
        };
        let reply =
            create_node_message(NodeCommand::SetConfigurationResult, &codec::to_string(&result))
                .unwrap();

        let decoded = decode_node_message(&reply).unwrap();
        let (echo, errors) = codec::from_str::<SetConfigurationResult>(decoded.data);
        assert!(errors.is_empty());
        assert!(echo.is_success());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn malformed_configuration_reports_every_problem() {
        let json = r#"{
            "udp_unicast_endpoint": {"url": 5, "port": 8000},
            "livelink": {"sources": [
                {"id": "dea0720b-db67-4188-8aed-020709dff6ef", "$type": "xrit_unreal::LiveLinkDummySource"},
                {"$type": "xrit_unreal::NoSuchSource"},
                {"$type": "xrit_unreal::LiveLinkMvnSource", "id": "bad", "colour": "red"},
                {}
            ]}
        }"#;

        let (config, errors) = codec::from_str::<Configuration>(json);
        let codes: Vec<_> = errors.iter().map(|e| e.code).collect();

        assert_eq!(
            codes,
            vec![
                ParseErrorCode::InvalidValue,
                ParseErrorCode::VariantTypeMissing,
                ParseErrorCode::VariantTypeInvalid,
                ParseErrorCode::InvalidValue,
                ParseErrorCode::InvalidField,
            ]
        );
        assert_eq!(errors[1].containing_object, "sources[0]");
        assert_eq!(errors[2].containing_object, "sources[1]");
        assert_eq!(errors[3].containing_object, "id");
        assert_eq!(config.livelink.sources.len(), 4);
        assert_eq!(config.livelink.sources[3], LiveLinkSource::Empty);
    }

    #[test]
    fn status_round_trips_through_envelope() {
        let status = Configuration {
            livelink: xrit_core::LiveLink {
                sources: vec![dummy(3)],
            },
            ..Configuration::default()
        };
        let wire = create_node_message(NodeCommand::Status, &codec::to_string(&status)).unwrap();

        let message = decode_node_message(&wire).unwrap();
        let (parsed, errors) = codec::from_str::<Configuration>(message.data);

        assert_eq!(message.command, NodeCommand::Status);
        assert!(errors.is_empty());
        assert_eq!(parsed, status);
    }
}
