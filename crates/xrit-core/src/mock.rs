//! # Mock Data
//!
//! Canned documents for exercising a Node or a Service without real
//! hardware: a configuration covering the creatable source kinds, the two
//! shapes of result, and a JSON prettifier for displaying them.

use crate::XritError;
use crate::document::{Configuration, Ip, LiveLink, SetConfigurationResult};
use crate::error::{LiveLinkError, LiveLinkErrorCode, ParseError, ParseErrorCode};
use crate::identifier::Identifier;
use crate::livelink::{
    DummySettings, FreeDDefaultConfigs, FreeDSettings, LiveLinkSource, LiveLinkSourceMode,
    LiveLinkSourceSettings, MvnSettings, OptitrackSettings, Source, SourceSettings, XrSettings,
};
use serde::Serialize;
use serde_json::Value;
use serde_json::ser::{PrettyFormatter, Serializer};

fn mock_source<I>(immutable: I) -> Source<I> {
    Source {
        id: Identifier::random(),
        settings: SourceSettings {
            immutable,
            base: LiveLinkSourceSettings::default(),
        },
        subjects: vec![0, 1, 2],
    }
}

/// A configuration with one source of each creatable kind and fresh ids.
#[must_use]
pub fn mock_configuration() -> Configuration {
    let mut xr = mock_source(XrSettings {
        track_controllers: true,
        ..XrSettings::default()
    });
    xr.settings.base.mode = LiveLinkSourceMode::Latest;

    let sources = vec![
        LiveLinkSource::Dummy(mock_source(DummySettings {
            ip_address: "127.0.0.1".to_string(),
            port: 9763,
        })),
        LiveLinkSource::Mvn(mock_source(MvnSettings { port: 9763 })),
        LiveLinkSource::Optitrack(mock_source(OptitrackSettings {
            server_address: "127.0.0.1".to_string(),
            client_address: "127.0.0.1".to_string(),
            is_multicast: false,
        })),
        LiveLinkSource::Xr(xr),
        LiveLinkSource::FreeD(mock_source(FreeDSettings {
            default_config: FreeDDefaultConfigs::Generic,
            ..FreeDSettings::default()
        })),
    ];

    Configuration {
        udp_unicast_endpoint: Ip {
            url: "127.0.0.1".to_string(),
            port: 8000,
        },
        livelink: LiveLink { sources },
    }
}

/// A result reporting nothing wrong.
#[must_use]
pub fn mock_successful_result() -> SetConfigurationResult {
    SetConfigurationResult::default()
}

/// A result of the kind produced by a malformed configuration.
#[must_use]
pub fn mock_parse_error_result() -> SetConfigurationResult {
    SetConfigurationResult {
        parse_errors: vec![
            ParseError::new(
                ParseErrorCode::InvalidField,
                "settings",
                "speed",
                "Object does not contain provided field name",
            ),
            ParseError::new(
                ParseErrorCode::VariantTypeInvalid,
                "root[2]",
                "xrit_unreal::LiveLinkUnknownSource",
                "Variant does not contain provided type",
            ),
        ],
        livelink_errors: vec![
            LiveLinkError::new(LiveLinkErrorCode::PluginNotEnabled, "plugin for Mvn is not enabled")
                .tagged(Identifier::random()),
        ],
    }
}

/// Re-indent a JSON document with `indent` repeated per nesting level.
///
/// Member order and string contents are preserved.
pub fn prettify_json(json: &str, indent: &str) -> Result<String, XritError> {
    let value: Value =
        serde_json::from_str(json).map_err(|e| XritError::SerializationError(e.to_string()))?;

    let mut out = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(indent.as_bytes()));
    value
        .serialize(&mut serializer)
        .map_err(|e| XritError::SerializationError(e.to_string()))?;

    String::from_utf8(out).map_err(|e| XritError::InvalidEncoding(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec;

    #[test]
    fn mock_configuration_round_trips() {
        let config = mock_configuration();
        let (parsed, errors) = codec::from_str::<Configuration>(&codec::to_string(&config));

        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(parsed, config);
        assert_eq!(parsed.livelink.sources.len(), 5);
    }

    #[test]
    fn mock_ids_are_unique() {
        let config = mock_configuration();
        let mut ids: Vec<_> = config.livelink.sources.iter().filter_map(LiveLinkSource::id).collect();
        ids.sort();
        ids.dedup();

        assert_eq!(ids.len(), 5);
    }

    #[test]
    fn results_have_expected_shape() {
        assert!(mock_successful_result().is_success());
        assert_eq!(mock_parse_error_result().parse_errors.len(), 2);
    }

    #[test]
    fn prettify_indents_and_preserves_order() {
        let pretty = prettify_json(r#"{"b":1,"a":{"s":"x\"y"}}"#, "    ").expect("prettify");

        assert_eq!(pretty, "{\n    \"b\": 1,\n    \"a\": {\n        \"s\": \"x\\\"y\"\n    }\n}");
    }

    #[test]
    fn prettify_rejects_invalid_json() {
        assert!(matches!(
            prettify_json("{", "  "),
            Err(XritError::SerializationError(_))
        ));
    }
}
