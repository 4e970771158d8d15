//! # LiveLink Source Model
//!
//! Typed descriptions of the live data sources the Node asks the Service to
//! maintain.
//!
//! Every source kind splits its settings in two:
//!
//! - an **immutable** part, fixed when the source is created; any change
//!   forces the source to be destroyed and recreated;
//! - the shared, mutable **base** part ([`LiveLinkSourceSettings`]),
//!   re-applied in place on every reconciliation.
//!
//! On the wire both parts are flattened into one settings object, with the
//! base nested under the `base` key.
//!
//! The immutable part alone feeds [`SourceKindSettings::immutable_settings_hash`].

use crate::codec;
use crate::identifier::Identifier;
use crate::reflect::{Reflect, ReflectRecord};
use crate::{reflect_enum, reflect_record, reflect_variant};

// =============================================================================
// ENUMERATIONS
// =============================================================================

/// How a source picks the frame to evaluate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LiveLinkSourceMode {
    #[default]
    Invalid,
    Latest,
    EngineTime,
    Timecode,
}

reflect_enum! {
    LiveLinkSourceMode as "LiveLinkSourceMode" {
        Latest => "Latest",
        EngineTime => "EngineTime",
        Timecode => "Timecode",
    }
}

/// Vendor presets for FreeD encoder ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FreeDDefaultConfigs {
    #[default]
    Invalid,
    None,
    Generic,
    Panasonic,
    Sony,
    Stype,
    Mosys,
    Ncam,
}

reflect_enum! {
    FreeDDefaultConfigs as "FreeDDefaultConfigs" {
        None => "None",
        Generic => "Generic",
        Panasonic => "Panasonic",
        Sony => "Sony",
        Stype => "stYpe",
        Mosys => "Mosys",
        Ncam => "Ncam",
    }
}

/// The source kinds a backend may support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum SourceKind {
    #[default]
    Invalid,
    Dummy,
    Mvn,
    Optitrack,
    Xr,
    VirtualSubject,
    FreeD,
    MessageBus,
}

reflect_enum! {
    SourceKind as "SourceKind" {
        Dummy => "Dummy",
        Mvn => "Mvn",
        Optitrack => "Optitrack",
        Xr => "Xr",
        VirtualSubject => "VirtualSubject",
        FreeD => "FreeD",
        MessageBus => "MessageBus",
    }
}

// =============================================================================
// BASE SETTINGS (mutable)
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Framerate {
    pub numerator: u64,
    pub denominator: u64,
}

impl Default for Framerate {
    fn default() -> Self {
        Self {
            numerator: 24,
            denominator: 1,
        }
    }
}

reflect_record! {
    Framerate as "Framerate" {
        "numerator" => numerator,
        "denominator" => denominator,
    }
}

/// Frame buffering behaviour of a source.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveLinkSourceBufferManagementSettings {
    pub valid_engine_time_enabled: bool,
    pub valid_engine_time: f32,
    pub engine_time_offset: f32,
    pub generate_sub_frame: bool,
    pub use_timecode_smooth_latest: bool,
    pub source_timecode_framerate: Framerate,
    pub valid_timecode_frame_enabled: bool,
    pub valid_timecode_frame: i64,
    pub timecode_frame_offset: f32,
    pub latest_offset: i64,
    pub max_number_of_frames_to_buffer: i64,
    pub keep_at_least_one_frame: bool,
}

impl Default for LiveLinkSourceBufferManagementSettings {
    fn default() -> Self {
        Self {
            valid_engine_time_enabled: false,
            valid_engine_time: 1.0,
            engine_time_offset: 0.0,
            generate_sub_frame: false,
            use_timecode_smooth_latest: false,
            source_timecode_framerate: Framerate::default(),
            valid_timecode_frame_enabled: false,
            valid_timecode_frame: 30,
            timecode_frame_offset: 0.0,
            latest_offset: 0,
            max_number_of_frames_to_buffer: 10,
            keep_at_least_one_frame: true,
        }
    }
}

reflect_record! {
    LiveLinkSourceBufferManagementSettings as "LiveLinkSourceBufferManagementSettings" {
        "valid_engine_time_enabled" => valid_engine_time_enabled,
        "valid_engine_time" => valid_engine_time,
        "engine_time_offset" => engine_time_offset,
        "generate_sub_frame" => generate_sub_frame,
        "use_timecode_smooth_latest" => use_timecode_smooth_latest,
        "source_timecode_framerate" => source_timecode_framerate,
        "valid_timecode_frame_enabled" => valid_timecode_frame_enabled,
        "valid_timecode_frame" => valid_timecode_frame,
        "timecode_frame_offset" => timecode_frame_offset,
        "latest_offset" => latest_offset,
        "max_number_of_frames_to_buffer" => max_number_of_frames_to_buffer,
        "keep_at_least_one_frame" => keep_at_least_one_frame,
    }
}

/// The shared mutable settings of every source kind.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveLinkSourceSettings {
    pub mode: LiveLinkSourceMode,
    pub buffer_settings: LiveLinkSourceBufferManagementSettings,
}

impl Default for LiveLinkSourceSettings {
    fn default() -> Self {
        Self {
            mode: LiveLinkSourceMode::EngineTime,
            buffer_settings: LiveLinkSourceBufferManagementSettings::default(),
        }
    }
}

reflect_record! {
    LiveLinkSourceSettings as "LiveLinkSourceSettings" {
        "mode" => mode,
        "buffer_settings" => buffer_settings,
    }
}

// =============================================================================
// GENERIC SOURCE SHAPE
// =============================================================================

/// Immutable settings of one source kind.
pub trait SourceKindSettings: ReflectRecord + Reflect + Clone + PartialEq {
    /// Kind tag used for capability checks.
    const KIND: SourceKind;

    /// Fully qualified wire name of the source record.
    const TYPE_NAME: &'static str;

    /// Stable 64-bit hash of these settings.
    ///
    /// BLAKE3 over the wire name and the compact JSON of the settings,
    /// truncated to the first eight bytes (little endian). Independent of
    /// process, platform and build.
    fn immutable_settings_hash(&self) -> u64 {
        let mut hasher = blake3::Hasher::new();
        hasher.update(Self::TYPE_NAME.as_bytes());
        hasher.update(&[0]);
        hasher.update(codec::to_string(self).as_bytes());

        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&hasher.finalize().as_bytes()[..8]);
        u64::from_le_bytes(prefix)
    }
}

/// Immutable part plus shared base of a source's settings.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SourceSettings<I> {
    pub immutable: I,
    pub base: LiveLinkSourceSettings,
}

/// A source as described by the Node.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Source<I> {
    /// Node-issued id; the reconciliation key.
    pub id: Identifier,
    pub settings: SourceSettings<I>,
    /// Informational only.
    pub subjects: Vec<u64>,
}

macro_rules! source_record {
    ($immutable:ty => $kind:ident as $name:literal) => {
        impl SourceKindSettings for $immutable {
            const KIND: SourceKind = SourceKind::$kind;
            const TYPE_NAME: &'static str = $name;
        }

        reflect_record! {
            Source<$immutable> as $name {
                "id" => id,
                "settings" => settings,
                "subjects" => subjects,
            }
        }
    };
}

// =============================================================================
// SOURCE KINDS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DummySettings {
    pub ip_address: String,
    pub port: i64,
}

reflect_record! {
    DummySettings as "LiveLinkDummyImmutableSettings" {
        "ip_address" => ip_address,
        "port" => port,
    }
}

reflect_record! {
    SourceSettings<DummySettings> as "LiveLinkDummySourceSettings" {
        "ip_address" => immutable.ip_address,
        "port" => immutable.port,
        "base" => base,
    }
}

source_record!(DummySettings => Dummy as "xrit_unreal::LiveLinkDummySource");

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MvnSettings {
    pub port: i64,
}

reflect_record! {
    MvnSettings as "LiveLinkMvnImmutableSettings" {
        "port" => port,
    }
}

reflect_record! {
    SourceSettings<MvnSettings> as "LiveLinkMvnSourceSettings" {
        "port" => immutable.port,
        "base" => base,
    }
}

source_record!(MvnSettings => Mvn as "xrit_unreal::LiveLinkMvnSource");

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OptitrackSettings {
    pub server_address: String,
    pub client_address: String,
    pub is_multicast: bool,
}

reflect_record! {
    OptitrackSettings as "LiveLinkOptitrackImmutableSettings" {
        "server_address" => server_address,
        "client_address" => client_address,
        "is_multicast" => is_multicast,
    }
}

reflect_record! {
    SourceSettings<OptitrackSettings> as "LiveLinkOptitrackSourceSettings" {
        "server_address" => immutable.server_address,
        "client_address" => immutable.client_address,
        "is_multicast" => immutable.is_multicast,
        "base" => base,
    }
}

source_record!(OptitrackSettings => Optitrack as "xrit_unreal::LiveLinkOptitrackSource");

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XrSettings {
    pub track_trackers: bool,
    pub track_controllers: bool,
    pub track_hmds: bool,
    pub local_update_rate_in_hz: u64,
}

impl Default for XrSettings {
    fn default() -> Self {
        Self {
            track_trackers: true,
            track_controllers: false,
            track_hmds: false,
            local_update_rate_in_hz: 60,
        }
    }
}

reflect_record! {
    XrSettings as "LiveLinkXrImmutableSettings" {
        "track_trackers" => track_trackers,
        "track_controllers" => track_controllers,
        "track_hmds" => track_hmds,
        "local_update_rate_in_hz" => local_update_rate_in_hz,
    }
}

reflect_record! {
    SourceSettings<XrSettings> as "LiveLinkXrSourceSettings" {
        "track_trackers" => immutable.track_trackers,
        "track_controllers" => immutable.track_controllers,
        "track_hmds" => immutable.track_hmds,
        "local_update_rate_in_hz" => immutable.local_update_rate_in_hz,
        "base" => base,
    }
}

source_record!(XrSettings => Xr as "xrit_unreal::LiveLinkXrSource");

/// Virtual subjects have nothing fixed at creation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VirtualSubjectSettings {}

reflect_record! {
    VirtualSubjectSettings as "VirtualSubjectImmutableSettings" {}
}

reflect_record! {
    SourceSettings<VirtualSubjectSettings> as "VirtualSubjectSourceSettings" {
        "base" => base,
    }
}

source_record!(VirtualSubjectSettings => VirtualSubject as "xrit_unreal::VirtualSubjectSource");

/// Encoder range of one FreeD lens axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreeDEncoderData {
    pub is_valid: bool,
    pub invert_encoder: bool,
    pub use_manual_range: bool,
    pub min: i64,
    pub max: i64,
    pub mask_bits: i64,
}

impl Default for FreeDEncoderData {
    fn default() -> Self {
        Self {
            is_valid: false,
            invert_encoder: false,
            use_manual_range: false,
            min: 0x00ff_ffff,
            max: 0,
            mask_bits: 0x00ff_ffff,
        }
    }
}

reflect_record! {
    FreeDEncoderData as "FreeDEncoderData" {
        "is_valid" => is_valid,
        "invert_encoder" => invert_encoder,
        "use_manual_range" => use_manual_range,
        "min" => min,
        "max" => max,
        "mask_bits" => mask_bits,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreeDSettings {
    pub ip_address: String,
    pub udp_port: u64,
    pub send_extra_metadata: bool,
    pub default_config: FreeDDefaultConfigs,
    pub focus_distance_encoder_data: FreeDEncoderData,
    pub focal_length_encoder_data: FreeDEncoderData,
    pub user_defined_encoder_data: FreeDEncoderData,
}

impl Default for FreeDSettings {
    fn default() -> Self {
        Self {
            ip_address: "127.0.0.1".to_string(),
            udp_port: 40000,
            send_extra_metadata: false,
            default_config: FreeDDefaultConfigs::None,
            focus_distance_encoder_data: FreeDEncoderData::default(),
            focal_length_encoder_data: FreeDEncoderData::default(),
            user_defined_encoder_data: FreeDEncoderData::default(),
        }
    }
}

reflect_record! {
    FreeDSettings as "LiveLinkFreeDImmutableSettings" {
        "ip_address" => ip_address,
        "udp_port" => udp_port,
        "send_extra_metadata" => send_extra_metadata,
        "default_config" => default_config,
        "focus_distance_encoder_data" => focus_distance_encoder_data,
        "focal_length_encoder_data" => focal_length_encoder_data,
        "user_defined_encoder_data" => user_defined_encoder_data,
    }
}

reflect_record! {
    SourceSettings<FreeDSettings> as "LiveLinkFreeDSourceSettings" {
        "ip_address" => immutable.ip_address,
        "udp_port" => immutable.udp_port,
        "base" => base,
        "send_extra_metadata" => immutable.send_extra_metadata,
        "default_config" => immutable.default_config,
        "focus_distance_encoder_data" => immutable.focus_distance_encoder_data,
        "focal_length_encoder_data" => immutable.focal_length_encoder_data,
        "user_defined_encoder_data" => immutable.user_defined_encoder_data,
    }
}

source_record!(FreeDSettings => FreeD as "xrit_unreal::LiveLinkFreeDSource");

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MessageBusSettings {
    pub source_type: String,
    pub machine_name: String,
    pub address: Identifier,
}

reflect_record! {
    MessageBusSettings as "LiveLinkMessageBusImmutableSettings" {
        "source_type" => source_type,
        "machine_name" => machine_name,
        "address" => address,
    }
}

reflect_record! {
    SourceSettings<MessageBusSettings> as "LiveLinkMessageBusSourceSettings" {
        "source_type" => immutable.source_type,
        "machine_name" => immutable.machine_name,
        "address" => immutable.address,
        "base" => base,
    }
}

source_record!(MessageBusSettings => MessageBus as "xrit_unreal::LiveLinkMessageBusSource");

pub type LiveLinkDummySource = Source<DummySettings>;
pub type LiveLinkMvnSource = Source<MvnSettings>;
pub type LiveLinkOptitrackSource = Source<OptitrackSettings>;
pub type LiveLinkXrSource = Source<XrSettings>;
pub type VirtualSubjectSource = Source<VirtualSubjectSettings>;
pub type LiveLinkFreeDSource = Source<FreeDSettings>;
pub type LiveLinkMessageBusSource = Source<MessageBusSettings>;

// =============================================================================
// TAGGED UNION
// =============================================================================

/// Any source, or the "no value" state.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum LiveLinkSource {
    #[default]
    Empty,
    Dummy(LiveLinkDummySource),
    Mvn(LiveLinkMvnSource),
    Optitrack(LiveLinkOptitrackSource),
    Xr(LiveLinkXrSource),
    VirtualSubject(VirtualSubjectSource),
    FreeD(LiveLinkFreeDSource),
    MessageBus(LiveLinkMessageBusSource),
}

reflect_variant! {
    LiveLinkSource {
        Dummy => "xrit_unreal::LiveLinkDummySource",
        Mvn => "xrit_unreal::LiveLinkMvnSource",
        Optitrack => "xrit_unreal::LiveLinkOptitrackSource",
        Xr => "xrit_unreal::LiveLinkXrSource",
        VirtualSubject => "xrit_unreal::VirtualSubjectSource",
        FreeD => "xrit_unreal::LiveLinkFreeDSource",
        MessageBus => "xrit_unreal::LiveLinkMessageBusSource",
    }
}

/// Apply the same expression to whichever source is active.
macro_rules! with_source {
    ($value:expr, $source:ident => $body:expr, empty => $empty:expr) => {
        match $value {
            LiveLinkSource::Empty => $empty,
            LiveLinkSource::Dummy($source) => $body,
            LiveLinkSource::Mvn($source) => $body,
            LiveLinkSource::Optitrack($source) => $body,
            LiveLinkSource::Xr($source) => $body,
            LiveLinkSource::VirtualSubject($source) => $body,
            LiveLinkSource::FreeD($source) => $body,
            LiveLinkSource::MessageBus($source) => $body,
        }
    };
}

impl<I: SourceKindSettings> Source<I> {
    /// Hash of the immutable settings; the base never participates.
    #[must_use]
    pub fn immutable_settings_hash(&self) -> u64 {
        self.settings.immutable.immutable_settings_hash()
    }
}

impl LiveLinkSource {
    /// Node-issued id, `None` when empty.
    #[must_use]
    pub fn id(&self) -> Option<Identifier> {
        with_source!(self, source => Some(source.id), empty => None)
    }

    #[must_use]
    pub fn kind(&self) -> Option<SourceKind> {
        fn kind_of<I: SourceKindSettings>(_: &Source<I>) -> SourceKind {
            I::KIND
        }
        with_source!(self, source => Some(kind_of(source)), empty => None)
    }

    /// Shared mutable settings, `None` when empty.
    #[must_use]
    pub fn base(&self) -> Option<&LiveLinkSourceSettings> {
        with_source!(self, source => Some(&source.settings.base), empty => None)
    }

    pub fn base_mut(&mut self) -> Option<&mut LiveLinkSourceSettings> {
        with_source!(self, source => Some(&mut source.settings.base), empty => None)
    }

    /// Hash over the active kind's immutable settings, `None` when empty.
    #[must_use]
    pub fn immutable_settings_hash(&self) -> Option<u64> {
        with_source!(self, source => Some(source.immutable_settings_hash()), empty => None)
    }
}
