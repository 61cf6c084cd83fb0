//! Typed info records and the registry that extracts them from replies.
//!
//! Each [`RecordKind`] is bound to the request path used to query it, the
//! node path where the reply carries its attributes, and a decoder. The
//! caller chooses the kind; the document is never sniffed.

use std::{fmt::Display, str::FromStr};

use serde::{Serialize, Serializer};
use smol_str::SmolStr;

use crate::{
   error::{Result, ZikError},
   zik::{
      document::{Document, Node},
      protocol::{
         API_AUDIO_EQUALIZER_ENABLED, API_AUDIO_NOISE_CONTROL, API_AUDIO_NOISE_CONTROL_ENABLED,
         API_AUDIO_SMART_AUDIO_TUNE, API_AUDIO_SOUND_EFFECT, API_AUDIO_SOURCE,
         API_AUDIO_TRACK_METADATA, API_AUDIO_VOLUME, API_BLUETOOTH_FRIENDLY_NAME,
         API_FLIGHT_MODE, API_SOFTWARE_TTS, API_SOFTWARE_VERSION,
         API_SYSTEM_AUTO_CONNECTION_ENABLED, API_SYSTEM_AUTO_POWER_OFF, API_SYSTEM_BATTERY,
         API_SYSTEM_COLOR, API_SYSTEM_HEAD_DETECTION_ENABLED, API_SYSTEM_PI, Angle, Color,
         Method, NoiseControlMode, Room,
      },
   },
};

/// Serial number of the headset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SystemInfo {
   pub serial_number: SmolStr,
}

/// Firmware version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SoftwareInfo {
   pub version: SmolStr,
}

/// Active audio source (`a2dp`, `line-in`, `usb`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceInfo {
   pub source: SmolStr,
}

/// Battery state as reported by the headset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatteryState {
   Unknown,
   Reported(SmolStr),
}

impl BatteryState {
   pub fn as_str(&self) -> &str {
      match self {
         Self::Unknown => "unknown",
         Self::Reported(state) => state,
      }
   }
}

impl Serialize for BatteryState {
   fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
      serializer.serialize_str(self.as_str())
   }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatteryInfo {
   pub state: BatteryState,
   pub percentage: u8,
}

/// Noise control mode and strength.
///
/// `enabled` is read from the reply when present, otherwise derived from the
/// mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoiseControlInfo {
   pub enabled: bool,
   pub mode: NoiseControlMode,
   pub strength: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoiseControlEnabledInfo {
   pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VolumeInfo {
   pub volume: u32,
}

/// Concert hall sound effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SoundEffectInfo {
   pub enabled: bool,
   pub room: Room,
   pub angle: Angle,
}

/// Currently playing track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetadataInfo {
   pub playing: bool,
   pub title: Option<SmolStr>,
   pub artist: Option<SmolStr>,
   pub album: Option<SmolStr>,
   pub genre: Option<SmolStr>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColorInfo {
   pub color: Color,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeadDetectionInfo {
   pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlightModeInfo {
   pub enabled: bool,
}

/// Friendly name used to build the Bluetooth name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BluetoothInfo {
   pub friendly_name: SmolStr,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AutoConnectionInfo {
   pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EqualizerInfo {
   pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SmartAudioTuneInfo {
   pub enabled: bool,
}

/// Auto power off delay in minutes, 0 when disabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AutoPowerOffInfo {
   pub minutes: u32,
}

/// Text-to-speech announcements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TtsInfo {
   pub enabled: bool,
}

/// Every facet of the headset that can be queried.
#[derive(
   Debug,
   Clone,
   Copy,
   PartialEq,
   Eq,
   Hash,
   PartialOrd,
   Ord,
   strum::Display,
   strum::EnumString,
   strum::IntoStaticStr,
   strum::VariantArray,
)]
#[strum(serialize_all = "kebab-case")]
pub enum RecordKind {
   System,
   Software,
   Source,
   Battery,
   NoiseControl,
   NoiseControlEnabled,
   Volume,
   SoundEffect,
   Metadata,
   Color,
   HeadDetection,
   FlightMode,
   Bluetooth,
   AutoConnection,
   Equalizer,
   SmartAudioTune,
   AutoPowerOff,
   Tts,
}

/// One decoded info record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Record {
   System(SystemInfo),
   Software(SoftwareInfo),
   Source(SourceInfo),
   Battery(BatteryInfo),
   NoiseControl(NoiseControlInfo),
   NoiseControlEnabled(NoiseControlEnabledInfo),
   Volume(VolumeInfo),
   SoundEffect(SoundEffectInfo),
   Metadata(MetadataInfo),
   Color(ColorInfo),
   HeadDetection(HeadDetectionInfo),
   FlightMode(FlightModeInfo),
   Bluetooth(BluetoothInfo),
   AutoConnection(AutoConnectionInfo),
   Equalizer(EqualizerInfo),
   SmartAudioTune(SmartAudioTuneInfo),
   AutoPowerOff(AutoPowerOffInfo),
   Tts(TtsInfo),
}

/// Typed access to a [`Record`] variant.
pub trait Info: Sized + Clone + Into<Record> {
   const KIND: RecordKind;

   fn from_record(record: &Record) -> Option<&Self>;
}

macro_rules! impl_info {
   ($($variant:ident => $ty:ty),* $(,)?) => {
      impl Record {
         pub const fn kind(&self) -> RecordKind {
            match self {
               $(Self::$variant(_) => RecordKind::$variant,)*
            }
         }
      }

      $(
         impl Info for $ty {
            const KIND: RecordKind = RecordKind::$variant;

            fn from_record(record: &Record) -> Option<&Self> {
               match record {
                  Record::$variant(info) => Some(info),
                  _ => None,
               }
            }
         }

         impl From<$ty> for Record {
            fn from(info: $ty) -> Self {
               Self::$variant(info)
            }
         }
      )*
   };
}

impl_info! {
   System => SystemInfo,
   Software => SoftwareInfo,
   Source => SourceInfo,
   Battery => BatteryInfo,
   NoiseControl => NoiseControlInfo,
   NoiseControlEnabled => NoiseControlEnabledInfo,
   Volume => VolumeInfo,
   SoundEffect => SoundEffectInfo,
   Metadata => MetadataInfo,
   Color => ColorInfo,
   HeadDetection => HeadDetectionInfo,
   FlightMode => FlightModeInfo,
   Bluetooth => BluetoothInfo,
   AutoConnection => AutoConnectionInfo,
   Equalizer => EqualizerInfo,
   SmartAudioTune => SmartAudioTuneInfo,
   AutoPowerOff => AutoPowerOffInfo,
   Tts => TtsInfo,
}

type Decoder = fn(&Fields<'_>) -> Result<Record>;

/// Registry entry: where a kind is queried, where its data lives, and how
/// it is decoded.
struct Binding {
   request_path: &'static str,
   node_path: &'static str,
   decode: Decoder,
}

impl RecordKind {
   const fn binding(self) -> Binding {
      const fn bind(request_path: &'static str, node_path: &'static str, decode: Decoder) -> Binding {
         Binding {
            request_path,
            node_path,
            decode,
         }
      }

      match self {
         Self::System => bind(API_SYSTEM_PI, "/system", decode_system),
         Self::Software => bind(API_SOFTWARE_VERSION, "/software", decode_software),
         Self::Source => bind(API_AUDIO_SOURCE, "/audio/source", decode_source),
         Self::Battery => bind(API_SYSTEM_BATTERY, "/system/battery", decode_battery),
         Self::NoiseControl => bind(
            API_AUDIO_NOISE_CONTROL,
            "/audio/noise_control",
            decode_noise_control,
         ),
         Self::NoiseControlEnabled => bind(
            API_AUDIO_NOISE_CONTROL_ENABLED,
            "/audio/noise_control",
            decode_noise_control_enabled,
         ),
         Self::Volume => bind(API_AUDIO_VOLUME, "/audio/volume", decode_volume),
         Self::SoundEffect => bind(
            API_AUDIO_SOUND_EFFECT,
            "/audio/sound_effect",
            decode_sound_effect,
         ),
         Self::Metadata => bind(
            API_AUDIO_TRACK_METADATA,
            "/audio/track/metadata",
            decode_metadata,
         ),
         Self::Color => bind(API_SYSTEM_COLOR, "/system/color", decode_color),
         Self::HeadDetection => bind(
            API_SYSTEM_HEAD_DETECTION_ENABLED,
            "/system/head_detection",
            decode_head_detection,
         ),
         Self::FlightMode => bind(API_FLIGHT_MODE, "/flight_mode", decode_flight_mode),
         Self::Bluetooth => bind(API_BLUETOOTH_FRIENDLY_NAME, "/bluetooth", decode_bluetooth),
         Self::AutoConnection => bind(
            API_SYSTEM_AUTO_CONNECTION_ENABLED,
            "/system/auto_connection",
            decode_auto_connection,
         ),
         Self::Equalizer => bind(
            API_AUDIO_EQUALIZER_ENABLED,
            "/audio/equalizer",
            decode_equalizer,
         ),
         Self::SmartAudioTune => bind(
            API_AUDIO_SMART_AUDIO_TUNE,
            "/audio/smart_audio_tune",
            decode_smart_audio_tune,
         ),
         Self::AutoPowerOff => bind(
            API_SYSTEM_AUTO_POWER_OFF,
            "/system/auto_power_off",
            decode_auto_power_off,
         ),
         Self::Tts => bind(API_SOFTWARE_TTS, "/software/tts", decode_tts),
      }
   }

   /// Path queried with `get` to obtain this record.
   pub const fn request_path(self) -> &'static str {
      self.binding().request_path
   }

   /// Location of the record's attributes inside the reply, relative to the
   /// answer element.
   pub const fn node_path(self) -> &'static str {
      self.binding().node_path
   }

   pub fn to_str(self) -> &'static str {
      self.into()
   }
}

/// Extracts the record bound to `kind` from a reply document.
///
/// Returns `Ok(None)` when the reply carries no subtree for the kind. An
/// error document is rejected before any decoder runs.
pub fn extract(document: &Document, kind: RecordKind) -> Result<Option<Record>> {
   if document.has_error() {
      return Err(rejected(document));
   }

   let Some(node) = document.find_subtree(kind.node_path()) else {
      return Ok(None);
   };
   let decode = kind.binding().decode;
   decode(&Fields { kind, node }).map(Some)
}

/// Typed variant of [`extract`].
pub fn extract_info<I: Info>(document: &Document) -> Result<Option<I>> {
   let record = extract(document, I::KIND)?;
   Ok(record.as_ref().and_then(I::from_record).cloned())
}

/// Builds the rejection error for an error document from its echoed path.
pub fn rejected(document: &Document) -> ZikError {
   let (path, method) = document
      .path()
      .rsplit_once('/')
      .and_then(|(path, method)| Some((path, method.parse::<Method>().ok()?)))
      .unwrap_or((document.path(), Method::Get));
   ZikError::DeviceRejected {
      path: path.to_owned(),
      method,
   }
}

/// Attribute accessors that report failures against the decoded kind.
struct Fields<'a> {
   kind: RecordKind,
   node: &'a Node,
}

impl<'a> Fields<'a> {
   fn malformed(&self, reason: impl Display) -> ZikError {
      ZikError::MalformedRecord {
         kind: self.kind,
         reason: reason.to_string(),
      }
   }

   fn str(&self, key: &str) -> Result<&'a str> {
      self.node.attribute(key).ok_or_else(|| {
         self.malformed(format_args!(
            "<{}> is missing attribute '{key}'",
            self.node.name()
         ))
      })
   }

   fn optional(&self, key: &str) -> Option<SmolStr> {
      self
         .node
         .attribute(key)
         .filter(|v| !v.is_empty())
         .map(SmolStr::new)
   }

   fn bool(&self, key: &str) -> Result<bool> {
      match self.str(key)? {
         "true" => Ok(true),
         "false" => Ok(false),
         other => Err(self.malformed(format_args!("'{key}' is not a boolean: '{other}'"))),
      }
   }

   fn number<T: FromStr>(&self, key: &str) -> Result<T> {
      let raw = self.str(key)?;
      raw.trim()
         .parse()
         .map_err(|_| self.malformed(format_args!("'{key}' is not a number: '{raw}'")))
   }

   fn enumerated<E: FromStr>(&self, key: &str) -> Result<E> {
      let raw = self.str(key)?;
      raw.parse()
         .map_err(|_| ZikError::UnknownEnumValue(raw.to_owned()))
   }
}

fn decode_system(f: &Fields<'_>) -> Result<Record> {
   Ok(
      SystemInfo {
         serial_number: f.str("pi")?.into(),
      }
      .into(),
   )
}

fn decode_software(f: &Fields<'_>) -> Result<Record> {
   Ok(
      SoftwareInfo {
         version: f.str("sip6")?.into(),
      }
      .into(),
   )
}

fn decode_source(f: &Fields<'_>) -> Result<Record> {
   Ok(
      SourceInfo {
         source: f.str("type")?.into(),
      }
      .into(),
   )
}

fn decode_battery(f: &Fields<'_>) -> Result<Record> {
   let state = match f.str("state")? {
      "" | "unknown" => BatteryState::Unknown,
      other => BatteryState::Reported(other.into()),
   };
   // The headset leaves the percentage empty while charging.
   let percentage = if f.str("percent")?.is_empty() {
      0
   } else {
      f.number::<u8>("percent")?
   };
   if percentage > 100 {
      return Err(f.malformed(format_args!("percentage {percentage} out of range")));
   }
   Ok(BatteryInfo { state, percentage }.into())
}

fn decode_noise_control(f: &Fields<'_>) -> Result<Record> {
   let mode: NoiseControlMode = f.enumerated("type")?;
   let strength: u8 = f.number("value")?;
   if !(1..=2).contains(&strength) {
      return Err(f.malformed(format_args!("strength {strength} out of range")));
   }
   let enabled = match f.node.attribute("enabled") {
      Some(_) => f.bool("enabled")?,
      None => mode != NoiseControlMode::Off,
   };
   Ok(
      NoiseControlInfo {
         enabled,
         mode,
         strength,
      }
      .into(),
   )
}

fn decode_noise_control_enabled(f: &Fields<'_>) -> Result<Record> {
   Ok(
      NoiseControlEnabledInfo {
         enabled: f.bool("enabled")?,
      }
      .into(),
   )
}

fn decode_volume(f: &Fields<'_>) -> Result<Record> {
   Ok(
      VolumeInfo {
         volume: f.number("volume")?,
      }
      .into(),
   )
}

fn decode_sound_effect(f: &Fields<'_>) -> Result<Record> {
   Ok(
      SoundEffectInfo {
         enabled: f.bool("enabled")?,
         room: f.enumerated("room_size")?,
         angle: f.enumerated("angle")?,
      }
      .into(),
   )
}

fn decode_metadata(f: &Fields<'_>) -> Result<Record> {
   Ok(
      MetadataInfo {
         playing: f.bool("playing")?,
         title: f.optional("title"),
         artist: f.optional("artist"),
         album: f.optional("album"),
         genre: f.optional("genre"),
      }
      .into(),
   )
}

fn decode_color(f: &Fields<'_>) -> Result<Record> {
   Ok(
      ColorInfo {
         color: f.enumerated("value")?,
      }
      .into(),
   )
}

fn decode_head_detection(f: &Fields<'_>) -> Result<Record> {
   Ok(
      HeadDetectionInfo {
         enabled: f.bool("enabled")?,
      }
      .into(),
   )
}

fn decode_flight_mode(f: &Fields<'_>) -> Result<Record> {
   Ok(
      FlightModeInfo {
         enabled: f.bool("enabled")?,
      }
      .into(),
   )
}

fn decode_bluetooth(f: &Fields<'_>) -> Result<Record> {
   Ok(
      BluetoothInfo {
         friendly_name: f.str("friendlyname")?.into(),
      }
      .into(),
   )
}

fn decode_auto_connection(f: &Fields<'_>) -> Result<Record> {
   Ok(
      AutoConnectionInfo {
         enabled: f.bool("enabled")?,
      }
      .into(),
   )
}

fn decode_equalizer(f: &Fields<'_>) -> Result<Record> {
   Ok(
      EqualizerInfo {
         enabled: f.bool("enabled")?,
      }
      .into(),
   )
}

fn decode_smart_audio_tune(f: &Fields<'_>) -> Result<Record> {
   Ok(
      SmartAudioTuneInfo {
         enabled: f.bool("enabled")?,
      }
      .into(),
   )
}

fn decode_auto_power_off(f: &Fields<'_>) -> Result<Record> {
   Ok(
      AutoPowerOffInfo {
         minutes: f.number("value")?,
      }
      .into(),
   )
}

fn decode_tts(f: &Fields<'_>) -> Result<Record> {
   Ok(
      TtsInfo {
         enabled: f.bool("enabled")?,
      }
      .into(),
   )
}

#[cfg(test)]
mod tests {
   use strum::VariantArray;

   use super::*;
   use crate::zik::protocol::API_ROOT;

   fn answer(path: &str, body: &str) -> Document {
      let xml = format!(r#"<?xml version="1.0" encoding="UTF-8" ?><answer path="{path}/get">{body}</answer>"#);
      Document::parse(xml.as_bytes()).unwrap()
   }

   #[test]
   fn test_extract_battery() {
      let doc = answer(
         API_SYSTEM_BATTERY,
         r#"<system><battery state="discharging" percent="42"/></system>"#,
      );
      let record = extract(&doc, RecordKind::Battery).unwrap().unwrap();
      assert_eq!(
         record,
         Record::Battery(BatteryInfo {
            state: BatteryState::Reported("discharging".into()),
            percentage: 42,
         })
      );
      assert_eq!(record.kind(), RecordKind::Battery);
   }

   #[test]
   fn test_battery_edge_values() {
      let doc = answer(
         API_SYSTEM_BATTERY,
         r#"<system><battery state="charging" percent=""/></system>"#,
      );
      let info: BatteryInfo = extract_info(&doc).unwrap().unwrap();
      assert_eq!(info.percentage, 0);
      assert_eq!(info.state.as_str(), "charging");

      let doc = answer(
         API_SYSTEM_BATTERY,
         r#"<system><battery state="" percent="10"/></system>"#,
      );
      let info: BatteryInfo = extract_info(&doc).unwrap().unwrap();
      assert_eq!(info.state, BatteryState::Unknown);

      let doc = answer(
         API_SYSTEM_BATTERY,
         r#"<system><battery state="in_use" percent="150"/></system>"#,
      );
      assert!(matches!(
         extract(&doc, RecordKind::Battery),
         Err(ZikError::MalformedRecord {
            kind: RecordKind::Battery,
            ..
         })
      ));
   }

   #[test]
   fn test_extract_noise_control() {
      let doc = answer(
         API_AUDIO_NOISE_CONTROL,
         r#"<audio><noise_control type="anc" value="2"/></audio>"#,
      );
      let info: NoiseControlInfo = extract_info(&doc).unwrap().unwrap();
      assert_eq!(info.mode, NoiseControlMode::Anc);
      assert_eq!(info.strength, 2);
      assert!(info.enabled);

      let doc = answer(
         API_AUDIO_NOISE_CONTROL,
         r#"<audio><noise_control type="off" value="1" enabled="false"/></audio>"#,
      );
      let info: NoiseControlInfo = extract_info(&doc).unwrap().unwrap();
      assert_eq!(info.mode, NoiseControlMode::Off);
      assert!(!info.enabled);
   }

   #[test]
   fn test_unknown_enum_value_is_reported() {
      let doc = answer(
         API_AUDIO_NOISE_CONTROL,
         r#"<audio><noise_control type="bogus" value="2"/></audio>"#,
      );
      match extract(&doc, RecordKind::NoiseControl) {
         Err(ZikError::UnknownEnumValue(value)) => assert_eq!(value, "bogus"),
         other => panic!("expected UnknownEnumValue, got {other:?}"),
      }

      let doc = answer(
         API_AUDIO_SOUND_EFFECT,
         r#"<audio><sound_effect enabled="true" room_size="stadium" angle="90"/></audio>"#,
      );
      assert!(matches!(
         extract(&doc, RecordKind::SoundEffect),
         Err(ZikError::UnknownEnumValue(v)) if v == "stadium"
      ));
   }

   #[test]
   fn test_noise_control_enabled_shares_node() {
      let doc = answer(
         API_AUDIO_NOISE_CONTROL_ENABLED,
         r#"<audio><noise_control enabled="true"/></audio>"#,
      );
      let info: NoiseControlEnabledInfo = extract_info(&doc).unwrap().unwrap();
      assert!(info.enabled);

      // The same node lacks the attributes the mode decoder expects.
      assert!(matches!(
         extract(&doc, RecordKind::NoiseControl),
         Err(ZikError::MalformedRecord { .. })
      ));
   }

   #[test]
   fn test_absent_subtree_is_not_an_error() {
      let doc = answer(API_SYSTEM_COLOR, r#"<system><color value="black"/></system>"#);
      assert_eq!(extract(&doc, RecordKind::Battery).unwrap(), None);
      assert_eq!(extract(&doc, RecordKind::Volume).unwrap(), None);
      assert!(doc.find_subtree(RecordKind::Battery.node_path()).is_none());

      let info: ColorInfo = extract_info(&doc).unwrap().unwrap();
      assert_eq!(info.color, Color::Black);
   }

   #[test]
   fn test_missing_attribute_is_malformed() {
      let doc = answer(API_AUDIO_VOLUME, r#"<audio><volume max="120"/></audio>"#);
      match extract(&doc, RecordKind::Volume) {
         Err(ZikError::MalformedRecord { kind, reason }) => {
            assert_eq!(kind, RecordKind::Volume);
            assert!(reason.contains("volume"), "reason was: {reason}");
         },
         other => panic!("expected MalformedRecord, got {other:?}"),
      }

      let doc = answer(API_FLIGHT_MODE, r#"<flight_mode enabled="yes"/>"#);
      assert!(matches!(
         extract(&doc, RecordKind::FlightMode),
         Err(ZikError::MalformedRecord { .. })
      ));
   }

   #[test]
   fn test_error_document_rejects_every_kind() {
      let doc = Document::parse(br#"<answer path="/api/audio/volume/get"><error/></answer>"#).unwrap();
      for kind in RecordKind::VARIANTS {
         match extract(&doc, *kind) {
            Err(ZikError::DeviceRejected { path, method }) => {
               assert_eq!(path, API_AUDIO_VOLUME);
               assert_eq!(method, Method::Get);
            },
            other => panic!("{kind}: expected DeviceRejected, got {other:?}"),
         }
      }
   }

   #[test]
   fn test_extract_is_idempotent() {
      let doc = answer(
         API_AUDIO_TRACK_METADATA,
         r#"<audio><track><metadata playing="true" title="Hey Jude" artist="The Beatles" album="" genre="Rock"/></track></audio>"#,
      );
      let first = extract(&doc, RecordKind::Metadata).unwrap();
      let second = extract(&doc, RecordKind::Metadata).unwrap();
      assert_eq!(first, second);

      let Some(Record::Metadata(info)) = first else {
         panic!("expected metadata");
      };
      assert!(info.playing);
      assert_eq!(info.title.as_deref(), Some("Hey Jude"));
      assert_eq!(info.album, None);
      assert_eq!(info.genre.as_deref(), Some("Rock"));
   }

   #[test]
   fn test_sound_effect_and_friends() {
      let doc = answer(
         API_AUDIO_SOUND_EFFECT,
         r#"<audio><sound_effect enabled="false" room_size="jazz" angle="120"/></audio>"#,
      );
      let info: SoundEffectInfo = extract_info(&doc).unwrap().unwrap();
      assert_eq!(
         info,
         SoundEffectInfo {
            enabled: false,
            room: Room::Jazz,
            angle: Angle::Deg120,
         }
      );

      let doc = answer(API_SYSTEM_PI, r#"<system pi="PI040316AB1234"/>"#);
      let info: SystemInfo = extract_info(&doc).unwrap().unwrap();
      assert_eq!(info.serial_number, "PI040316AB1234");

      let doc = answer(API_SOFTWARE_VERSION, r#"<software sip6="2.05" tts="true"/>"#);
      let info: SoftwareInfo = extract_info(&doc).unwrap().unwrap();
      assert_eq!(info.version, "2.05");

      let doc = answer(API_SYSTEM_AUTO_POWER_OFF, r#"<system><auto_power_off value="30"/></system>"#);
      let info: AutoPowerOffInfo = extract_info(&doc).unwrap().unwrap();
      assert_eq!(info.minutes, 30);
   }

   #[test]
   fn test_registry_paths_are_consistent() {
      for kind in RecordKind::VARIANTS {
         assert!(kind.request_path().starts_with(API_ROOT), "{kind}");
         assert!(!kind.node_path().starts_with(API_ROOT), "{kind}");
         assert_eq!(kind.to_str().parse::<RecordKind>().unwrap(), *kind);
      }
      assert_eq!(RecordKind::NoiseControlEnabled.to_str(), "noise-control-enabled");
   }

   #[test]
   fn test_records_serialize_flat() {
      let record = Record::NoiseControl(NoiseControlInfo {
         enabled: true,
         mode: NoiseControlMode::Aoc,
         strength: 1,
      });
      assert_eq!(
         serde_json::to_value(&record).unwrap(),
         serde_json::json!({"enabled": true, "mode": "aoc", "strength": 1})
      );
   }
}
