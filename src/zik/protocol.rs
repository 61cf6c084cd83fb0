//! Zik protocol definitions and data structures.
//!
//! This module contains the API paths, request methods, the enumerations
//! used by the headset together with their wire strings, and the encoding of
//! request payloads.

use std::{fmt, str};

use serde::{Serialize, Serializer};

use crate::zik::frame::{Frame, FrameKind};

/// Prefix shared by every request path.
pub const API_ROOT: &str = "/api";

pub const API_SYSTEM_PI: &str = "/api/system/pi";
pub const API_SYSTEM_BATTERY: &str = "/api/system/battery";
pub const API_SYSTEM_COLOR: &str = "/api/system/color";
pub const API_SYSTEM_HEAD_DETECTION_ENABLED: &str = "/api/system/head_detection/enabled";
pub const API_SYSTEM_AUTO_CONNECTION_ENABLED: &str = "/api/system/auto_connection/enabled";
pub const API_SYSTEM_AUTO_POWER_OFF: &str = "/api/system/auto_power_off";
pub const API_SOFTWARE_VERSION: &str = "/api/software/version";
pub const API_SOFTWARE_TTS: &str = "/api/software/tts";
pub const API_AUDIO_SOURCE: &str = "/api/audio/source";
pub const API_AUDIO_VOLUME: &str = "/api/audio/volume";
pub const API_AUDIO_NOISE_CONTROL: &str = "/api/audio/noise_control";
pub const API_AUDIO_NOISE_CONTROL_ENABLED: &str = "/api/audio/noise_control/enabled";
pub const API_AUDIO_SOUND_EFFECT: &str = "/api/audio/sound_effect";
pub const API_AUDIO_SOUND_EFFECT_ENABLED: &str = "/api/audio/sound_effect/enabled";
pub const API_AUDIO_SOUND_EFFECT_ROOM_SIZE: &str = "/api/audio/sound_effect/room_size";
pub const API_AUDIO_SOUND_EFFECT_ANGLE: &str = "/api/audio/sound_effect/angle";
pub const API_AUDIO_TRACK_METADATA: &str = "/api/audio/track/metadata";
pub const API_AUDIO_EQUALIZER_ENABLED: &str = "/api/audio/equalizer/enabled";
pub const API_AUDIO_SMART_AUDIO_TUNE: &str = "/api/audio/smart_audio_tune";
pub const API_BLUETOOTH_FRIENDLY_NAME: &str = "/api/bluetooth/friendlyname";
pub const API_FLIGHT_MODE: &str = "/api/flight_mode";

/// Verb appended to a request path.
#[derive(
   Debug,
   Clone,
   Copy,
   PartialEq,
   Eq,
   Hash,
   strum::Display,
   strum::EnumString,
   strum::IntoStaticStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum Method {
   Get,
   Set,
   Enable,
   Disable,
}

impl Method {
   pub fn to_str(self) -> &'static str {
      self.into()
   }
}

/// Noise control modes supported by the Zik.
#[derive(
   Debug,
   Clone,
   Copy,
   PartialEq,
   Eq,
   Serialize,
   strum::Display,
   strum::EnumString,
   strum::IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum NoiseControlMode {
   Off,
   #[serde(rename = "anc")]
   #[strum(serialize = "anc")]
   Anc,
   #[serde(rename = "aoc")]
   #[strum(serialize = "aoc")]
   Aoc,
}

impl NoiseControlMode {
   pub fn to_str(self) -> &'static str {
      self.into()
   }
}

/// Virtual room used by the concert hall sound effect.
#[derive(
   Debug,
   Clone,
   Copy,
   PartialEq,
   Eq,
   Serialize,
   strum::Display,
   strum::EnumString,
   strum::IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Room {
   Unknown,
   Silent,
   Living,
   Jazz,
   Concert,
}

impl Room {
   pub fn to_str(self) -> &'static str {
      self.into()
   }
}

/// Listening angle of the concert hall sound effect, in degrees.
#[derive(
   Debug,
   Clone,
   Copy,
   PartialEq,
   Eq,
   strum::Display,
   strum::EnumString,
   strum::IntoStaticStr,
)]
pub enum Angle {
   #[strum(serialize = "0")]
   Deg0,
   #[strum(serialize = "30")]
   Deg30,
   #[strum(serialize = "60")]
   Deg60,
   #[strum(serialize = "90")]
   Deg90,
   #[strum(serialize = "120")]
   Deg120,
   #[strum(serialize = "150")]
   Deg150,
   #[strum(serialize = "180")]
   Deg180,
}

impl Angle {
   pub const fn degrees(self) -> u16 {
      match self {
         Self::Deg0 => 0,
         Self::Deg30 => 30,
         Self::Deg60 => 60,
         Self::Deg90 => 90,
         Self::Deg120 => 120,
         Self::Deg150 => 150,
         Self::Deg180 => 180,
      }
   }

   pub fn to_str(self) -> &'static str {
      self.into()
   }
}

impl Serialize for Angle {
   fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
      serializer.serialize_u16(self.degrees())
   }
}

/// Housing color reported by the headset.
#[derive(
   Debug,
   Clone,
   Copy,
   PartialEq,
   Eq,
   Serialize,
   strum::Display,
   strum::EnumString,
   strum::IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Color {
   Unknown,
   Black,
   Blue,
}

/// Wire form of a boolean request argument.
pub const fn bool_arg(value: bool) -> &'static str {
   if value { "true" } else { "false" }
}

/// A logical request: `path`, `method` and an optional argument string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
   pub path: String,
   pub method: Method,
   pub args: Option<String>,
}

impl fmt::Display for Request {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      write!(f, "{}/{}", self.path, self.method)?;
      if let Some(args) = &self.args {
         write!(f, "?arg={args}")?;
      }
      Ok(())
   }
}

impl Request {
   pub fn new(path: impl Into<String>, method: Method, args: Option<&str>) -> Self {
      Self {
         path: path.into(),
         method,
         args: args.map(str::to_owned),
      }
   }

   pub fn get(path: impl Into<String>) -> Self {
      Self::new(path, Method::Get, None)
   }

   /// Serializes the request into a frame payload.
   ///
   /// Arguments are sent verbatim; multi-argument values such as
   /// `anc&value=2` are composed by the caller.
   pub fn encode_payload(&self) -> Vec<u8> {
      format!("GET {self}").into_bytes()
   }

   /// Parses a payload produced by [`Request::encode_payload`].
   pub fn parse_payload(payload: &[u8]) -> Option<Self> {
      let text = str::from_utf8(payload).ok()?;
      let rest = text.strip_prefix("GET ")?;
      let (target, args) = match rest.split_once('?') {
         Some((target, query)) => (target, Some(query.strip_prefix("arg=")?)),
         None => (rest, None),
      };
      let (path, method) = target.rsplit_once('/')?;
      Some(Self::new(path, method.parse().ok()?, args))
   }

   pub fn to_frame(&self) -> Frame {
      Frame::new(FrameKind::Request, self.encode_payload())
   }
}
