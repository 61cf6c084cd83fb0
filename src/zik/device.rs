//! Zik device implementation and state management.
//!
//! [`Zik`] wraps the control channel of one headset and keeps the last
//! snapshot of every facet it has synced. Reads never touch the network:
//! `sync_<facet>()` performs the round trip and refreshes the snapshot,
//! `<facet>()` returns what was last seen.

use std::{
   collections::BTreeMap,
   io::{Read, Write},
};

use bluer::Address;
use log::{debug, info, warn};
use parking_lot::Mutex;
use serde_json::json;
use smol_str::{SmolStr, ToSmolStr};

use crate::{
   bluetooth::channel::{Channel, Reply},
   error::{Result, ZikError},
   zik::{
      info::{
         self, AutoConnectionInfo, AutoPowerOffInfo, BatteryInfo, BluetoothInfo, ColorInfo,
         EqualizerInfo, FlightModeInfo, HeadDetectionInfo, Info, MetadataInfo,
         NoiseControlEnabledInfo, NoiseControlInfo, Record, RecordKind, SmartAudioTuneInfo,
         SoftwareInfo, SoundEffectInfo, SourceInfo, SystemInfo, TtsInfo, VolumeInfo,
      },
      protocol::{
         API_AUDIO_EQUALIZER_ENABLED, API_AUDIO_NOISE_CONTROL, API_AUDIO_NOISE_CONTROL_ENABLED,
         API_AUDIO_SMART_AUDIO_TUNE, API_AUDIO_SOUND_EFFECT_ANGLE, API_AUDIO_SOUND_EFFECT_ENABLED,
         API_AUDIO_SOUND_EFFECT_ROOM_SIZE, API_BLUETOOTH_FRIENDLY_NAME, API_FLIGHT_MODE,
         API_SOFTWARE_TTS, API_SYSTEM_AUTO_CONNECTION_ENABLED, API_SYSTEM_AUTO_POWER_OFF,
         API_SYSTEM_HEAD_DETECTION_ENABLED, Angle, Method, NoiseControlMode, Room, bool_arg,
      },
   },
};

/// Facets refreshed when a session starts.
pub const INITIAL_SYNC: &[RecordKind] = &[
   RecordKind::System,
   RecordKind::Software,
   RecordKind::Source,
   RecordKind::Color,
   RecordKind::NoiseControl,
   RecordKind::NoiseControlEnabled,
];

/// Valid noise control strengths.
pub const NOISE_CONTROL_STRENGTH: std::ops::RangeInclusive<u8> = 1..=2;

/// Represents the result of an update operation on a cached snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum UpdateOp {
   /// No change occurred
   Noop,
   /// A new value was inserted (None -> Some)
   Inserted,
   /// An existing value was replaced
   Updated,
}

impl UpdateOp {
   fn new<T: PartialEq>(prev: Option<&T>, new: &T) -> Self {
      match prev {
         None => Self::Inserted,
         Some(p) if p == new => Self::Noop,
         Some(_) => Self::Updated,
      }
   }

   pub const fn is_updated(self) -> bool {
      matches!(self, Self::Inserted | Self::Updated)
   }
}

/// A Parrot Zik headset reachable over a control channel.
///
/// Every method takes `&self`; the channel is serialized behind a mutex so
/// only one request is ever in flight.
pub struct Zik<T> {
   address: Address,
   address_str: SmolStr,
   name: SmolStr,
   channel: Mutex<Channel<T>>,
   snapshots: Mutex<BTreeMap<RecordKind, Record>>,
}

impl<T> std::fmt::Debug for Zik<T> {
   fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
      f.debug_struct("Zik")
         .field("address", &self.address)
         .field("name", &self.name)
         .finish_non_exhaustive()
   }
}

macro_rules! facets {
   ($($getter:ident, $sync:ident => $ty:ty;)*) => {
      $(
         #[doc = concat!("Last synced [`", stringify!($ty), "`].")]
         pub fn $getter(&self) -> Option<$ty> {
            self.snapshot::<$ty>()
         }

         #[doc = concat!("Queries the headset for its [`", stringify!($ty), "`].")]
         pub fn $sync(&self) -> Result<Option<$ty>> {
            self.sync_info::<$ty>()
         }
      )*
   };
}

impl<T: Read + Write> Zik<T> {
   pub fn new(name: impl Into<SmolStr>, address: Address, channel: Channel<T>) -> Self {
      Self {
         address,
         address_str: address.to_smolstr(),
         name: name.into(),
         channel: Mutex::new(channel),
         snapshots: Mutex::new(BTreeMap::new()),
      }
   }

   pub const fn address(&self) -> Address {
      self.address
   }

   pub const fn address_str(&self) -> &SmolStr {
      &self.address_str
   }

   pub const fn name(&self) -> &SmolStr {
      &self.name
   }

   pub fn into_channel(self) -> Channel<T> {
      self.channel.into_inner()
   }

   pub fn open_session(&self) -> Result<()> {
      self.channel.lock().open_session()?;
      info!("{}: session opened", self.address_str);
      Ok(())
   }

   pub fn close_session(&self) -> Result<()> {
      self.channel.lock().close_session()?;
      info!("{}: session closed", self.address_str);
      Ok(())
   }

   /// Sends one raw request.
   pub fn request(&self, path: &str, method: Method, args: Option<&str>) -> Result<Reply> {
      self.channel.lock().send_request(path, method, args)
   }

   /// Refreshes the snapshot of `kind`.
   ///
   /// A reply without data for `kind` returns `Ok(None)` and leaves the
   /// previous snapshot in place.
   pub fn sync(&self, kind: RecordKind) -> Result<Option<Record>> {
      let reply = self.request(kind.request_path(), Method::Get, None)?;
      let Some(document) = reply.document() else {
         debug!("{}: {kind} answered without a document", self.address_str);
         return Ok(None);
      };
      let Some(record) = info::extract(document, kind)? else {
         debug!("{}: {kind} absent from reply", self.address_str);
         return Ok(None);
      };

      let op = {
         let mut snapshots = self.snapshots.lock();
         let op = UpdateOp::new(snapshots.get(&kind), &record);
         if op.is_updated() {
            snapshots.insert(kind, record.clone());
         }
         op
      };
      if op.is_updated() {
         debug!("{}: {kind} {op}: {record:?}", self.address_str);
      }
      Ok(Some(record))
   }

   pub fn sync_info<I: Info>(&self) -> Result<Option<I>> {
      let record = self.sync(I::KIND)?;
      Ok(record.as_ref().and_then(I::from_record).cloned())
   }

   /// Refreshes the facets needed right after connecting.
   ///
   /// A facet that fails to sync is logged and skipped. Transport failures
   /// abort the sync.
   pub fn sync_all(&self) -> Result<usize> {
      let mut synced = 0;
      for &kind in INITIAL_SYNC {
         match self.sync(kind) {
            Ok(Some(_)) => synced += 1,
            Ok(None) => warn!("{}: no {kind} in reply", self.address_str),
            Err(e) if e.is_transport() => return Err(e),
            Err(e) => warn!("{}: failed to sync {kind}: {e}", self.address_str),
         }
      }
      Ok(synced)
   }

   /// Cached snapshot of `kind`, without I/O.
   pub fn record(&self, kind: RecordKind) -> Option<Record> {
      self.snapshots.lock().get(&kind).cloned()
   }

   pub fn snapshot<I: Info>(&self) -> Option<I> {
      self.snapshots.lock().get(&I::KIND).and_then(I::from_record).cloned()
   }

   facets! {
      system, sync_system => SystemInfo;
      software, sync_software => SoftwareInfo;
      source, sync_source => SourceInfo;
      battery, sync_battery => BatteryInfo;
      noise_control, sync_noise_control => NoiseControlInfo;
      noise_control_enabled, sync_noise_control_enabled => NoiseControlEnabledInfo;
      volume, sync_volume => VolumeInfo;
      sound_effect, sync_sound_effect => SoundEffectInfo;
      metadata, sync_metadata => MetadataInfo;
      color, sync_color => ColorInfo;
      head_detection, sync_head_detection => HeadDetectionInfo;
      flight_mode, sync_flight_mode => FlightModeInfo;
      bluetooth, sync_bluetooth => BluetoothInfo;
      auto_connection, sync_auto_connection => AutoConnectionInfo;
      equalizer, sync_equalizer => EqualizerInfo;
      smart_audio_tune, sync_smart_audio_tune => SmartAudioTuneInfo;
      auto_power_off, sync_auto_power_off => AutoPowerOffInfo;
      tts, sync_tts => TtsInfo;
   }

   pub fn set_noise_control_enabled(&self, enabled: bool) -> Result<()> {
      self.apply(
         API_AUDIO_NOISE_CONTROL_ENABLED,
         Method::Set,
         Some(bool_arg(enabled)),
         &[RecordKind::NoiseControlEnabled, RecordKind::NoiseControl],
      )
   }

   pub fn set_noise_control(&self, mode: NoiseControlMode, strength: u8) -> Result<()> {
      check_strength(strength)?;
      let args = format!("{mode}&value={strength}");
      self.apply(
         API_AUDIO_NOISE_CONTROL,
         Method::Set,
         Some(&args),
         &[RecordKind::NoiseControl, RecordKind::NoiseControlEnabled],
      )
   }

   /// Changes the noise control mode and keeps the strength the headset
   /// reports. `fallback_strength` is sent when it reports none.
   pub fn set_noise_control_mode(
      &self,
      mode: NoiseControlMode,
      fallback_strength: u8,
   ) -> Result<()> {
      let strength = self
         .current_noise_control()?
         .map_or(fallback_strength, |nc| nc.strength);
      self.set_noise_control(mode, strength)
   }

   /// Changes the noise control strength and keeps the current mode.
   pub fn set_noise_control_strength(&self, strength: u8) -> Result<()> {
      check_strength(strength)?;
      let Some(current) = self.current_noise_control()? else {
         return Err(ZikError::InvalidArgument(
            "noise control mode unknown, set it together with the strength".into(),
         ));
      };
      self.set_noise_control(current.mode, strength)
   }

   /// Cached noise control state, synced first when nothing is cached.
   fn current_noise_control(&self) -> Result<Option<NoiseControlInfo>> {
      match self.noise_control() {
         Some(nc) => Ok(Some(nc)),
         None => self.sync_noise_control(),
      }
   }

   pub fn set_head_detection(&self, enabled: bool) -> Result<()> {
      self.apply(
         API_SYSTEM_HEAD_DETECTION_ENABLED,
         Method::Set,
         Some(bool_arg(enabled)),
         &[RecordKind::HeadDetection],
      )
   }

   pub fn set_flight_mode(&self, enabled: bool) -> Result<()> {
      self.apply(API_FLIGHT_MODE, toggle(enabled), None, &[RecordKind::FlightMode])
   }

   pub fn set_friendly_name(&self, name: &str) -> Result<()> {
      if name.is_empty() {
         return Err(ZikError::InvalidArgument("friendly name is empty".into()));
      }
      self.apply(
         API_BLUETOOTH_FRIENDLY_NAME,
         Method::Set,
         Some(name),
         &[RecordKind::Bluetooth],
      )
   }

   pub fn set_sound_effect_enabled(&self, enabled: bool) -> Result<()> {
      self.apply(
         API_AUDIO_SOUND_EFFECT_ENABLED,
         Method::Set,
         Some(bool_arg(enabled)),
         &[RecordKind::SoundEffect],
      )
   }

   pub fn set_room(&self, room: Room) -> Result<()> {
      self.apply(
         API_AUDIO_SOUND_EFFECT_ROOM_SIZE,
         Method::Set,
         Some(room.to_str()),
         &[RecordKind::SoundEffect],
      )
   }

   pub fn set_angle(&self, angle: Angle) -> Result<()> {
      self.apply(
         API_AUDIO_SOUND_EFFECT_ANGLE,
         Method::Set,
         Some(angle.to_str()),
         &[RecordKind::SoundEffect],
      )
   }

   pub fn set_auto_connection(&self, enabled: bool) -> Result<()> {
      self.apply(
         API_SYSTEM_AUTO_CONNECTION_ENABLED,
         Method::Set,
         Some(bool_arg(enabled)),
         &[RecordKind::AutoConnection],
      )
   }

   pub fn set_equalizer(&self, enabled: bool) -> Result<()> {
      self.apply(
         API_AUDIO_EQUALIZER_ENABLED,
         Method::Set,
         Some(bool_arg(enabled)),
         &[RecordKind::Equalizer],
      )
   }

   pub fn set_smart_audio_tune(&self, enabled: bool) -> Result<()> {
      self.apply(
         API_AUDIO_SMART_AUDIO_TUNE,
         Method::Set,
         Some(bool_arg(enabled)),
         &[RecordKind::SmartAudioTune],
      )
   }

   /// Sets the auto power off delay; 0 disables it.
   pub fn set_auto_power_off(&self, minutes: u32) -> Result<()> {
      let args = minutes.to_string();
      self.apply(
         API_SYSTEM_AUTO_POWER_OFF,
         Method::Set,
         Some(&args),
         &[RecordKind::AutoPowerOff],
      )
   }

   pub fn set_tts(&self, enabled: bool) -> Result<()> {
      self.apply(API_SOFTWARE_TTS, toggle(enabled), None, &[RecordKind::Tts])
   }

   /// Sends a setter, then reads back every facet it may have changed.
   fn apply(
      &self,
      path: &str,
      method: Method,
      args: Option<&str>,
      affected: &[RecordKind],
   ) -> Result<()> {
      info!(
         "{}: {path}/{method}{}",
         self.address_str,
         args.map(|a| format!(" {a}")).unwrap_or_default()
      );
      self.request(path, method, args)?;
      for &kind in affected {
         self.sync(kind)?;
      }
      Ok(())
   }

   /// Converts the cached state to a JSON representation.
   pub fn to_json(&self) -> serde_json::Value {
      let mut info = json!({
         "address": self.address_str.as_str(),
         "name": self.name.as_str(),
      });
      for (kind, record) in self.snapshots.lock().iter() {
         info[kind.to_str()] = json!(record);
      }
      info
   }
}

fn check_strength(strength: u8) -> Result<()> {
   if NOISE_CONTROL_STRENGTH.contains(&strength) {
      Ok(())
   } else {
      Err(ZikError::InvalidArgument(format!(
         "noise control strength {strength} not in 1..=2"
      )))
   }
}

const fn toggle(enabled: bool) -> Method {
   if enabled { Method::Enable } else { Method::Disable }
}
