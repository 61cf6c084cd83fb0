//! `zikctl` - command line control for Parrot Zik headphones.
//!
//! Finds the headset through BlueZ, connects its RFCOMM control channel and
//! runs one command inside a session.

use std::{
   fmt::Write as _,
   io::{self, Read, Write},
};

use bluer::{Address, Session};
use clap::{ArgAction, ArgGroup, Parser, Subcommand, builder::BoolishValueParser};
use log::{info, warn};
use serde_json::{Value, json};
use zikctl::{
   Channel, RecordKind, Zik, ZikError,
   bluetooth::{self, recognition, rfcomm},
   config::Config,
   error::Result,
   zik::protocol::{Angle, NoiseControlMode, Room},
};

#[derive(Parser, Debug)]
#[command(name = "zikctl", version, about = "Control Parrot Zik headphones")]
struct Cli {
   /// Headset address; defaults to the configured device, then to the first
   /// connected Zik.
   #[arg(long, short, value_name = "ADDRESS", global = true)]
   address: Option<Address>,

   /// Bluetooth adapter to use, e.g. `hci0`.
   #[arg(long, value_name = "NAME", global = true)]
   adapter: Option<String>,

   /// Print JSON instead of text.
   #[arg(long, global = true)]
   json: bool,

   #[command(subcommand)]
   command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
enum Command {
   /// Sync the main facets and the battery, then print them.
   Info,
   /// Query one facet, e.g. `battery` or `noise-control`.
   Get { facet: RecordKind },
   /// Change a setting; the affected facets are read back.
   Set {
      #[command(subcommand)]
      setting: Setting,
   },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
enum Setting {
   /// Noise control mode (off, anc or aoc) and/or strength. The half left
   /// out keeps the headset's current value.
   #[command(group(
      ArgGroup::new("change")
         .args(["mode", "strength"])
         .required(true)
         .multiple(true)
   ))]
   NoiseControl {
      mode: Option<NoiseControlMode>,
      /// 1 or 2.
      #[arg(long)]
      strength: Option<u8>,
   },
   NoiseControlEnabled {
      #[arg(action = ArgAction::Set, value_parser = BoolishValueParser::new())]
      enabled: bool,
   },
   HeadDetection {
      #[arg(action = ArgAction::Set, value_parser = BoolishValueParser::new())]
      enabled: bool,
   },
   FlightMode {
      #[arg(action = ArgAction::Set, value_parser = BoolishValueParser::new())]
      enabled: bool,
   },
   FriendlyName {
      name: String,
   },
   SoundEffect {
      #[arg(action = ArgAction::Set, value_parser = BoolishValueParser::new())]
      enabled: bool,
   },
   /// Concert hall room: silent, living, jazz or concert.
   Room {
      room: Room,
   },
   /// Concert hall angle in degrees, a multiple of 30 up to 180.
   Angle {
      angle: Angle,
   },
   AutoConnection {
      #[arg(action = ArgAction::Set, value_parser = BoolishValueParser::new())]
      enabled: bool,
   },
   Equalizer {
      #[arg(action = ArgAction::Set, value_parser = BoolishValueParser::new())]
      enabled: bool,
   },
   SmartAudioTune {
      #[arg(action = ArgAction::Set, value_parser = BoolishValueParser::new())]
      enabled: bool,
   },
   /// Minutes of inactivity before powering off; 0 disables it.
   AutoPowerOff {
      minutes: u32,
   },
   Tts {
      #[arg(action = ArgAction::Set, value_parser = BoolishValueParser::new())]
      enabled: bool,
   },
}

#[tokio::main]
async fn main() -> Result<()> {
   env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

   let cli = Cli::parse();
   let config = Config::load()?;

   let session = Session::new().await?;
   let adapter_name = cli.adapter.as_deref().or(config.adapter.as_deref());
   let adapter = bluetooth::open_adapter(&session, adapter_name).await?;

   let address = match cli.address {
      Some(address) => Some(address),
      None => config
         .default_device
         .as_deref()
         .map(|s| {
            s.parse::<Address>()
               .map_err(|_| ZikError::InvalidArgument(format!("default_device '{s}'")))
         })
         .transpose()?,
   };
   let device = bluetooth::find_headset(&adapter, address).await?;
   let name = match config.is_known_device(&device.address().to_string()) {
      Some(name) => name.to_owned(),
      None => bluetooth::device_name(&device).await,
   };

   let service = recognition::control_service(&device).await;
   let (socket, _profile) =
      rfcomm::connect(&session, &device, service, config.connect_timeout()).await?;
   socket
      .set_read_timeout(config.read_timeout())
      .map_err(ZikError::Transport)?;
   info!("Connected to {name} ({})", device.address());

   let zik = Zik::new(name, device.address(), Channel::new(socket));
   let fallback_strength = config.noise_control_strength;
   let command = cli.command;
   let output = tokio::task::spawn_blocking(move || run_session(&zik, &command, fallback_strength))
      .await
      .map_err(io::Error::other)??;

   print!("{}", render(&output, cli.json));
   Ok(())
}

/// Runs `command` between `open_session` and `close_session`.
fn run_session<T: Read + Write>(
   zik: &Zik<T>,
   command: &Command,
   fallback_strength: u8,
) -> Result<Value> {
   zik.open_session()?;
   let result = execute(zik, command, fallback_strength);
   if let Err(e) = zik.close_session() {
      warn!("Failed to close session: {e}");
   }
   result
}

fn execute<T: Read + Write>(
   zik: &Zik<T>,
   command: &Command,
   fallback_strength: u8,
) -> Result<Value> {
   match command {
      Command::Info => {
         zik.sync_all()?;
         if let Err(e) = zik.sync_battery() {
            warn!("Failed to sync battery: {e}");
         }
         Ok(zik.to_json())
      },
      Command::Get { facet } => Ok(zik.sync(*facet)?.map_or(Value::Null, |r| json!(r))),
      Command::Set { setting } => {
         apply(zik, setting, fallback_strength)?;
         Ok(zik.to_json())
      },
   }
}

fn apply<T: Read + Write>(zik: &Zik<T>, setting: &Setting, fallback_strength: u8) -> Result<()> {
   match *setting {
      Setting::NoiseControl { mode, strength } => match (mode, strength) {
         (Some(mode), Some(strength)) => zik.set_noise_control(mode, strength),
         (Some(mode), None) => zik.set_noise_control_mode(mode, fallback_strength),
         (None, Some(strength)) => zik.set_noise_control_strength(strength),
         (None, None) => Err(ZikError::InvalidArgument(
            "noise control needs a mode or a strength".into(),
         )),
      },
      Setting::NoiseControlEnabled { enabled } => zik.set_noise_control_enabled(enabled),
      Setting::HeadDetection { enabled } => zik.set_head_detection(enabled),
      Setting::FlightMode { enabled } => zik.set_flight_mode(enabled),
      Setting::FriendlyName { ref name } => zik.set_friendly_name(name),
      Setting::SoundEffect { enabled } => zik.set_sound_effect_enabled(enabled),
      Setting::Room { room } => zik.set_room(room),
      Setting::Angle { angle } => zik.set_angle(angle),
      Setting::AutoConnection { enabled } => zik.set_auto_connection(enabled),
      Setting::Equalizer { enabled } => zik.set_equalizer(enabled),
      Setting::SmartAudioTune { enabled } => zik.set_smart_audio_tune(enabled),
      Setting::AutoPowerOff { minutes } => zik.set_auto_power_off(minutes),
      Setting::Tts { enabled } => zik.set_tts(enabled),
   }
}

fn render(value: &Value, as_json: bool) -> String {
   if as_json {
      format!("{value:#}\n")
   } else {
      render_text(value)
   }
}

/// Flattens a JSON value into `key.sub: value` lines.
fn render_text(value: &Value) -> String {
   fn walk(value: &Value, prefix: &str, out: &mut String) {
      match value {
         Value::Object(map) => {
            for (key, v) in map {
               let key = if prefix.is_empty() {
                  key.clone()
               } else {
                  format!("{prefix}.{key}")
               };
               walk(v, &key, out);
            }
         },
         Value::Null if prefix.is_empty() => out.push_str("no data\n"),
         Value::Null => {},
         Value::String(s) => {
            let _ = writeln!(out, "{prefix}: {s}");
         },
         other => {
            let _ = writeln!(out, "{prefix}: {other}");
         },
      }
   }

   let mut out = String::new();
   walk(value, "", &mut out);
   out
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn test_parse_info() {
      let cli = Cli::try_parse_from(["zikctl", "info", "--json"]).unwrap();
      assert_eq!(cli.command, Command::Info);
      assert!(cli.json);
      assert_eq!(cli.address, None);
   }

   #[test]
   fn test_parse_get_facet() {
      let cli = Cli::try_parse_from([
         "zikctl",
         "--address",
         "A0:14:3D:11:22:33",
         "get",
         "noise-control-enabled",
      ])
      .unwrap();
      assert_eq!(
         cli.command,
         Command::Get {
            facet: RecordKind::NoiseControlEnabled
         }
      );
      assert_eq!(
         cli.address,
         Some(Address::new([0xa0, 0x14, 0x3d, 0x11, 0x22, 0x33]))
      );

      assert!(Cli::try_parse_from(["zikctl", "get", "loudness"]).is_err());
   }

   #[test]
   fn test_parse_settings() {
      let cli = Cli::try_parse_from(["zikctl", "set", "noise-control", "anc", "--strength", "2"])
         .unwrap();
      assert_eq!(
         cli.command,
         Command::Set {
            setting: Setting::NoiseControl {
               mode: Some(NoiseControlMode::Anc),
               strength: Some(2)
            }
         }
      );

      let cli = Cli::try_parse_from(["zikctl", "set", "noise-control", "aoc"]).unwrap();
      assert_eq!(
         cli.command,
         Command::Set {
            setting: Setting::NoiseControl {
               mode: Some(NoiseControlMode::Aoc),
               strength: None
            }
         }
      );

      let cli = Cli::try_parse_from(["zikctl", "set", "noise-control", "--strength", "1"]).unwrap();
      assert_eq!(
         cli.command,
         Command::Set {
            setting: Setting::NoiseControl {
               mode: None,
               strength: Some(1)
            }
         }
      );
      assert!(Cli::try_parse_from(["zikctl", "set", "noise-control"]).is_err());

      let cli = Cli::try_parse_from(["zikctl", "set", "flight-mode", "on"]).unwrap();
      assert_eq!(
         cli.command,
         Command::Set {
            setting: Setting::FlightMode { enabled: true }
         }
      );

      let cli = Cli::try_parse_from(["zikctl", "set", "angle", "150"]).unwrap();
      assert_eq!(
         cli.command,
         Command::Set {
            setting: Setting::Angle {
               angle: Angle::Deg150
            }
         }
      );

      assert!(Cli::try_parse_from(["zikctl", "set", "angle", "45"]).is_err());
      assert!(Cli::try_parse_from(["zikctl", "set", "tts", "maybe"]).is_err());
   }

   #[test]
   fn test_render_text() {
      let value = json!({
         "address": "A0:14:3D:11:22:33",
         "battery": {"state": "in_use", "percentage": 80},
      });
      assert_eq!(
         render_text(&value),
         "address: A0:14:3D:11:22:33\nbattery.percentage: 80\nbattery.state: in_use\n"
      );
      assert_eq!(render_text(&Value::Null), "no data\n");
   }

   #[test]
   fn test_render_json_is_pretty() {
      let value = json!({"volume": {"volume": 60}});
      assert_eq!(
         render(&value, true),
         "{\n  \"volume\": {\n    \"volume\": 60\n  }\n}\n"
      );
      assert_eq!(render(&value, false), "volume.volume: 60\n");
   }
}
