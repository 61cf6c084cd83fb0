//! Configuration management for `zikctl`.
//!
//! This module handles loading and saving configuration from disk,
//! including known headsets and connection parameters.

use std::{
   env, fs,
   path::{Path, PathBuf},
   time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::error::{Result, ZikError};

/// Main configuration structure.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Config {
   #[serde(default)]
   pub known_devices: Vec<KnownDevice>,

   /// Headset used when no address is given on the command line.
   #[serde(default, skip_serializing_if = "Option::is_none")]
   pub default_device: Option<String>,

   /// Adapter name such as `hci0`; the default adapter when unset.
   #[serde(default, skip_serializing_if = "Option::is_none")]
   pub adapter: Option<String>,

   #[serde(default = "default_connect_timeout")]
   pub connect_timeout_sec: u64,

   /// Read deadline on the control socket; reads block forever when unset.
   #[serde(default, skip_serializing_if = "Option::is_none")]
   pub read_timeout_sec: Option<u64>,

   /// Strength used when the mode changes and the headset reports none.
   #[serde(default = "default_noise_control_strength")]
   pub noise_control_strength: u8,
}

/// Represents a known Zik headset.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct KnownDevice {
   pub address: String,
   pub name: String,
}

const fn default_connect_timeout() -> u64 {
   10
}

const fn default_noise_control_strength() -> u8 {
   1
}

impl Default for Config {
   fn default() -> Self {
      Self {
         known_devices: vec![],
         default_device: None,
         adapter: None,
         connect_timeout_sec: default_connect_timeout(),
         read_timeout_sec: None,
         noise_control_strength: default_noise_control_strength(),
      }
   }
}

impl Config {
   /// Loads configuration from disk or creates default if not exists.
   pub fn load() -> Result<Self> {
      Self::load_from(&Self::config_path()?)
   }

   pub fn load_from(path: &Path) -> Result<Self> {
      if path.exists() {
         let contents = fs::read_to_string(path)?;
         Ok(toml::from_str(&contents)?)
      } else {
         let config = Self::default();
         config.save_to(path)?;
         Ok(config)
      }
   }

   /// Saves the current configuration to disk.
   pub fn save(&self) -> Result<()> {
      self.save_to(&Self::config_path()?)
   }

   pub fn save_to(&self, path: &Path) -> Result<()> {
      if let Some(parent) = path.parent() {
         fs::create_dir_all(parent)?;
      }

      let contents = toml::to_string_pretty(self)?;
      fs::write(path, contents)?;

      Ok(())
   }

   pub fn config_path() -> Result<PathBuf> {
      let var = |key: &str| env::var_os(key).filter(|v| !v.is_empty()).map(PathBuf::from);
      resolve_config_dir(var("ZIK_HOME"), var("XDG_CONFIG_HOME"), var("HOME"))
         .map(|dir| dir.join("zikctl").join("config.toml"))
         .ok_or(ZikError::ConfigDirNotFound)
   }

   /// Checks if the given address is a known device and returns its name.
   pub fn is_known_device(&self, address: &str) -> Option<&str> {
      self
         .known_devices
         .iter()
         .find(|d| d.address.eq_ignore_ascii_case(address))
         .map(|d| d.name.as_str())
   }

   pub const fn connect_timeout(&self) -> Duration {
      Duration::from_secs(self.connect_timeout_sec)
   }

   pub fn read_timeout(&self) -> Option<Duration> {
      self
         .read_timeout_sec
         .filter(|&secs| secs > 0)
         .map(Duration::from_secs)
   }
}

fn resolve_config_dir(
   zik_home: Option<PathBuf>,
   config_home: Option<PathBuf>,
   home: Option<PathBuf>,
) -> Option<PathBuf> {
   zik_home
      .or(config_home)
      .or_else(|| home.map(|home| home.join(".config")))
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn test_load_creates_default_file() {
      let dir = tempfile::tempdir().unwrap();
      let path = dir.path().join("zikctl").join("config.toml");

      let config = Config::load_from(&path).unwrap();
      assert_eq!(config, Config::default());
      assert!(path.exists());
      assert_eq!(config.connect_timeout(), Duration::from_secs(10));
      assert_eq!(config.read_timeout(), None);
      assert_eq!(config.noise_control_strength, 1);
   }

   #[test]
   fn test_save_then_load() {
      let dir = tempfile::tempdir().unwrap();
      let path = dir.path().join("config.toml");

      let config = Config {
         known_devices: vec![KnownDevice {
            address: "A0:14:3D:11:22:33".into(),
            name: "Zik 3".into(),
         }],
         default_device: Some("A0:14:3D:11:22:33".into()),
         adapter: Some("hci1".into()),
         read_timeout_sec: Some(5),
         ..Default::default()
      };
      config.save_to(&path).unwrap();

      let loaded = Config::load_from(&path).unwrap();
      assert_eq!(loaded, config);
      assert_eq!(loaded.is_known_device("a0:14:3d:11:22:33"), Some("Zik 3"));
      assert_eq!(loaded.is_known_device("00:00:00:00:00:00"), None);
      assert_eq!(loaded.read_timeout(), Some(Duration::from_secs(5)));
   }

   #[test]
   fn test_partial_file_uses_defaults() {
      let dir = tempfile::tempdir().unwrap();
      let path = dir.path().join("config.toml");
      fs::write(&path, "connect_timeout_sec = 3\nread_timeout_sec = 0\n").unwrap();

      let config = Config::load_from(&path).unwrap();
      assert_eq!(config.connect_timeout_sec, 3);
      assert_eq!(config.read_timeout(), None);
      assert!(config.known_devices.is_empty());
      assert_eq!(config.noise_control_strength, 1);
   }

   #[test]
   fn test_invalid_file_is_reported() {
      let dir = tempfile::tempdir().unwrap();
      let path = dir.path().join("config.toml");
      fs::write(&path, "connect_timeout_sec = \"soon\"").unwrap();

      assert!(matches!(
         Config::load_from(&path),
         Err(ZikError::TomlParse(_))
      ));
   }

   #[test]
   fn test_file_errors_are_io_errors() {
      let dir = tempfile::tempdir().unwrap();
      let blocker = dir.path().join("not-a-dir");
      fs::write(&blocker, "").unwrap();

      let err = Config::load_from(&blocker.join("config.toml")).unwrap_err();
      assert!(matches!(err, ZikError::Io(_)));
      assert!(!err.is_transport());
   }

   #[test]
   fn test_config_dir_precedence() {
      let p = |s: &str| Some(PathBuf::from(s));
      assert_eq!(
         resolve_config_dir(p("/zik"), p("/xdg"), p("/home/u")),
         p("/zik")
      );
      assert_eq!(resolve_config_dir(None, p("/xdg"), p("/home/u")), p("/xdg"));
      assert_eq!(
         resolve_config_dir(None, None, p("/home/u")),
         p("/home/u/.config")
      );
      assert_eq!(resolve_config_dir(None, None, None), None);
   }
}
