//! Bluetooth communication layer for Zik headsets.
//!
//! This module provides adapter and headset lookup, the RFCOMM transport
//! and the synchronous control channel running over it.

use bluer::{Adapter, Address, Device, Session};
use log::{debug, info};

use crate::error::{Result, ZikError};

pub mod channel;
pub mod recognition;
pub mod rfcomm;

/// Opens the named adapter, or the default one.
pub async fn open_adapter(session: &Session, name: Option<&str>) -> Result<Adapter> {
   let adapter = match name {
      Some(name) => {
         if !session.adapter_names().await?.iter().any(|n| n == name) {
            return Err(ZikError::AdapterNotFound);
         }
         session.adapter(name)?
      },
      None => session.default_adapter().await?,
   };
   debug!("Using adapter {}", adapter.name());
   Ok(adapter)
}

/// Looks up the headset at `address`, or the first connected Zik known to
/// the adapter.
pub async fn find_headset(adapter: &Adapter, address: Option<Address>) -> Result<Device> {
   let addresses = adapter.device_addresses().await?;

   if let Some(address) = address {
      if !addresses.contains(&address) {
         return Err(ZikError::DeviceNotFound(address));
      }
      return Ok(adapter.device(address)?);
   }

   for address in addresses {
      let device = adapter.device(address)?;
      if device.is_connected().await.unwrap_or(false) && recognition::is_device_zik(&device).await {
         info!("Found Zik headset at {address}");
         return Ok(device);
      }
   }
   Err(ZikError::NoDeviceFound)
}

/// Display name of a device, falling back to its address.
pub async fn device_name(device: &Device) -> String {
   match device.alias().await {
      Ok(alias) if !alias.is_empty() => alias,
      _ => device.address().to_string(),
   }
}
