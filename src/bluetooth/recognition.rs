//! Device recognition logic for Parrot Zik headsets.
//!
//! This module contains the logic for recognizing Zik headsets based on
//! their advertised services, modalias and name/alias patterns, and for
//! choosing the control service to connect.

use uuid::Uuid;

/// Patterns to match Zik devices (case-insensitive)
const ZIK_PATTERNS: &[&str] = &["zik", "parrot"];

/// Parrot vendor ID
const PARROT_VID: u32 = 0x0043;

/// Control service of the Zik 2 and Zik 3
pub const ZIK_SERVICE: Uuid = Uuid::from_u128(0x8b6814d3_6ce7_4498_9700_9312c1711f63);

/// Control service of the first generation Zik
pub const ZIK1_SERVICE: Uuid = Uuid::from_u128(0x0ef0f502_f0ee_46c9_986c_54ed027807fb);

fn match_name(name: &str) -> Option<&'static str> {
   let name = name.to_ascii_lowercase();
   ZIK_PATTERNS.iter().copied().find(|p| name.contains(p))
}

/// Picks the control service among the UUIDs a device advertises.
pub fn select_service<'a>(uuids: impl IntoIterator<Item = &'a Uuid>) -> Option<Uuid> {
   let mut found = None;
   for uuid in uuids {
      if *uuid == ZIK_SERVICE {
         return Some(ZIK_SERVICE);
      } else if *uuid == ZIK1_SERVICE {
         found = Some(ZIK1_SERVICE);
      }
   }
   found
}

/// Control service to connect on `dev`, assuming a recent model when the
/// device does not advertise one.
pub async fn control_service(dev: &bluer::Device) -> Uuid {
   match dev.uuids().await {
      Ok(Some(uuids)) => select_service(&uuids).unwrap_or(ZIK_SERVICE),
      _ => ZIK_SERVICE,
   }
}

pub async fn is_device_zik(dev: &bluer::Device) -> bool {
   // 1. Check service UUIDs (definitive when found)
   if let Ok(Some(uuids)) = dev.uuids().await
      && select_service(&uuids).is_some()
   {
      log::debug!("Zik detected via service UUID");
      return true;
   }

   // 2. Check modalias
   if let Ok(Some(modalias)) = dev.modalias().await
      && modalias.vendor == PARROT_VID
   {
      log::debug!(
         "Zik detected via modalias: vendor={:#06x}, product={:#06x}",
         modalias.vendor,
         modalias.product
      );
      return true;
   }

   // 3. Last-chance name/alias pattern matching
   if let Ok(Some(name)) = dev.name().await
      && let Some(pattern) = match_name(&name)
   {
      log::debug!("Zik detected via name pattern: {name} => {pattern}");
      return true;
   }
   if let Ok(alias) = dev.alias().await
      && let Some(pattern) = match_name(&alias)
   {
      log::debug!("Zik detected via alias pattern: {alias} => {pattern}");
      return true;
   }
   false
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn test_match_name() {
      assert_eq!(match_name("Parrot ZIK 3"), Some("zik"));
      assert_eq!(match_name("PARROT"), Some("parrot"));
      assert_eq!(match_name("WH-1000XM4"), None);
   }

   #[test]
   fn test_select_service_prefers_recent_models() {
      let a2dp = Uuid::from_u128(0x0000110b_0000_1000_8000_00805f9b34fb);
      assert_eq!(select_service(&[a2dp]), None);
      assert_eq!(select_service(&[a2dp, ZIK1_SERVICE]), Some(ZIK1_SERVICE));
      assert_eq!(
         select_service(&[ZIK1_SERVICE, ZIK_SERVICE]),
         Some(ZIK_SERVICE)
      );
   }
}
