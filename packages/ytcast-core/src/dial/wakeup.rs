//! Wake-on-LAN recovery for sleeping DIAL devices.
//!
//! Two loops run side by side until the wake budget is spent:
//! - magic packets are sent every `check_interval`, whatever the checks do
//! - checks ping the device and, if it is still silent, run a short
//!   re-discovery looking for the same unique service name (the device may
//!   come back on a new address)

use std::convert::Infallible;
use std::net::SocketAddr;
use std::time::Duration;

use futures::StreamExt;
use tokio::time::{interval, sleep_until, Instant, MissedTickBehavior};

use super::client::DialClient;
use super::types::{DialError, DialResult, Device, DiscoveryResult};
use crate::utils::clamp_duration;
use crate::wol;

/// How a check found the device again.
enum Awake {
    /// The device answered on its known location.
    Pinged,
    /// The device answered discovery, possibly on a new address.
    Rediscovered(Device),
}

impl DialClient {
    /// Tries to wake `device` up and waits for it to become reachable.
    ///
    /// The budget is twice the advertised wake timeout, clamped into
    /// `[min_timeout, max_timeout]`; the call never outlives it. If the
    /// device is found again through discovery, `device` is replaced with
    /// the fresh record.
    ///
    /// # Errors
    ///
    /// - [`DialError::NoMac`] if the device did not advertise a MAC address
    /// - [`DialError::Wol`] if the MAC address cannot be parsed
    /// - [`DialError::WakeupFailed`] if the budget elapses
    pub async fn try_wakeup(&self, device: &mut Device) -> DialResult<()> {
        if !device.wakeup.is_supported() {
            return Err(DialError::NoMac);
        }
        wol::parse_mac(&device.wakeup.mac)?;

        let config = &self.config().wakeup;
        let budget = clamp_duration(
            device.wakeup.timeout.saturating_mul(2),
            config.min_timeout,
            config.max_timeout,
        );
        let deadline = Instant::now() + budget;

        log::info!(
            "[DIAL] Waking up {:?} ({}), budget {}ms",
            device.friendly_name,
            device.wakeup.mac,
            budget.as_millis()
        );

        let awake = tokio::select! {
            never = send_magic_packets(&device.wakeup.mac, config.broadcast_addr, config.check_interval) => {
                match never {}
            }
            awake = self.check_until_awake(device, config.check_interval) => Some(awake),
            _ = sleep_until(deadline) => None,
        };

        match awake {
            Some(Awake::Pinged) => {
                log::info!("[DIAL] {:?} is awake", device.friendly_name);
                Ok(())
            }
            Some(Awake::Rediscovered(found)) => {
                log::info!(
                    "[DIAL] {:?} rediscovered at {}",
                    found.friendly_name,
                    found.location
                );
                *device = found;
                Ok(())
            }
            None => {
                log::warn!(
                    "[DIAL] {:?} did not wake up within {}ms",
                    device.friendly_name,
                    budget.as_millis()
                );
                Err(DialError::WakeupFailed)
            }
        }
    }

    /// Pings then re-discovers `device` every `every` until one succeeds.
    async fn check_until_awake(&self, device: &Device, every: Duration) -> Awake {
        let mut ticks = interval(every);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticks.tick().await;

            if self.ping(device).await {
                return Awake::Pinged;
            }
            match self.rediscover(&device.unique_service_name).await {
                Ok(Some(found)) => return Awake::Rediscovered(found),
                Ok(None) => {}
                Err(e) => log::warn!("[DIAL] Re-discovery failed: {}", e),
            }
        }
    }

    /// Runs one short discovery round looking for `unique_service_name`.
    async fn rediscover(&self, unique_service_name: &str) -> DiscoveryResult<Option<Device>> {
        let mut devices = self
            .discover(self.config().wakeup.rediscover_timeout)
            .await?;
        while let Some(device) = devices.next().await {
            if device.unique_service_name == unique_service_name {
                return Ok(Some(device));
            }
        }
        Ok(None)
    }
}

/// Sends one magic packet every `every`, forever.
///
/// `mac` must already be valid: send failures are logged and retried on the
/// next tick.
async fn send_magic_packets(mac: &str, broadcast_addr: SocketAddr, every: Duration) -> Infallible {
    let mut ticks = interval(every);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut sent = 0u32;

    loop {
        ticks.tick().await;
        match wol::wake(mac, broadcast_addr).await {
            Ok(()) => sent += 1,
            Err(e) => log::warn!("[DIAL] Magic packet failed ({} sent so far): {}", sent, e),
        }
    }
}
