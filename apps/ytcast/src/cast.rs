//! Casting workflow: select a device, wake it, launch YouTube, play videos.

use std::time::Duration;

use futures::StreamExt;
use tokio::time::Instant;
use ytcast_core::protocol_constants::{YOUTUBE_DIAL_APP_NAME, YOUTUBE_ORIGIN};
use ytcast_core::utils::url_host;
use ytcast_core::{
    screen_id_from_additional_data, AppState, CastError, CastResult, Device, DialClient,
    LoungeApi, Remote,
};

/// Knobs of one casting run.
#[derive(Debug, Clone)]
pub struct CastOptions {
    /// Maximum time to wait for the app to expose a screen id.
    pub launch_timeout: Duration,
    /// Delay between two app state checks.
    pub launch_check_interval: Duration,
    /// Name displayed on the TV.
    pub display_name: String,
    /// Queue the videos instead of replacing the playlist.
    pub add: bool,
}

/// Returns `ytcast@<hostname>`, or plain `ytcast` if the hostname is unknown.
pub fn default_display_name() -> String {
    match hostname::get() {
        Ok(host) if !host.is_empty() => format!("ytcast@{}", host.to_string_lossy()),
        _ => "ytcast".to_string(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Device Selection
// ─────────────────────────────────────────────────────────────────────────────

/// Runs one discovery round and returns the devices sorted by friendly name.
pub async fn discover_devices(client: &DialClient, window: Duration) -> CastResult<Vec<Device>> {
    let mut devices: Vec<Device> = client.discover(window).await?.collect().await;
    devices.sort_by(|a, b| a.friendly_name.cmp(&b.friendly_name));
    Ok(devices)
}

/// Finds the first device whose friendly name, host or unique service name
/// contains `name` (case-insensitive), trying each field in that order.
pub fn match_device<'a>(devices: &'a [Device], name: &str) -> Option<&'a Device> {
    let name = name.trim().to_lowercase();
    let fields: [fn(&Device) -> String; 3] = [
        |d| d.friendly_name.clone(),
        |d| url_host(&d.application_url),
        |d| d.unique_service_name.clone(),
    ];
    fields.iter().find_map(|field| {
        devices
            .iter()
            .find(|d| field(d).to_lowercase().contains(&name))
    })
}

/// Like [`match_device`], failing with [`CastError::DeviceNotFound`].
pub fn select_device<'a>(devices: &'a [Device], name: &str) -> CastResult<&'a Device> {
    match_device(devices, name).ok_or_else(|| CastError::DeviceNotFound(name.trim().to_string()))
}

/// One-line summary of a device for listings.
pub fn device_line(device: &Device) -> String {
    let mut info = vec![url_host(&device.application_url)];
    if device.wakeup.is_supported() {
        info.push("wol".to_string());
    }
    format!("{:<30} {}", format!("{:?}", device.friendly_name), info.join(" "))
}

// ─────────────────────────────────────────────────────────────────────────────
// Workflow
// ─────────────────────────────────────────────────────────────────────────────

/// Wakes `device` up if it does not answer.
pub async fn ensure_awake(client: &DialClient, device: &mut Device) -> CastResult<()> {
    if client.ping(device).await {
        return Ok(());
    }
    log::info!("{:?} is not awake, trying to wake it up", device.friendly_name);
    client.try_wakeup(device).await?;
    Ok(())
}

/// Launches YouTube on `device` until it exposes a screen id.
///
/// The app is launched at most once; after that its state is polled until
/// it reports a screen id or `launch_timeout` elapses.
pub async fn launch_youtube(
    client: &DialClient,
    device: &Device,
    options: &CastOptions,
) -> CastResult<String> {
    let deadline = Instant::now() + options.launch_timeout;
    let mut launched = false;

    loop {
        let info = client
            .get_app_info(device, YOUTUBE_DIAL_APP_NAME, Some(YOUTUBE_ORIGIN))
            .await?;
        log::info!(
            "{} is {} on {:?}",
            YOUTUBE_DIAL_APP_NAME,
            info.state,
            device.friendly_name
        );

        match &info.state {
            AppState::Running => {
                let screen_id = screen_id_from_additional_data(&info.additional_data)?;
                if !screen_id.is_empty() {
                    return Ok(screen_id);
                }
                log::debug!("screenId not available yet");
            }
            AppState::Stopped | AppState::Hidden if !launched => {
                client
                    .launch(device, YOUTUBE_DIAL_APP_NAME, Some(YOUTUBE_ORIGIN), "")
                    .await?;
                launched = true;
            }
            AppState::Stopped | AppState::Hidden => {}
            state => return Err(CastError::UnknownAppState(state.to_string())),
        }

        if Instant::now() + options.launch_check_interval > deadline {
            return Err(CastError::LaunchTimeout);
        }
        tokio::time::sleep(options.launch_check_interval).await;
    }
}

/// Plays or queues `videos` on the screen of `remote`.
pub async fn send_videos(remote: &mut Remote, videos: &[String], add: bool) -> CastResult<()> {
    if add {
        remote.add(videos).await?;
    } else {
        remote.play(videos).await?;
    }
    Ok(())
}

/// Full run against an already selected device.
pub async fn cast_to_device(
    client: &DialClient,
    lounge: &LoungeApi,
    device: &mut Device,
    videos: &[String],
    options: &CastOptions,
) -> CastResult<()> {
    ensure_awake(client, device).await?;
    let screen_id = launch_youtube(client, device, options).await?;

    log::info!("Connecting to {:?} via YouTube Lounge", device.friendly_name);
    let mut remote = lounge.connect(&screen_id, &options.display_name).await?;
    send_videos(&mut remote, videos, options.add).await
}

/// Pairs with the TV showing `code` and sends `videos` to it.
pub async fn cast_with_code(
    lounge: &LoungeApi,
    code: &str,
    videos: &[String],
    options: &CastOptions,
) -> CastResult<()> {
    let mut remote = lounge.pair_with_code(code, &options.display_name).await?;
    log::info!(
        "Paired with {:?}",
        remote.screen_name().unwrap_or(remote.screen_id())
    );
    send_videos(&mut remote, videos, options.add).await
}
