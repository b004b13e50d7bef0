//! DIAL REST client.
//!
//! [`DialClient`] discovers DIAL servers and talks to the application
//! namespace exposed under each device's `Application-URL`.
//!
//! # Discovery
//!
//! `discover` fans out one worker per unique service (keyed by USN, first
//! seen wins) to fetch its device description. Workers run in a `JoinSet`
//! owned by a coordinator task which joins all of them before the device
//! stream closes. If the consumer drops the stream the coordinator aborts
//! the remaining workers.

use std::collections::HashSet;
use std::time::Duration;

use futures::StreamExt;
use reqwest::header::{HeaderMap, CONTENT_TYPE, LOCATION, ORIGIN};
use reqwest::{Client, Method, StatusCode};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_stream::wrappers::ReceiverStream;
use url::Url;

use super::ssdp;
use super::types::{
    AppInfo, DialError, DialResult, DiscoveredService, DiscoveryResult, Device, Wakeup,
};
use super::xml::{parse_app_info, parse_friendly_name};
use crate::config::CoreConfig;
use crate::protocol_constants::{
    DIAL_APPLICATION_URL_HEADER, DIAL_DEVICE_CHANNEL_CAPACITY, DIAL_PAYLOAD_CONTENT_TYPE,
    DIAL_SEARCH_TARGET, DIAL_WAKEUP_HEADER,
};
use crate::utils::url_join;

/// Client for DIAL discovery and application control.
///
/// Cheap to clone: the underlying HTTP connection pool is shared.
#[derive(Debug, Clone)]
pub struct DialClient {
    http: Client,
    config: CoreConfig,
}

impl DialClient {
    /// Creates a client using the timeouts and addresses of `config`.
    pub fn new(config: CoreConfig) -> Self {
        let http = Client::builder()
            .timeout(config.http_timeout)
            .build()
            .unwrap_or_else(|e| {
                log::warn!("[DIAL] Failed to build HTTP client, using defaults: {}", e);
                Client::default()
            });
        Self { http, config }
    }

    /// Returns the configuration this client was built with.
    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Discovery
    // ─────────────────────────────────────────────────────────────────────────

    /// Discovers DIAL devices for the given search window.
    ///
    /// Only fails if the SSDP search cannot be started. Devices whose
    /// description cannot be fetched or parsed are logged and skipped.
    pub async fn discover(&self, window: Duration) -> DiscoveryResult<ReceiverStream<Device>> {
        let services = ssdp::search(&self.config.ssdp, DIAL_SEARCH_TARGET, window).await?;
        let (tx, rx) = mpsc::channel(DIAL_DEVICE_CHANNEL_CAPACITY);

        let client = self.clone();
        tokio::spawn(async move { client.collect_devices(services, tx).await });

        Ok(ReceiverStream::new(rx))
    }

    /// Coordinator: dedups services, spawns one describe worker per unique
    /// service and joins them all before returning (dropping the last sender).
    async fn collect_devices(
        self,
        mut services: ReceiverStream<DiscoveredService>,
        tx: mpsc::Sender<Device>,
    ) {
        let mut seen = HashSet::new();
        let mut workers = JoinSet::new();
        let mut abandoned = false;

        loop {
            let service = tokio::select! {
                _ = tx.closed() => {
                    abandoned = true;
                    break;
                }
                next = services.next() => match next {
                    Some(service) => service,
                    None => break,
                },
            };

            if service.search_target != DIAL_SEARCH_TARGET {
                log::debug!(
                    "[DIAL] Ignoring {} answering for {}",
                    service.unique_service_name,
                    service.search_target
                );
                continue;
            }
            if !seen.insert(service.unique_service_name.clone()) {
                log::trace!("[DIAL] Duplicate response from {}", service.unique_service_name);
                continue;
            }

            let client = self.clone();
            let tx = tx.clone();
            workers.spawn(async move {
                match client.describe(&service).await {
                    Ok(device) => {
                        log::info!(
                            "[DIAL] Discovered {:?} at {}",
                            device.friendly_name,
                            device.application_url
                        );
                        // Fails only when the consumer is gone.
                        let _ = tx.send(device).await;
                    }
                    Err(e) => log::warn!(
                        "[DIAL] Skipping {} ({}): {}",
                        service.unique_service_name,
                        service.location,
                        e
                    ),
                }
            });
        }
        drop(services);

        if abandoned {
            workers.abort_all();
        }
        loop {
            tokio::select! {
                _ = tx.closed(), if !abandoned => {
                    workers.abort_all();
                    abandoned = true;
                }
                res = workers.join_next() => match res {
                    Some(Err(e)) if e.is_panic() => log::warn!("[DIAL] Describe worker panicked: {}", e),
                    Some(_) => {}
                    None => break,
                },
            }
        }

        log::debug!("[DIAL] Discovery round finished ({} unique services)", seen.len());
    }

    /// Fetches the description of `service` and builds a [`Device`].
    pub async fn describe(&self, service: &DiscoveredService) -> DialResult<Device> {
        log::debug!("[DIAL] GET {}", service.location);
        let response = self.http.get(&service.location).send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(DialError::BadStatus {
                method: Method::GET.to_string(),
                url: service.location.clone(),
                status: status.as_u16(),
            });
        }
        let application_url = response
            .headers()
            .get(DIAL_APPLICATION_URL_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().await?;

        parse_device(service, application_url.as_deref(), &body)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Application Control
    // ─────────────────────────────────────────────────────────────────────────

    /// Queries the state of `app_name` on `device`.
    pub async fn get_app_info(
        &self,
        device: &Device,
        app_name: &str,
        origin: Option<&str>,
    ) -> DialResult<AppInfo> {
        let url = app_url(device, app_name)?;
        let (_, body) = self.request(Method::GET, &url, origin, "", None).await?;
        parse_app_info(&body)
    }

    /// Launches `app_name` on `device`, returning the instance URL from the
    /// `Location` response header (empty if the server sent none).
    pub async fn launch(
        &self,
        device: &Device,
        app_name: &str,
        origin: Option<&str>,
        payload: &str,
    ) -> DialResult<String> {
        let url = app_url(device, app_name)?;
        let (headers, _) = self.request(Method::POST, &url, origin, payload, None).await?;
        let instance_url = headers
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        log::info!("[DIAL] Launched {} on {:?}", app_name, device.friendly_name);
        Ok(instance_url)
    }

    /// Stops the running instance described by `info`.
    ///
    /// The run link may be absolute or relative to `<applicationUrl>/<app>/`.
    pub async fn stop(
        &self,
        device: &Device,
        app_name: &str,
        info: &AppInfo,
        origin: Option<&str>,
    ) -> DialResult<()> {
        if !info.allow_stop {
            return Err(DialError::StopNotAllowed);
        }
        let run_link = info.run_link.as_deref().ok_or(DialError::MissingRunLink)?;

        let base = format!("{}/", app_url(device, app_name)?);
        let url = Url::parse(&base)
            .and_then(|b| b.join(run_link))
            .map_err(|source| DialError::InvalidUrl {
                url: run_link.to_string(),
                source,
            })?;

        self.request(Method::DELETE, url.as_str(), origin, "", None)
            .await?;
        log::info!("[DIAL] Stopped {} on {:?}", app_name, device.friendly_name);
        Ok(())
    }

    /// Returns true if the device answers HTTP on its description URL.
    ///
    /// Any response counts, including a bad status: only transport failures
    /// mean the device is not alive.
    pub async fn ping(&self, device: &Device) -> bool {
        match self
            .request(
                Method::GET,
                &device.location,
                None,
                "",
                Some(self.config.ping_timeout),
            )
            .await
        {
            Ok(_) | Err(DialError::BadStatus { .. }) => true,
            Err(e) => {
                log::debug!("[DIAL] Ping {} failed: {}", device.location, e);
                false
            }
        }
    }

    /// Sends one DIAL request. Any status outside 2xx is a `BadStatus` error.
    async fn request(
        &self,
        method: Method,
        url: &str,
        origin: Option<&str>,
        body: &str,
        timeout: Option<Duration>,
    ) -> DialResult<(HeaderMap, String)> {
        log::debug!("[DIAL] {} {}", method, url);

        let mut req = self.http.request(method.clone(), url);
        if let Some(origin) = origin.filter(|o| !o.is_empty()) {
            req = req.header(ORIGIN, origin);
        }
        if !body.is_empty() {
            req = req
                .header(CONTENT_TYPE, DIAL_PAYLOAD_CONTENT_TYPE)
                .body(body.to_string());
        }
        if let Some(timeout) = timeout {
            req = req.timeout(timeout);
        }

        let response = req.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(DialError::BadStatus {
                method: method.to_string(),
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok((headers, body))
    }
}

/// Joins a discovered service with its description into a [`Device`].
///
/// Requires a non-empty `Application-URL` and a `device/friendlyName`
/// element. A missing or malformed `WAKEUP` header yields the default
/// [`Wakeup`].
pub fn parse_device(
    service: &DiscoveredService,
    application_url: Option<&str>,
    description: &str,
) -> DialResult<Device> {
    let application_url = application_url
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or(DialError::MissingApplicationUrl)?;
    let friendly_name = parse_friendly_name(description)?;
    let wakeup = service
        .header(DIAL_WAKEUP_HEADER)
        .map(Wakeup::parse)
        .unwrap_or_default();

    Ok(Device {
        unique_service_name: service.unique_service_name.clone(),
        location: service.location.clone(),
        application_url: application_url.to_string(),
        friendly_name,
        wakeup,
    })
}

/// Builds `<applicationUrl>/<app_name>`.
fn app_url(device: &Device, app_name: &str) -> DialResult<String> {
    url_join(&device.application_url, app_name).map_err(|source| DialError::InvalidUrl {
        url: device.application_url.clone(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dial::types::AppState;
    use crate::test_fixtures::{
        app_info_xml, serve, spawn_ssdp_responder, ssdp_response, ssdp_response_for,
        test_config, DEVICE_DESCRIPTION,
    };
    use axum::http::{HeaderMap as AxumHeaders, StatusCode as AxumStatus};
    use axum::routing::{delete, get};
    use axum::Router;
    use std::sync::{Arc, Mutex};

    fn description_router(app_url: String) -> Router {
        Router::new()
            .route(
                "/dd.xml",
                get(move || {
                    let app_url = app_url.clone();
                    async move { ([("Application-URL", app_url)], DEVICE_DESCRIPTION) }
                }),
            )
            .route("/no-app-url.xml", get(|| async { DEVICE_DESCRIPTION }))
            .route(
                "/gone.xml",
                get(|| async { (AxumStatus::NOT_FOUND, "gone") }),
            )
    }

    fn service(location: &str, wakeup: Option<&str>) -> DiscoveredService {
        let mut headers = HeaderMap::new();
        if let Some(w) = wakeup {
            headers.insert("WAKEUP", w.parse().unwrap());
        }
        DiscoveredService {
            unique_service_name: "uuid:tv".into(),
            location: location.into(),
            search_target: DIAL_SEARCH_TARGET.into(),
            headers,
        }
    }

    fn device(addr: std::net::SocketAddr) -> Device {
        Device {
            unique_service_name: "uuid:tv".into(),
            location: format!("http://{}/dd.xml", addr),
            application_url: format!("http://{}/apps/", addr),
            friendly_name: "Living Room TV".into(),
            wakeup: Wakeup::default(),
        }
    }

    #[test]
    fn test_parse_device() {
        let svc = service(
            "http://192.168.1.27:8008/ssdp/device-desc.xml",
            Some("MAC=10:dd:b1:c9:00:e4;Timeout=10"),
        );
        let device = parse_device(
            &svc,
            Some(" http://192.168.1.27:8008/apps/ "),
            DEVICE_DESCRIPTION,
        )
        .unwrap();
        assert_eq!(device.unique_service_name, "uuid:tv");
        assert_eq!(device.location, "http://192.168.1.27:8008/ssdp/device-desc.xml");
        assert_eq!(device.application_url, "http://192.168.1.27:8008/apps/");
        assert_eq!(device.friendly_name, "Living Room TV");
        assert_eq!(device.wakeup.mac, "10:dd:b1:c9:00:e4");
        assert_eq!(device.wakeup.timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_parse_device_requires_application_url() {
        let svc = service("http://x/dd.xml", None);
        for header in [None, Some(""), Some("   ")] {
            assert!(matches!(
                parse_device(&svc, header, DEVICE_DESCRIPTION),
                Err(DialError::MissingApplicationUrl)
            ));
        }
    }

    #[test]
    fn test_parse_device_without_wakeup() {
        let svc = service("http://x/dd.xml", Some("garbage"));
        let device = parse_device(&svc, Some("http://x/apps"), DEVICE_DESCRIPTION).unwrap();
        assert_eq!(device.wakeup, Wakeup::default());
    }

    #[tokio::test]
    async fn test_describe() {
        let addr = serve(description_router("http://tv/apps/".into())).await;
        let client = DialClient::new(test_config(addr));

        let ok = client
            .describe(&service(&format!("http://{}/dd.xml", addr), None))
            .await
            .unwrap();
        assert_eq!(ok.application_url, "http://tv/apps/");

        let missing = client
            .describe(&service(&format!("http://{}/no-app-url.xml", addr), None))
            .await;
        assert!(matches!(missing, Err(DialError::MissingApplicationUrl)));

        let gone = client
            .describe(&service(&format!("http://{}/gone.xml", addr), None))
            .await;
        assert!(matches!(gone, Err(DialError::BadStatus { status: 404, .. })));
    }

    #[tokio::test]
    async fn test_discover_dedups_and_skips_failures() {
        let http = serve(description_router("http://tv/apps/".into())).await;
        let good = format!("http://{}/dd.xml", http);
        let broken = format!("http://{}/no-app-url.xml", http);
        let responder = spawn_ssdp_responder(vec![
            ssdp_response(&good, "uuid:tv", &[("WAKEUP", "MAC=10:dd:b1:c9:00:e4;Timeout=10")]),
            ssdp_response(&good, "uuid:tv", &[]),
            ssdp_response(&broken, "uuid:broken", &[]),
            ssdp_response_for("upnp:rootdevice", &good, "uuid:other", &[]),
        ])
        .await;

        let client = DialClient::new(test_config(responder));
        let devices: Vec<Device> = client
            .discover(Duration::from_secs(1))
            .await
            .unwrap()
            .collect()
            .await;

        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].unique_service_name, "uuid:tv");
        assert_eq!(devices[0].friendly_name, "Living Room TV");
        assert!(devices[0].wakeup.is_supported());
    }

    #[tokio::test]
    async fn test_discover_consumer_can_leave_early() {
        let http = serve(description_router("http://tv/apps/".into())).await;
        let good = format!("http://{}/dd.xml", http);
        let responder = spawn_ssdp_responder(
            (0..20)
                .map(|i| ssdp_response(&good, &format!("uuid:tv-{}", i), &[]))
                .collect(),
        )
        .await;

        let client = DialClient::new(test_config(responder));
        let mut stream = client.discover(Duration::from_secs(1)).await.unwrap();
        assert!(stream.next().await.is_some());
        drop(stream);
    }

    #[derive(Default)]
    struct AppServer {
        requests: Mutex<Vec<(String, Option<String>, Option<String>, String)>>,
    }

    type Recorded = (Method, AxumHeaders, String);

    fn record(state: &AppServer, (method, headers, body): Recorded) {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        state.requests.lock().unwrap().push((
            method.to_string(),
            header("origin"),
            header("content-type"),
            body,
        ));
    }

    fn app_router(state: Arc<AppServer>) -> Router {
        let on_get = state.clone();
        let on_post = state.clone();
        let on_delete = state;

        Router::new()
            .route(
                "/apps/YouTube",
                get(
                    move |method: Method, headers: AxumHeaders, body: String| async move {
                        record(&on_get, (method, headers, body));
                        app_info_xml("running", "<screenId>abc</screenId>")
                    },
                )
                .post(
                    move |method: Method, headers: AxumHeaders, body: String| async move {
                        record(&on_post, (method, headers, body));
                        (
                            AxumStatus::CREATED,
                            [("Location", "http://tv/apps/YouTube/run")],
                        )
                    },
                ),
            )
            .route(
                "/apps/YouTube/run",
                delete(
                    move |method: Method, headers: AxumHeaders, body: String| async move {
                        record(&on_delete, (method, headers, body));
                    },
                ),
            )
            .route("/apps/Missing", get(|| async { AxumStatus::NOT_FOUND }))
    }

    #[tokio::test]
    async fn test_get_app_info_launch_and_stop() {
        let state = Arc::new(AppServer::default());
        let addr = serve(app_router(state.clone())).await;
        let client = DialClient::new(test_config(addr));
        let dev = device(addr);

        let info = client
            .get_app_info(&dev, "YouTube", Some("https://www.youtube.com"))
            .await
            .unwrap();
        assert_eq!(info.state, AppState::Running);
        assert_eq!(info.run_link.as_deref(), Some("run"));

        let instance = client
            .launch(&dev, "YouTube", None, "v=abc")
            .await
            .unwrap();
        assert_eq!(instance, "http://tv/apps/YouTube/run");

        client.stop(&dev, "YouTube", &info, None).await.unwrap();

        let requests = state.requests.lock().unwrap().clone();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].0, "GET");
        assert_eq!(requests[0].1.as_deref(), Some("https://www.youtube.com"));
        assert_eq!(requests[1].0, "POST");
        assert_eq!(requests[1].1, None);
        assert_eq!(requests[1].2.as_deref(), Some(DIAL_PAYLOAD_CONTENT_TYPE));
        assert_eq!(requests[1].3, "v=abc");
        assert_eq!(requests[2].0, "DELETE");
    }

    #[tokio::test]
    async fn test_get_app_info_bad_status() {
        let addr = serve(app_router(Arc::new(AppServer::default()))).await;
        let client = DialClient::new(test_config(addr));

        let err = client
            .get_app_info(&device(addr), "Missing", None)
            .await
            .unwrap_err();
        assert!(matches!(err, DialError::BadStatus { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_stop_preconditions() {
        let client = DialClient::new(CoreConfig::default());
        let dev = device("127.0.0.1:9".parse().unwrap());
        let mut info = AppInfo {
            name: "YouTube".into(),
            state: AppState::Running,
            allow_stop: false,
            run_link: Some("run".into()),
            additional_data: String::new(),
        };
        assert!(matches!(
            client.stop(&dev, "YouTube", &info, None).await,
            Err(DialError::StopNotAllowed)
        ));

        info.allow_stop = true;
        info.run_link = None;
        assert!(matches!(
            client.stop(&dev, "YouTube", &info, None).await,
            Err(DialError::MissingRunLink)
        ));
    }

    #[tokio::test]
    async fn test_ping() {
        let addr = serve(
            Router::new().route("/dd.xml", get(|| async { AxumStatus::INTERNAL_SERVER_ERROR })),
        )
        .await;
        let client = DialClient::new(test_config(addr));
        assert!(client.ping(&device(addr)).await);

        // Nothing listens on a freshly released port.
        let closed = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };
        assert!(!client.ping(&device(closed)).await);
    }
}
