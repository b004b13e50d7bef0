//! Lounge API client.
//!
//! [`LoungeApi`] opens sessions; [`Remote`] is one session bound to a
//! screen. A `Remote` is single-writer: every operation takes `&mut self`
//! because token, session ids and request counter are updated in place.
//!
//! # Request flow
//!
//! ```text
//! connect ──► get_lounge_token_batch ──► Remote
//! play/add ──► bind (session ids) ──► bind (setPlaylist | addVideo ...)
//! ```

use reqwest::header::{ORIGIN, USER_AGENT};
use reqwest::{Client, Method, StatusCode};

use super::bind::{
    add_video_form, command_query, extract_session_ids, session_form, session_query,
    set_playlist_form,
};
use super::types::{LoungeError, LoungeResult, LoungeToken, Screen, SessionIds};
use super::video::{parse_video, VideoRef};
use crate::config::{CoreConfig, LoungeConfig};
use crate::protocol_constants::{
    LOUNGE_BIND_PATH, LOUNGE_PAIRING_PATH, LOUNGE_TOKEN_PATH, YOUTUBE_ORIGIN, YOUTUBE_USER_AGENT,
};
use crate::utils::random_delay;

/// Entry point of the Lounge API.
///
/// Cheap to clone: the underlying HTTP connection pool is shared.
#[derive(Debug, Clone)]
pub struct LoungeApi {
    http: Client,
    config: LoungeConfig,
}

impl LoungeApi {
    /// Creates a client using the HTTP timeout and Lounge settings of `config`.
    pub fn new(config: &CoreConfig) -> Self {
        let http = Client::builder()
            .timeout(config.http_timeout)
            .build()
            .unwrap_or_else(|e| {
                log::warn!("[Lounge] Failed to build HTTP client, using defaults: {}", e);
                Client::default()
            });
        Self {
            http,
            config: config.lounge.clone(),
        }
    }

    /// Connects to `screen_id`, showing `name` on the screen.
    pub async fn connect(&self, screen_id: &str, name: &str) -> LoungeResult<Remote> {
        let mut remote = Remote {
            api: self.clone(),
            screen_id: screen_id.to_string(),
            name: name.to_string(),
            screen_name: None,
            token: LoungeToken::default(),
            session_ids: None,
            rid: 0,
        };
        remote.refresh_token().await?;
        log::info!("[Lounge] Connected to screen {}", screen_id);
        Ok(remote)
    }

    /// Pairs with the screen showing the TV `code` and connects to it.
    pub async fn pair_with_code(&self, code: &str, name: &str) -> LoungeResult<Remote> {
        let code: String = code
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-')
            .collect();
        let form = [("pairing_code", code.as_str())];
        let body = self
            .post(LOUNGE_PAIRING_PATH, &[] as &[(&str, String)], &form)
            .await?;
        let screen = Screen::from_pairing_response(&body)?;

        log::info!(
            "[Lounge] Paired with {:?} (screen {})",
            screen.name,
            screen.screen_id
        );
        Ok(Remote {
            api: self.clone(),
            token: screen.token(),
            screen_id: screen.screen_id,
            name: name.to_string(),
            screen_name: Some(screen.name).filter(|n| !n.is_empty()),
            session_ids: None,
            rid: 0,
        })
    }

    /// Sends one POST to `<api_base><path>`. Only status 200 is accepted.
    async fn post<Q, F>(&self, path: &str, query: &Q, form: &F) -> LoungeResult<String>
    where
        Q: serde::Serialize + ?Sized,
        F: serde::Serialize + ?Sized,
    {
        let url = format!("{}{}", self.config.api_base.trim_end_matches('/'), path);
        log::debug!("[Lounge] POST {}", url);

        let response = self
            .http
            .post(&url)
            .header(ORIGIN, YOUTUBE_ORIGIN)
            .header(USER_AGENT, YOUTUBE_USER_AGENT)
            .query(query)
            .form(form)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;

        if status != StatusCode::OK {
            return Err(LoungeError::BadStatus {
                method: Method::POST.to_string(),
                url,
                status: status.as_u16(),
            });
        }
        Ok(body)
    }
}

/// A session with one screen.
#[derive(Debug, Clone)]
pub struct Remote {
    api: LoungeApi,
    screen_id: String,
    name: String,
    screen_name: Option<String>,
    token: LoungeToken,
    session_ids: Option<SessionIds>,
    rid: u64,
}

impl Remote {
    /// Screen this session is bound to.
    pub fn screen_id(&self) -> &str {
        &self.screen_id
    }

    /// Name displayed on the screen.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name the screen reported when pairing with a code.
    pub fn screen_name(&self) -> Option<&str> {
        self.screen_name.as_deref()
    }

    /// Current token.
    pub fn token(&self) -> &LoungeToken {
        &self.token
    }

    /// Session ids fetched by the last play/add, if any.
    pub fn session_ids(&self) -> Option<&SessionIds> {
        self.session_ids.as_ref()
    }

    /// Returns true once the token is past its expiration.
    pub fn expired(&self) -> bool {
        self.token.expired()
    }

    /// Fetches a fresh token for the screen.
    pub async fn refresh_token(&mut self) -> LoungeResult<()> {
        let form = [("screen_ids", self.screen_id.as_str())];
        let body = self
            .api
            .post(LOUNGE_TOKEN_PATH, &[] as &[(&str, String)], &form)
            .await?;
        self.token = LoungeToken::from_batch_response(&body)?;
        log::debug!(
            "[Lounge] Token for {} expires at {}",
            self.screen_id,
            self.token.expiration_millis
        );
        Ok(())
    }

    /// Replaces the playlist with `videos` and starts playing the first one.
    ///
    /// Does nothing if `videos` is empty.
    pub async fn play<S: AsRef<str>>(&mut self, videos: &[S]) -> LoungeResult<()> {
        let videos: Vec<VideoRef> = videos.iter().map(|v| parse_video(v.as_ref())).collect();
        let Some(form) = set_playlist_form(&videos) else {
            return Ok(());
        };

        let ids = self.refresh_session_ids().await?;
        let rid = self.next_rid();
        let query = command_query(&self.token.value, &ids, rid);
        self.api.post(LOUNGE_BIND_PATH, &query, &form).await?;

        log::info!("[Lounge] Playing {} video(s) on {}", videos.len(), self.screen_id);
        Ok(())
    }

    /// Appends `videos` to the queue, one request per video.
    ///
    /// Each request is preceded by a random delay: back-to-back requests
    /// lose queue entries on the receiver.
    pub async fn add<S: AsRef<str>>(&mut self, videos: &[S]) -> LoungeResult<()> {
        if videos.is_empty() {
            return Ok(());
        }
        let ids = self.refresh_session_ids().await?;

        for (i, video) in videos.iter().enumerate() {
            let delay = random_delay(self.api.config.min_add_delay, self.api.config.max_add_delay);
            tokio::time::sleep(delay).await;

            let video = parse_video(video.as_ref());
            let rid = self.next_rid();
            let query = command_query(&self.token.value, &ids, rid);
            self.api
                .post(LOUNGE_BIND_PATH, &query, &add_video_form(i, &video))
                .await?;
            log::debug!("[Lounge] Queued {} on {}", video.id, self.screen_id);
        }

        log::info!("[Lounge] Queued {} video(s) on {}", videos.len(), self.screen_id);
        Ok(())
    }

    /// Opens a bind session and stores its ids.
    async fn refresh_session_ids(&mut self) -> LoungeResult<SessionIds> {
        let rid = self.next_rid();
        let query = session_query(&self.token.value, &self.name, rid);
        let body = self
            .api
            .post(LOUNGE_BIND_PATH, &query, &session_form())
            .await?;
        let ids = extract_session_ids(&body)?;
        self.session_ids = Some(ids.clone());
        Ok(ids)
    }

    fn next_rid(&mut self) -> u64 {
        self.rid += 1;
        self.rid
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use axum::extract::{Query, State};
    use axum::http::{HeaderMap, StatusCode as AxumStatus};
    use axum::routing::post;
    use axum::{Form, Router};

    use super::*;
    use crate::test_fixtures::serve;

    type Params = HashMap<String, String>;

    #[derive(Default)]
    struct MockLounge {
        /// (path, query, form, origin, user agent)
        requests: Mutex<Vec<(String, Params, Params, String, String)>>,
        fail_token: bool,
    }

    impl MockLounge {
        fn record(&self, path: &str, headers: &HeaderMap, query: Params, form: Params) {
            let header = |name: &str| {
                headers
                    .get(name)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string()
            };
            self.requests.lock().unwrap().push((
                path.to_string(),
                query,
                form,
                header("origin"),
                header("user-agent"),
            ));
        }

        fn requests(&self) -> Vec<(String, Params, Params, String, String)> {
            self.requests.lock().unwrap().clone()
        }
    }

    fn router(mock: Arc<MockLounge>) -> Router {
        async fn token(
            State(mock): State<Arc<MockLounge>>,
            headers: HeaderMap,
            Query(query): Query<Params>,
            Form(form): Form<Params>,
        ) -> (AxumStatus, String) {
            let screen = form.get("screen_ids").cloned().unwrap_or_default();
            mock.record("token", &headers, query, form);
            if mock.fail_token {
                return (AxumStatus::FORBIDDEN, String::new());
            }
            (
                AxumStatus::OK,
                format!(
                    r#"{{"screens":[{{"screenId":"{}","loungeToken":"tok-{}","expiration":{}}}]}}"#,
                    screen,
                    screen,
                    crate::utils::now_millis() + 60_000
                ),
            )
        }

        async fn pairing(
            State(mock): State<Arc<MockLounge>>,
            headers: HeaderMap,
            Query(query): Query<Params>,
            Form(form): Form<Params>,
        ) -> (AxumStatus, String) {
            let ok = form.get("pairing_code").map(String::as_str) == Some("123456789012");
            mock.record("pairing", &headers, query, form);
            if !ok {
                return (AxumStatus::NOT_FOUND, String::new());
            }
            (
                AxumStatus::OK,
                r#"{"screen":{"screenId":"paired","loungeToken":"tok-paired","expiration":1,"name":"YouTube on TV","deviceId":"d"}}"#
                    .to_string(),
            )
        }

        async fn bind(
            State(mock): State<Arc<MockLounge>>,
            headers: HeaderMap,
            Query(query): Query<Params>,
            Form(form): Form<Params>,
        ) -> String {
            let opening = !query.contains_key("SID");
            mock.record("bind", &headers, query, form);
            if opening {
                "270\n[[0,[\"c\",\"sid1\",\"\",8]]\n,[1,[\"S\",\"gs1\"]]\n,[2,[\"loungeStatus\",{}]]\n]"
                    .to_string()
            } else {
                "20\n[[3,[\"noop\"]]]".to_string()
            }
        }

        Router::new()
            .route("/pairing/get_lounge_token_batch", post(token))
            .route("/pairing/get_screen", post(pairing))
            .route("/bc/bind", post(bind))
            .with_state(mock)
    }

    async fn api(mock: Arc<MockLounge>) -> LoungeApi {
        let addr = serve(router(mock)).await;
        let mut config = CoreConfig::default();
        config.lounge.api_base = format!("http://{}/", addr);
        config.lounge.min_add_delay = Duration::from_millis(1);
        config.lounge.max_add_delay = Duration::from_millis(5);
        LoungeApi::new(&config)
    }

    #[tokio::test]
    async fn test_connect_fetches_token() {
        let mock = Arc::new(MockLounge::default());
        let remote = api(mock.clone()).await.connect("screen1", "tester").await.unwrap();

        assert_eq!(remote.screen_id(), "screen1");
        assert_eq!(remote.name(), "tester");
        assert_eq!(remote.token().value, "tok-screen1");
        assert!(!remote.expired());

        let requests = mock.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].2.get("screen_ids").map(String::as_str), Some("screen1"));
        assert_eq!(requests[0].3, YOUTUBE_ORIGIN);
        assert_eq!(requests[0].4, YOUTUBE_USER_AGENT);
    }

    #[tokio::test]
    async fn test_connect_bad_status() {
        let mock = Arc::new(MockLounge {
            fail_token: true,
            ..MockLounge::default()
        });
        let err = api(mock).await.connect("screen1", "tester").await.unwrap_err();
        assert!(matches!(err, LoungeError::BadStatus { status: 403, .. }));
    }

    #[tokio::test]
    async fn test_play_sends_set_playlist() {
        let mock = Arc::new(MockLounge::default());
        let mut remote = api(mock.clone()).await.connect("screen1", "tester").await.unwrap();

        remote
            .play(&["https://youtu.be/jNQXAC9IVRw?t=110", "k8vpB7GCYPE"])
            .await
            .unwrap();

        assert_eq!(
            remote.session_ids(),
            Some(&SessionIds {
                sid: "sid1".into(),
                gsessionid: "gs1".into()
            })
        );

        let requests = mock.requests();
        assert_eq!(requests.len(), 3);

        let (path, query, form, _, _) = &requests[1];
        assert_eq!(path, "bind");
        assert_eq!(query.get("RID").map(String::as_str), Some("1"));
        assert_eq!(query.get("name").map(String::as_str), Some("tester"));
        assert_eq!(query.get("loungeIdToken").map(String::as_str), Some("tok-screen1"));
        assert_eq!(form.get("count").map(String::as_str), Some("0"));

        let (path, query, form, _, _) = &requests[2];
        assert_eq!(path, "bind");
        assert_eq!(query.get("RID").map(String::as_str), Some("2"));
        assert_eq!(query.get("SID").map(String::as_str), Some("sid1"));
        assert_eq!(query.get("gsessionid").map(String::as_str), Some("gs1"));
        assert_eq!(form.get("req0__sc").map(String::as_str), Some("setPlaylist"));
        assert_eq!(form.get("req0_videoId").map(String::as_str), Some("jNQXAC9IVRw"));
        assert_eq!(form.get("req0_currentTime").map(String::as_str), Some("110"));
        assert_eq!(
            form.get("req0_videoIds").map(String::as_str),
            Some("jNQXAC9IVRw,k8vpB7GCYPE")
        );
    }

    #[tokio::test]
    async fn test_play_nothing_is_a_no_op() {
        let mock = Arc::new(MockLounge::default());
        let mut remote = api(mock.clone()).await.connect("screen1", "tester").await.unwrap();
        remote.play::<&str>(&[]).await.unwrap();
        remote.add::<&str>(&[]).await.unwrap();
        assert_eq!(mock.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_add_sends_one_request_per_video() {
        let mock = Arc::new(MockLounge::default());
        let mut remote = api(mock.clone()).await.connect("screen1", "tester").await.unwrap();

        remote.add(&["a1", "b2", "c3"]).await.unwrap();

        let requests = mock.requests();
        // token + session ids + 3 videos
        assert_eq!(requests.len(), 5);
        let rids: Vec<u64> = requests[1..]
            .iter()
            .map(|r| r.1.get("RID").and_then(|v| v.parse().ok()).unwrap())
            .collect();
        assert_eq!(rids, vec![1, 2, 3, 4]);

        for (i, id) in ["a1", "b2", "c3"].iter().enumerate() {
            let form = &requests[i + 2].2;
            assert_eq!(form.get(&format!("req{}__sc", i)).map(String::as_str), Some("addVideo"));
            assert_eq!(form.get(&format!("req{}_videoId", i)).map(String::as_str), Some(*id));
        }
    }

    #[tokio::test]
    async fn test_request_ids_keep_increasing_across_calls() {
        let mock = Arc::new(MockLounge::default());
        let mut remote = api(mock.clone()).await.connect("screen1", "tester").await.unwrap();

        remote.play(&["a1"]).await.unwrap();
        remote.play(&["b2"]).await.unwrap();

        let rids: Vec<String> = mock
            .requests()
            .iter()
            .filter_map(|r| r.1.get("RID").cloned())
            .collect();
        assert_eq!(rids, vec!["1", "2", "3", "4"]);
    }

    #[tokio::test]
    async fn test_pair_with_code() {
        let mock = Arc::new(MockLounge::default());
        let api = api(mock.clone()).await;

        let remote = api.pair_with_code("1234 5678-9012", "tester").await.unwrap();
        assert_eq!(remote.screen_id(), "paired");
        assert_eq!(remote.screen_name(), Some("YouTube on TV"));
        assert_eq!(remote.token().value, "tok-paired");
        assert!(remote.expired());

        let err = api.pair_with_code("000", "tester").await.unwrap_err();
        assert!(matches!(err, LoungeError::BadStatus { status: 404, .. }));
    }
}
