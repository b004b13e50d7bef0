//! Lounge session types and errors.

use serde::Deserialize;
use thiserror::Error;

use crate::utils::now_millis;

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Errors that can occur while talking to the Lounge API.
#[derive(Debug, Error)]
pub enum LoungeError {
    /// HTTP request failed at the transport level (connect, DNS, timeout).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Lounge API answered with a status other than 200.
    #[error("{method} {url}: bad HTTP status {status}")]
    BadStatus {
        method: String,
        url: String,
        status: u16,
    },

    /// Response body is not the expected JSON.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// `additionalData` could not be parsed as XML.
    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Token response has an empty or missing `screens` array.
    #[error("missing screens array")]
    NoScreens,

    /// First screen of the token response has no `loungeToken`.
    #[error("missing loungeToken")]
    NoToken,

    /// Bind response lacks the `c` or `S` record.
    #[error("missing session ids")]
    MissingSessionIds,

    /// Pairing response has no `screen` object.
    #[error("missing screen")]
    NoScreen,

    /// Pairing response has a screen without `screenId`.
    #[error("missing screenId")]
    NoScreenId,
}

/// Convenient Result alias for Lounge operations.
pub type LoungeResult<T> = Result<T, LoungeError>;

// ─────────────────────────────────────────────────────────────────────────────
// Token
// ─────────────────────────────────────────────────────────────────────────────

/// Screen-bound token authorizing Lounge requests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoungeToken {
    pub value: String,
    /// Expiration as a Unix timestamp in milliseconds.
    pub expiration_millis: u64,
}

impl LoungeToken {
    /// Returns true once the current time is past the expiration.
    pub fn expired(&self) -> bool {
        self.expired_at(now_millis())
    }

    /// Returns true if `now_millis` is past the expiration.
    pub fn expired_at(&self, now_millis: u64) -> bool {
        now_millis > self.expiration_millis
    }

    /// Parses a `get_lounge_token_batch` response, keeping the first screen.
    pub fn from_batch_response(body: &str) -> LoungeResult<Self> {
        #[derive(Deserialize)]
        struct Batch {
            #[serde(default)]
            screens: Vec<ScreenToken>,
        }

        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct ScreenToken {
            #[serde(default)]
            lounge_token: String,
            #[serde(default)]
            expiration: u64,
        }

        let batch: Batch = serde_json::from_str(body)?;
        let first = batch.screens.into_iter().next().ok_or(LoungeError::NoScreens)?;
        if first.lounge_token.is_empty() {
            return Err(LoungeError::NoToken);
        }
        Ok(Self {
            value: first.lounge_token,
            expiration_millis: first.expiration,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Session
// ─────────────────────────────────────────────────────────────────────────────

/// Ephemeral identifiers of a bind session.
///
/// The service may rotate them at any time, so they are fetched again
/// before every play/add.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionIds {
    /// Session id (`c` record).
    pub sid: String,
    /// Google session id (`S` record).
    pub gsessionid: String,
}

/// A screen returned by the pairing-code endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Screen {
    pub screen_id: String,
    pub lounge_token: String,
    pub expiration: u64,
    pub name: String,
    pub device_id: String,
}

impl Screen {
    /// Parses a `get_screen` response (`{"screen": {...}}`).
    pub fn from_pairing_response(body: &str) -> LoungeResult<Self> {
        #[derive(Deserialize)]
        struct Pairing {
            screen: Option<Screen>,
        }

        let pairing: Pairing = serde_json::from_str(body)?;
        let screen = pairing.screen.ok_or(LoungeError::NoScreen)?;
        if screen.screen_id.is_empty() {
            return Err(LoungeError::NoScreenId);
        }
        if screen.lounge_token.is_empty() {
            return Err(LoungeError::NoToken);
        }
        Ok(screen)
    }

    /// Token carried by this screen.
    pub fn token(&self) -> LoungeToken {
        LoungeToken {
            value: self.lounge_token.clone(),
            expiration_millis: self.expiration,
        }
    }
}
