use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use sha1::{Digest, Sha1};
use tokio::sync::Mutex;
use tracing::{debug, trace, warn};

use crate::pages::{INDEX_PAGE, LOGIN_MARKER, LOGIN_PAGE, LOGIN_RPC};
use crate::{Error, Result};

pub const DEFAULT_USERNAME: &str = "xcc";
pub const DEFAULT_PASSWORD: &str = "xcc";

/// Authenticated HTTP session against one controller.
///
/// The controller keys the session on a `SoftPLC` cookie handed out by
/// the login page; the cookie jar carries it on every later request.
/// Fetches may run concurrently; when one of them hits an expired
/// session, re-login is serialized so a burst of failures produces a
/// single handshake.
pub struct XccSession {
    http: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
    relogin: Mutex<()>,
    generation: AtomicU64,
}

impl XccSession {
    pub fn new(
        base_url: String,
        username: String,
        password: String,
        fetch_timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .pool_max_idle_per_host(1)
            .timeout(fetch_timeout)
            .build()?;
        Ok(Self {
            http,
            base_url,
            username,
            password,
            relogin: Mutex::new(()),
            generation: AtomicU64::new(0),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Perform the login handshake and verify the session works.
    pub async fn connect(&self) -> Result<()> {
        self.login().await?;
        self.probe().await
    }

    /// GET the login page for a fresh `SoftPLC` cookie, then POST the
    /// username and the SHA-1 of session-id + password to the login RPC.
    /// The controller answers a successful login with anything but the
    /// login page itself.
    async fn login(&self) -> Result<()> {
        let url = format!("{}/{}", self.base_url, LOGIN_PAGE);
        debug!(url = %url, "requesting session cookie");

        let resp = self.http.get(&url).send().await.map_err(map_send_error(LOGIN_PAGE))?;
        let session_id = resp
            .headers()
            .get_all(reqwest::header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find_map(extract_softplc_cookie)
            .ok_or_else(|| Error::AuthFailed("no SoftPLC cookie in login page response".to_string()))?;

        let mut hasher = Sha1::new();
        hasher.update(session_id.as_bytes());
        hasher.update(self.password.as_bytes());
        let passhash = hex::encode(hasher.finalize());

        let rpc_url = format!("{}/{}", self.base_url, LOGIN_RPC);
        let resp = self
            .http
            .post(&rpc_url)
            .form(&[("USER", self.username.as_str()), ("PASS", passhash.as_str())])
            .send()
            .await
            .map_err(map_send_error(LOGIN_RPC))?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() || body.contains(LOGIN_MARKER) {
            return Err(Error::AuthFailed(format!(
                "login RPC returned status {status}"
            )));
        }

        self.generation.fetch_add(1, Ordering::SeqCst);
        debug!("session established");
        Ok(())
    }

    /// Fetch a cheap authenticated page to confirm the session is live.
    async fn probe(&self) -> Result<()> {
        let url = format!("{}/{}", self.base_url, INDEX_PAGE);
        let resp = self.http.get(&url).send().await.map_err(map_send_error(INDEX_PAGE))?;
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() || body.contains(LOGIN_MARKER) || body.contains("500") {
            return Err(Error::AuthFailed(format!(
                "session probe on {INDEX_PAGE} failed with status {status}"
            )));
        }
        Ok(())
    }

    /// Fetch one XML page as decoded, sanitized text. A login-page body
    /// means the session expired: re-login once and retry.
    pub async fn fetch_page(&self, page: &str) -> Result<String> {
        let body = self.fetch_once(page).await?;
        if !body.contains(LOGIN_MARKER) {
            return Ok(body);
        }

        warn!(page, "session expired, re-authenticating");
        self.relogin_serialized().await?;

        let body = self.fetch_once(page).await?;
        if body.contains(LOGIN_MARKER) {
            return Err(Error::SessionExpired(page.to_string()));
        }
        Ok(body)
    }

    /// Write one property value. Uses the same expired-session retry as
    /// page fetches.
    pub async fn write_value(&self, page: &str, prop: &str, value: &str) -> Result<()> {
        let body = self.write_once(page, prop, value).await?;
        if !body.contains(LOGIN_MARKER) {
            return Ok(());
        }

        warn!(page, prop, "session expired during write, re-authenticating");
        self.relogin_serialized().await?;

        let body = self.write_once(page, prop, value).await?;
        if body.contains(LOGIN_MARKER) {
            return Err(Error::SessionExpired(page.to_string()));
        }
        Ok(())
    }

    async fn fetch_once(&self, page: &str) -> Result<String> {
        let url = format!("{}/{}", self.base_url, page);
        trace!(url = %url, "fetching page");

        let resp = self.http.get(&url).send().await.map_err(map_send_error(page))?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::PageNotFound(page.to_string()));
        }
        let resp = resp.error_for_status()?;
        let bytes = resp.bytes().await.map_err(map_send_error(page))?;
        Ok(sanitize(&decode_body(&bytes)))
    }

    async fn write_once(&self, page: &str, prop: &str, value: &str) -> Result<String> {
        let url = format!("{}/{}", self.base_url, page);
        debug!(url = %url, prop, value, "writing value");

        let resp = self
            .http
            .post(&url)
            .form(&[("param", prop), ("value", value)])
            .send()
            .await
            .map_err(map_send_error(page))?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::PageNotFound(page.to_string()));
        }
        let resp = resp.error_for_status()?;
        Ok(resp.text().await?)
    }

    /// Re-login at most once per expiry, however many fetches observed
    /// it: the first caller through the lock refreshes the session, the
    /// rest see a bumped generation and return immediately.
    async fn relogin_serialized(&self) -> Result<()> {
        let observed = self.generation.load(Ordering::SeqCst);
        let _guard = self.relogin.lock().await;
        if self.generation.load(Ordering::SeqCst) != observed {
            trace!("session already refreshed by another task");
            return Ok(());
        }
        self.login().await
    }
}

fn map_send_error(page: &str) -> impl Fn(reqwest::Error) -> Error + '_ {
    move |e| {
        if e.is_timeout() {
            Error::Timeout(page.to_string())
        } else {
            Error::Http(e)
        }
    }
}

fn extract_softplc_cookie(header: &str) -> Option<String> {
    let rest = header.trim_start().strip_prefix("SoftPLC=")?;
    let id = rest.split(';').next()?.trim();
    (!id.is_empty()).then(|| id.to_string())
}

/// Decode a page body honoring the encoding its XML prolog declares.
/// The controller serves windows-1250 on older firmware.
fn decode_body(bytes: &[u8]) -> String {
    let prolog = String::from_utf8_lossy(&bytes[..bytes.len().min(200)]).into_owned();
    let encoding = prolog
        .split("encoding=")
        .nth(1)
        .and_then(|rest| {
            let rest = rest.strip_prefix(['"', '\''])?;
            rest.split(['"', '\'']).next()
        })
        .and_then(|label| encoding_rs::Encoding::for_label(label.as_bytes()))
        .unwrap_or(encoding_rs::UTF_8);

    let (text, _, _) = encoding.decode(bytes);
    text.into_owned()
}

/// Strip characters the firmware sprinkles into labels that break
/// string comparison: non-breaking spaces become plain spaces and
/// zero-width characters disappear.
fn sanitize(text: &str) -> String {
    text.chars()
        .filter_map(|c| match c {
            '\u{00a0}' => Some(' '),
            '\u{200b}' | '\u{feff}' => None,
            c => Some(c),
        })
        .collect()
}
