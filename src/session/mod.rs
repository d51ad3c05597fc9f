//! Router web interface session handling.
//!
//! [`RouterClient`] drives the Zyxel AMG1302-T11C's web UI: login,
//! session validation, and the PPPoE manual dial endpoint used to force
//! a disconnect or reconnect. The device's interface is quirky (cookie
//! only issued on a redirect, credentials as a raw base64 query string,
//! a typo'd CGI path) and the quirks are load-bearing.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::{redirect, Client, StatusCode};
use tracing::debug;

use crate::error::{Result, SessionError};

pub mod html;

/// Timeout applied to every request against the router.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Session seam consumed by the reset orchestrator and the status
/// commands. Every operation is idempotent and may fail with a
/// transport error.
#[async_trait]
pub trait SessionController: Send + Sync {
    /// Establish an authenticated session.
    async fn login(&self) -> Result<()>;

    /// Check whether the current session is still accepted.
    async fn test_session(&self) -> Result<bool>;

    /// Connect (`true`) or disconnect (`false`) the WAN session.
    async fn set_modem_state(&self, connect: bool) -> Result<()>;

    /// The modem's own view of whether the connection is up.
    async fn modem_is_connected(&self) -> Result<bool>;
}

/// HTTP client for the modem's web interface.
///
/// Constructed once and passed by reference to all call sites; the
/// cookie store carries the session across calls.
pub struct RouterClient {
    dry_run: bool,
    username: String,
    password: String,
    hostname: String,
    client: Client,
}

impl RouterClient {
    /// Build a client for the given router.
    ///
    /// Redirects are not followed: the login flow needs to observe the
    /// 302 that carries the session cookie.
    pub fn new(
        dry_run: bool,
        username: impl Into<String>,
        password: impl Into<String>,
        hostname: impl Into<String>,
    ) -> std::result::Result<Self, SessionError> {
        let client = Client::builder()
            .cookie_store(true)
            .redirect(redirect::Policy::none())
            .timeout(HTTP_TIMEOUT)
            .build()?;

        Ok(Self {
            dry_run,
            username: username.into(),
            password: password.into(),
            hostname: hostname.into(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.hostname, path)
    }

    async fn get(&self, url: String) -> std::result::Result<reqwest::Response, SessionError> {
        debug!(request_url = %url, "requesting URL");
        Ok(self.client.get(url).send().await?)
    }
}

#[async_trait]
impl SessionController for RouterClient {
    async fn login(&self) -> Result<()> {
        // A session cookie is only assigned on the 302 to the login page.
        self.get(self.url("/")).await?;

        // The T11C takes the credentials as a base64 blob in a GET
        // request. It is the entire query string: no parameter name,
        // and trailing '=' padding goes over unescaped.
        let creds = BASE64.encode(format!("{}:{}", self.username, self.password));
        let login_url = format!("{}?{}", self.url("/cgi-bin/index.asp"), creds);

        self.get(login_url).await?;
        Ok(())
    }

    async fn test_session(&self) -> Result<bool> {
        let response = self.get(self.url("/cgi-bin/main.html")).await?;
        Ok(response.status() == StatusCode::OK)
    }

    async fn set_modem_state(&self, connect: bool) -> Result<()> {
        if self.dry_run {
            debug!(connect, "dry run, skipping modem state change");
            return Ok(());
        }

        // The typo in the path is the device's, not ours.
        let url = self.url("/cgi-bin/PPPoEManulDial.asp");
        debug!(request_url = %url, connect, "submitting dial form");

        // The web UI passes redirect=1 for connects, but the flag does
        // not appear to do anything; 0 works for both directions.
        let form = [
            ("Dipflag", "0"),
            ("redirect", "0"),
            ("DipConnFlag", if connect { "1" } else { "2" }),
        ];

        self.client
            .post(url)
            .form(&form)
            .send()
            .await
            .map_err(SessionError::Http)?;
        Ok(())
    }

    async fn modem_is_connected(&self) -> Result<bool> {
        let response = self.get(self.url("/cgi-bin/pages/statusview.cgi")).await?;
        let body = response.text().await.map_err(SessionError::Http)?;

        match html::extract_wan_ip(&body) {
            Ok(ip) => Ok(ip != "0.0.0.0"),
            // The element exists but holds no address while the modem
            // is mid-redial; that is a clean "not connected".
            Err(SessionError::WanIpTextNotFound) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
