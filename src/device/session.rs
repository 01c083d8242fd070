use serde::{Deserialize, Serialize};

use super::{read_body, DeviceClient, DeviceError, Result, LOGIN, LOGOUT, SESSION_IS_VALID};
use crate::util::token_prefix;

impl DeviceClient {
    /// Log in with the configured credentials and keep the returned session.
    pub async fn login(&mut self) -> Result<String> {
        #[derive(Serialize)]
        struct LoginRequest<'a> {
            login: &'a str,
            password: &'a str,
        }

        #[derive(Deserialize)]
        struct LoginResponse {
            session: Option<String>,
        }

        tracing::debug!(endpoint = LOGIN, login = %self.login, "device: login");

        let response = self
            .http
            .post(self.url(LOGIN))
            .json(&LoginRequest {
                login: &self.login,
                password: &self.password,
            })
            .send()
            .await?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status, "device: login rejected");
            return Err(DeviceError::Authentication { status, body });
        }

        let body = response.text().await?;
        let session = serde_json::from_str::<LoginResponse>(&body)
            .ok()
            .and_then(|r| r.session)
            .filter(|s| !s.is_empty());

        let Some(session) = session else {
            tracing::warn!(status, "device: login reply carried no session");
            return Err(DeviceError::Authentication { status, body });
        };

        tracing::debug!(session = %token_prefix(&session), "device: logged in");
        self.session = Some(session.clone());
        Ok(session)
    }

    /// Ask the device whether the held session is still valid.
    ///
    /// Returns `false` without a request when no session is held. A network
    /// failure is an error, not an invalid session.
    pub async fn is_valid(&self) -> Result<bool> {
        #[derive(Deserialize)]
        struct ValidityResponse {
            #[serde(default)]
            session_is_valid: bool,
        }

        let Some(session) = self.session.as_deref() else {
            return Ok(false);
        };

        let response = self
            .http
            .post(self.url(SESSION_IS_VALID))
            .query(&[("session", session)])
            .send()
            .await?;

        let body = read_body(SESSION_IS_VALID, response).await?;
        let verdict: ValidityResponse =
            serde_json::from_str(&body).map_err(|_| DeviceError::UnexpectedResponse {
                endpoint: SESSION_IS_VALID.to_string(),
                body,
            })?;

        tracing::debug!(
            session = %token_prefix(session),
            valid = verdict.session_is_valid,
            "device: session checked"
        );
        Ok(verdict.session_is_valid)
    }

    /// Log in again unless the held session checks out. Runs before every
    /// authenticated call; the verdict is never cached.
    pub async fn ensure_valid(&mut self) -> Result<()> {
        if !self.is_valid().await? {
            self.login().await?;
        }
        Ok(())
    }

    /// Best-effort logout. The local session is dropped whatever the device says.
    pub async fn logout(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };

        let result = self
            .http
            .post(self.url(LOGOUT))
            .query(&[("session", session.as_str())])
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                tracing::debug!(session = %token_prefix(&session), "device: logged out");
            }
            Ok(response) => {
                tracing::warn!(status = response.status().as_u16(), "device: logout rejected");
            }
            Err(e) => tracing::warn!(error = %e, "device: logout failed"),
        }
    }

    /// Log out and release the connection pool.
    pub async fn close(mut self) {
        self.logout().await;
    }
}
