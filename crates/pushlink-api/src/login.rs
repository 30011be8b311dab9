// Login-redirect exchange
//
// Trades an account auth token for the backend's session cookie. The
// login endpoint answers with a 302 and a Set-Cookie; the redirect itself
// is never followed. On success the cookie lands in the executor's
// session so every later transaction carries it.

use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;
use url::Url;

use crate::auth::SessionCookie;
use crate::codec::Codec;
use crate::error::Error;
use crate::transaction::TransactionExecutor;

const LOGIN_PATH: &str = "_ah/login";

impl<C: Codec> TransactionExecutor<C> {
    /// Exchange `auth_token` for the session cookie named `cookie_name`.
    ///
    /// `GET {base}/_ah/login?continue={base}&auth={token}`. Anything other
    /// than a 302 carrying the named cookie is an
    /// [`Error::Authentication`].
    pub async fn login(
        &self,
        auth_token: &SecretString,
        cookie_name: &str,
    ) -> Result<SessionCookie, Error> {
        let base = self.base();
        let url = Url::parse_with_params(
            &format!("{base}/{LOGIN_PATH}"),
            &[("continue", base), ("auth", auth_token.expose_secret())],
        )?;

        debug!("logging in at {base}/{LOGIN_PATH}");

        let resp = self.http().get(url).send().await?;

        let status = resp.status();
        if status != StatusCode::FOUND {
            return Err(Error::Authentication {
                message: format!("login expected HTTP 302, got {status}"),
            });
        }

        let cookie = resp
            .cookies()
            .find(|c| c.name() == cookie_name)
            .map(|c| SessionCookie::new(cookie_name, c.value()))
            .ok_or_else(|| Error::Authentication {
                message: format!("login response carried no '{cookie_name}' cookie"),
            })?;

        self.session().set(cookie.clone());
        debug!("login successful");
        Ok(cookie)
    }
}
