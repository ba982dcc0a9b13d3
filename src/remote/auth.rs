use reqwest::blocking::{Client, RequestBuilder};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::{Config, Endpoint};
use crate::error::{Result, TickError};
use crate::remote::error_message;
use crate::session::{Session, User};

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

/// Outcome of a sign-up: a session right away, or a user waiting on email
/// confirmation.
#[derive(Debug, Clone, PartialEq)]
pub enum SignUp {
    SignedIn(Session),
    ConfirmationRequired(User),
}

/// Password auth against the hosted service (`/auth/v1`).
pub struct AuthClient {
    client: Client,
    endpoint: Endpoint,
}

impl AuthClient {
    pub fn new(config: &Config) -> Result<Self> {
        let endpoint = config.endpoint()?;
        let client = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self { client, endpoint })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/auth/v1/{path}", self.endpoint.url)
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.client
            .post(self.url(path))
            .header("apikey", &self.endpoint.anon_key)
    }

    fn send(&self, request: RequestBuilder) -> Result<String> {
        let response = request.send().map_err(TickError::remote)?;
        let status = response.status();
        let body = response.text().map_err(TickError::remote)?;
        debug!(status = status.as_u16(), "auth response");
        if !status.is_success() {
            return Err(TickError::Remote(error_message(status.as_u16(), &body)));
        }
        Ok(body)
    }

    pub fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let request = self
            .post("token")
            .query(&[("grant_type", "password")])
            .json(&Credentials { email, password });
        let body = self.send(request)?;
        let session: Session = serde_json::from_str(&body)
            .map_err(|e| TickError::Remote(format!("unexpected sign-in response: {e}")))?;
        info!(user = %session.user_id(), "signed in");
        Ok(session)
    }

    pub fn sign_up(&self, email: &str, password: &str) -> Result<SignUp> {
        let request = self.post("signup").json(&Credentials { email, password });
        let body = self.send(request)?;
        parse_sign_up(&body)
    }

    /// Revoke the session's refresh token server-side.
    pub fn sign_out(&self, session: &Session) -> Result<()> {
        let request = self.post("logout").bearer_auth(&session.access_token);
        self.send(request)?;
        info!(user = %session.user_id(), "signed out");
        Ok(())
    }
}

fn parse_sign_up(body: &str) -> Result<SignUp> {
    let value: Value = serde_json::from_str(body)?;
    let unexpected = |e: serde_json::Error| TickError::Remote(format!("unexpected sign-up response: {e}"));

    if value.get("access_token").is_some() {
        return serde_json::from_value(value).map(SignUp::SignedIn).map_err(unexpected);
    }
    // Some service versions nest the user, others return it bare.
    let user = value.get("user").cloned().unwrap_or(value);
    serde_json::from_value(user)
        .map(SignUp::ConfirmationRequired)
        .map_err(unexpected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::UserId;

    #[test]
    fn sign_up_with_immediate_session() {
        let body = r#"{"access_token":"jwt","refresh_token":"r","expires_at":1,"user":{"id":"u1","email":"a@b.c"}}"#;
        match parse_sign_up(body).unwrap() {
            SignUp::SignedIn(session) => assert_eq!(session.user_id(), &UserId::new("u1")),
            other => panic!("expected session, got {other:?}"),
        }
    }

    #[test]
    fn sign_up_waiting_for_confirmation() {
        let bare = r#"{"id":"u2","email":"a@b.c","confirmation_sent_at":"2026-01-01T00:00:00Z"}"#;
        let nested = r#"{"user":{"id":"u3","email":"a@b.c"},"session":null}"#;

        assert_eq!(
            parse_sign_up(bare).unwrap(),
            SignUp::ConfirmationRequired(User {
                id: UserId::new("u2"),
                email: Some("a@b.c".into()),
            })
        );
        assert!(matches!(
            parse_sign_up(nested).unwrap(),
            SignUp::ConfirmationRequired(User { id, .. }) if id == UserId::new("u3")
        ));
    }

    #[test]
    fn auth_urls_live_under_auth_v1() {
        let config = Config {
            url: Some("https://abc.example.co".into()),
            anon_key: Some("anon".into()),
            ..Config::default()
        };
        let client = AuthClient::new(&config).unwrap();
        assert_eq!(client.url("token"), "https://abc.example.co/auth/v1/token");
    }
}
