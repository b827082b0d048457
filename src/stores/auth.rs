//! Login, OAuth and logout on top of the shared [`Session`].

use std::rc::Rc;

use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::core::alert::AlertStore;
use crate::core::error::ApiError;
use crate::core::gateway::{Body, FetchGateway};
use crate::core::session::Session;
use crate::models::User;
use crate::stores::collection::Collection;

#[derive(Deserialize)]
struct LocalLogin {
    jwt: String,
    user: User,
}

#[derive(Deserialize)]
struct GoogleLogin {
    user: User,
    #[serde(rename = "accessToken")]
    access_token: AccessToken,
}

#[derive(Deserialize)]
struct AccessToken {
    #[serde(rename = "_id")]
    id: String,
}

#[derive(Deserialize)]
struct RedirectUrl {
    url: String,
}

pub struct AuthStore {
    api: Collection,
    session: Rc<Session>,
}

impl AuthStore {
    pub fn new(gateway: Rc<FetchGateway>, alerts: Rc<AlertStore>) -> Self {
        let session = Rc::clone(gateway.session());
        Self {
            // Auth endpoints live directly under `/api`.
            api: Collection::new(gateway, alerts, ""),
            session,
        }
    }

    pub fn user(&self) -> Option<User> {
        self.session.user()
    }

    pub fn is_logged_in(&self) -> bool {
        self.session.is_active()
    }

    /// Where to go after the next successful login.
    pub fn set_return_url(&self, url: impl Into<String>) {
        self.session.set_return_url(url);
    }

    /// Username/email + password login.
    pub async fn login(&self, identifier: &str, password: &str) -> Result<User, ApiError> {
        let body = json!({ "identifier": identifier, "password": password });
        let response = self.api.post(&self.api.url("auth/local"), Some(Body::Json(body))).await?;
        let LocalLogin { jwt, user } = self.decode(response)?;
        Ok(self.start(jwt, user))
    }

    /// Ask the server for the Google consent URL and leave the app for it.
    pub async fn init_google(&self) -> Result<String, ApiError> {
        let response = self.api.get(&self.api.url("OAuth/googleLogin")).await?;
        let RedirectUrl { url } = self.decode(response)?;
        info!(%url, "redirecting to Google sign-in");
        self.session.redirect(&url);
        Ok(url)
    }

    /// Finish the Google flow with the authorization `code`.
    pub async fn login_google(&self, code: &str) -> Result<User, ApiError> {
        let body = json!({ "code": code });
        let response = self.api.post(&self.api.url("OAuth/google"), Some(Body::Json(body))).await?;
        let GoogleLogin { user, access_token } = self.decode(response)?;
        Ok(self.start(access_token.id, user))
    }

    /// End the session and go to the login page.
    pub fn logout(&self) {
        self.session.end();
    }

    fn decode<T: serde::de::DeserializeOwned>(&self, response: serde_json::Value) -> Result<T, ApiError> {
        self.api
            .report(serde_json::from_value(response).map_err(ApiError::from))
    }

    fn start(&self, token: String, user: User) -> User {
        if let Err(err) = self.session.begin(token, user.clone()) {
            warn!(error = %err, "session not persisted; it will not survive a reload");
        }
        self.session.navigate_after_login();
        user
    }
}
