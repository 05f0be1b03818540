//! Customer accounts and the logged-in session

mod session;
mod types;

use log::{debug, info, warn};
use reqwest::Client;
use std::sync::RwLock;

use loja_rust_storage::JsonStore;

use crate::error::{Error, Result};
use crate::fetch::{endpoint, Fetch};
use crate::keys;
use crate::lock;

pub use session::*;
pub use types::*;

/// Session container for customer accounts.
///
/// The profile is persisted under `user` and the token as a bare string under
/// `userToken`. A session is only restored when both are present.
pub struct UserSession {
    /// The base URL of the API
    api_url: String,

    /// HTTP client used for requests
    client: Client,

    store: JsonStore,

    /// The current session
    session: RwLock<Option<Session>>,
}

impl UserSession {
    pub(crate) fn new(api_url: &str, client: Client, store: JsonStore) -> Self {
        Self {
            api_url: api_url.to_string(),
            client,
            store,
            session: RwLock::new(None),
        }
    }

    fn url(&self, path: &str) -> String {
        endpoint(&self.api_url, path)
    }

    /// Load a previously saved session. Returns whether one was found.
    pub async fn restore(&self) -> Result<bool> {
        let user = match self.store.get::<User>(keys::USER).await {
            Ok(user) => user,
            Err(err) => {
                warn!("discarding unreadable user profile: {}", err);
                None
            }
        };
        let token = self.store.get_raw(keys::USER_TOKEN).await?;

        match (user, token) {
            (Some(user), Some(token)) if !token.is_empty() => {
                debug!("restored session for user {}", user.id);
                *lock::write(&self.session) = Some(Session::new(user, token));
                Ok(true)
            }
            _ => {
                *lock::write(&self.session) = None;
                Ok(false)
            }
        }
    }

    /// Log in with email and password
    pub async fn login(&self, email: &str, password: &str) -> Result<User> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(Error::validation("Email and password are required"));
        }

        let url = self.url("/usuarios/login");
        let response = Fetch::post(&self.client, &url)
            .json(&Credentials { email, password })?
            .error_message("Login failed")
            .execute::<LoginResponse>()
            .await?;

        let session = Session::new(response.usuario, response.token);
        if let Err(err) = self.save(&session).await {
            self.forget_saved().await;
            return Err(err);
        }
        info!("user {} logged in", session.user.id);
        *lock::write(&self.session) = Some(session.clone());

        Ok(session.user)
    }

    async fn save(&self, session: &Session) -> Result<()> {
        self.store.set(keys::USER, &session.user).await?;
        self.store.set_raw(keys::USER_TOKEN, &session.token).await?;
        Ok(())
    }

    // A session is only restored when both keys exist, so removing what a
    // failed save left behind is enough.
    async fn forget_saved(&self) {
        for key in [keys::USER, keys::USER_TOKEN] {
            if let Err(err) = self.store.remove(key).await {
                warn!("could not remove {}: {}", key, err);
            }
        }
    }

    /// Create an account. The new user is not logged in.
    pub async fn register(&self, data: &RegisterData) -> Result<User> {
        if data.name.trim().is_empty() || data.email.trim().is_empty() || data.password.is_empty()
        {
            return Err(Error::validation("Name, email and password are required"));
        }

        let url = self.url("/usuarios/cadastro");
        let response = Fetch::post(&self.client, &url)
            .json(data)?
            .error_message("Registration failed")
            .execute::<UserEnvelope>()
            .await?;

        Ok(response.usuario)
    }

    /// Fetch the profile from the server and replace the local copy
    pub async fn fetch_profile(&self) -> Result<User> {
        let token = self.require_token()?;
        let url = self.url("/usuarios/perfil");

        let user = Fetch::get(&self.client, &url)
            .bearer_auth(&token)
            .error_message("Failed to load profile")
            .execute::<User>()
            .await?;

        self.replace_user(&token, user).await
    }

    /// Change profile fields and replace the local copy with the result
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<User> {
        let token = self.require_token()?;
        let url = self.url("/usuarios/perfil");

        let response = Fetch::put(&self.client, &url)
            .bearer_auth(&token)
            .json(update)?
            .error_message("Failed to update profile")
            .execute::<UserEnvelope>()
            .await?;

        self.replace_user(&token, response.usuario).await
    }

    // The update response omits `is_admin` and `data_criacao`; keep the
    // values already known for them.
    async fn replace_user(&self, token: &str, mut user: User) -> Result<User> {
        {
            let mut session = lock::write(&self.session);
            match session.as_mut() {
                Some(current) if current.token == token => {
                    user.is_admin = user.is_admin || current.user.is_admin;
                    if user.created_at.is_none() {
                        user.created_at = current.user.created_at;
                    }
                    current.user = user.clone();
                }
                _ => {
                    debug!("session changed while the profile was loading");
                    return Ok(user);
                }
            }
        }

        self.store.set(keys::USER, &user).await?;
        Ok(user)
    }

    /// Forget the session locally. Nothing is sent to the server.
    pub async fn logout(&self) -> Result<()> {
        let previous = lock::write(&self.session).take();
        if let Some(session) = previous {
            info!("user {} logged out", session.user.id);
        }

        self.store.remove(keys::USER).await?;
        self.store.remove(keys::USER_TOKEN).await?;
        Ok(())
    }

    pub fn session(&self) -> Option<Session> {
        lock::read(&self.session).clone()
    }

    pub fn current_user(&self) -> Option<User> {
        lock::read(&self.session)
            .as_ref()
            .map(|session| session.user.clone())
    }

    pub fn token(&self) -> Option<String> {
        lock::read(&self.session)
            .as_ref()
            .map(|session| session.token.clone())
    }

    /// Token of the current session, or [`Error::NotAuthenticated`]
    pub fn require_token(&self) -> Result<String> {
        self.token().ok_or(Error::NotAuthenticated)
    }

    pub fn is_authenticated(&self) -> bool {
        lock::read(&self.session).is_some()
    }

    pub fn is_admin(&self) -> bool {
        lock::read(&self.session)
            .as_ref()
            .map(Session::is_admin)
            .unwrap_or(false)
    }
}
