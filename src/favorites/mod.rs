//! Favorite products of the logged-in user
//!
//! Changes are applied locally first and then sent to the server. When the
//! server rejects a change it is rolled back; when the server cannot be
//! reached it stays queued and [`Favorites::sync`] replays it later.
//!
//! Cached favorites and queued changes are tagged with the account that made
//! them. Another account never sees or replays them; they are dropped as soon
//! as that account uses favorites.

mod reconcile;
mod types;

use log::{debug, info, warn};
use reqwest::Client;
use std::sync::{Arc, RwLock};

use loja_rust_storage::JsonStore;

use crate::auth::UserSession;
use crate::error::{Error, Result};
use crate::fetch::{endpoint, Fetch};
use crate::keys;
use crate::lock;

/// Backend answer to adding a product that is already a favorite
pub const ALREADY_FAVORITE_MESSAGE: &str = "Produto já está nos favoritos";

pub use reconcile::{merge_favorites, pending_to_replay};
pub use types::{ChangeStatus, Favorite, FavoritesSync, PendingChange};
use types::{AddFavoriteResponse, FavoriteStatus, FavoritesState, NewFavorite};

/// Favorites container
pub struct Favorites {
    api_url: String,
    client: Client,
    store: JsonStore,
    session: Arc<UserSession>,
    state: RwLock<FavoritesState>,
}

impl Favorites {
    pub(crate) fn new(
        api_url: &str,
        client: Client,
        store: JsonStore,
        session: Arc<UserSession>,
    ) -> Self {
        Self {
            api_url: api_url.to_string(),
            client,
            store,
            session,
            state: RwLock::new(FavoritesState::default()),
        }
    }

    /// Load cached favorites and queued changes
    pub async fn restore(&self) -> Result<()> {
        let state = match self.store.get::<FavoritesState>(keys::FAVORITES).await {
            Ok(state) => state.unwrap_or_default(),
            Err(err) => {
                warn!("discarding unreadable favorites: {}", err);
                FavoritesState::default()
            }
        };
        *lock::write(&self.state) = state;

        if let Some(user) = self.session.current_user() {
            self.claim(user.id).await?;
        }
        Ok(())
    }

    /// Cached favorites of the logged-in user, newest first
    pub fn favorites(&self) -> Vec<Favorite> {
        let user_id = self.current_user_id();
        let state = lock::read(&self.state);
        if user_id.is_some() && state.owner == user_id {
            state.favorites.clone()
        } else {
            Vec::new()
        }
    }

    /// Changes of the logged-in user waiting for the server
    pub fn pending(&self) -> Vec<PendingChange> {
        let user_id = self.current_user_id();
        let state = lock::read(&self.state);
        if user_id.is_some() && state.owner == user_id {
            state.pending.clone()
        } else {
            Vec::new()
        }
    }

    /// Local answer, including changes not confirmed yet
    pub fn is_favorite(&self, product_id: i64) -> bool {
        let user_id = self.current_user_id();
        let state = lock::read(&self.state);
        user_id.is_some() && state.owner == user_id && state.contains(product_id)
    }

    /// Mark a product as favorite
    pub async fn add(&self, product_id: i64) -> Result<ChangeStatus> {
        let (token, user_id) = self.account()?;
        self.claim(user_id).await?;
        let change = PendingChange::Add(product_id);

        let (was_favorite, snapshot) = {
            let mut state = lock::write(&self.state);
            let was_favorite = state.contains(product_id);
            if !was_favorite {
                state.favorites.insert(0, Favorite::unconfirmed(product_id));
            }
            state.record(change);
            (was_favorite, state.clone())
        };
        self.persist(&snapshot).await?;

        match self.send_add(&token, product_id).await {
            Ok(None) => {
                debug!("product {} was already a favorite on the server", product_id);
                let snapshot = {
                    let mut state = lock::write(&self.state);
                    state.settle(change);
                    state.clone()
                };
                self.persist(&snapshot).await?;
                Ok(ChangeStatus::Confirmed)
            }
            Ok(Some(confirmed)) => {
                let snapshot = {
                    let mut state = lock::write(&self.state);
                    if state.settle(change) {
                        if let Some(favorite) = state
                            .favorites
                            .iter_mut()
                            .find(|favorite| favorite.product_id == product_id)
                        {
                            favorite.id = confirmed.id;
                            favorite.added_at = confirmed.added_at.or(favorite.added_at);
                        }
                    }
                    state.clone()
                };
                self.persist(&snapshot).await?;
                Ok(ChangeStatus::Confirmed)
            }
            Err(err) if err.is_connection_error() => {
                warn!("favorite {} queued: {}", product_id, err);
                Ok(ChangeStatus::Queued)
            }
            Err(err) => {
                let snapshot = {
                    let mut state = lock::write(&self.state);
                    if state.settle(change) && !was_favorite {
                        state.take(product_id);
                    }
                    state.clone()
                };
                self.persist(&snapshot).await?;
                Err(err)
            }
        }
    }

    /// Unmark a product
    pub async fn remove(&self, product_id: i64) -> Result<ChangeStatus> {
        let (token, user_id) = self.account()?;
        self.claim(user_id).await?;
        let change = PendingChange::Remove(product_id);

        let (removed, snapshot) = {
            let mut state = lock::write(&self.state);
            let removed = state.take(product_id);
            state.record(change);
            (removed, state.clone())
        };
        self.persist(&snapshot).await?;

        match self.send_remove(&token, product_id).await {
            Ok(()) => {
                let snapshot = {
                    let mut state = lock::write(&self.state);
                    state.settle(change);
                    state.clone()
                };
                self.persist(&snapshot).await?;
                Ok(ChangeStatus::Confirmed)
            }
            Err(err) if err.is_connection_error() => {
                warn!("favorite removal {} queued: {}", product_id, err);
                Ok(ChangeStatus::Queued)
            }
            Err(err) => {
                let snapshot = {
                    let mut state = lock::write(&self.state);
                    if state.settle(change) && !state.contains(product_id) {
                        if let Some(favorite) = removed {
                            state.favorites.insert(0, favorite);
                        }
                    }
                    state.clone()
                };
                self.persist(&snapshot).await?;
                Err(err)
            }
        }
    }

    /// Flip the favorite mark. Returns whether the product is now a favorite.
    pub async fn toggle(&self, product_id: i64) -> Result<bool> {
        if self.is_favorite(product_id) {
            self.remove(product_id).await?;
            Ok(false)
        } else {
            self.add(product_id).await?;
            Ok(true)
        }
    }

    /// Ask the server whether a product is a favorite
    pub async fn status(&self, product_id: i64) -> Result<bool> {
        let token = self.session.require_token()?;
        let url = endpoint(&self.api_url, &format!("/favoritos/{}/status", product_id));

        let status = Fetch::get(&self.client, &url)
            .bearer_auth(&token)
            .error_message("Failed to check favorite")
            .execute::<FavoriteStatus>()
            .await?;

        Ok(status.is_favorito)
    }

    /// Synchronize with the server and return the merged list
    pub async fn list(&self) -> Result<Vec<Favorite>> {
        self.sync().await?;
        Ok(self.favorites())
    }

    /// Pull the server's list, replay queued changes it has not seen, and
    /// merge.
    ///
    /// Changes the server rejects are dropped. If the server becomes
    /// unreachable midway the queue is kept and the error returned.
    pub async fn sync(&self) -> Result<FavoritesSync> {
        let (token, user_id) = self.account()?;
        self.claim(user_id).await?;
        let queued = self.pending();

        let mut remote = self.fetch_remote(&token).await?;
        let replay = pending_to_replay(&remote, &queued);

        let mut result = FavoritesSync::default();
        for change in &replay {
            let sent = match *change {
                PendingChange::Add(id) => self.send_add(&token, id).await.map(|_| ()),
                PendingChange::Remove(id) => self.send_remove(&token, id).await,
            };
            match sent {
                Ok(()) => result.replayed += 1,
                Err(err) if err.is_connection_error() => return Err(err),
                Err(err) => {
                    warn!("server rejected queued {:?}: {}", change, err);
                    result.rejected += 1;
                }
            }
        }

        if !replay.is_empty() {
            remote = self.fetch_remote(&token).await?;
        }

        let snapshot = {
            let mut state = lock::write(&self.state);
            if state.owner != Some(user_id) {
                debug!("account changed during sync; discarding result");
                return Ok(result);
            }
            let newer: Vec<PendingChange> = state
                .pending
                .iter()
                .copied()
                .filter(|change| !queued.contains(change))
                .collect();
            state.favorites = merge_favorites(remote, &newer);
            state.pending = newer;
            state.clone()
        };
        result.total = snapshot.favorites.len();
        debug!(
            "favorites synced: {} replayed, {} rejected, {} total",
            result.replayed, result.rejected, result.total
        );
        self.persist(&snapshot).await?;

        Ok(result)
    }

    fn current_user_id(&self) -> Option<i64> {
        self.session.current_user().map(|user| user.id)
    }

    fn account(&self) -> Result<(String, i64)> {
        let session = self.session.session().ok_or(Error::NotAuthenticated)?;
        Ok((session.token, session.user.id))
    }

    // Drops state left by another account and tags what remains with
    // `user_id`.
    async fn claim(&self, user_id: i64) -> Result<()> {
        let reset = {
            let mut state = lock::write(&self.state);
            if state.owner == Some(user_id) {
                None
            } else {
                if state.owner.is_some() || !state.favorites.is_empty() || !state.pending.is_empty() {
                    info!(
                        "dropping {} favorites and {} queued changes of another account",
                        state.favorites.len(),
                        state.pending.len()
                    );
                }
                *state = FavoritesState::owned_by(user_id);
                Some(state.clone())
            }
        };
        if let Some(snapshot) = reset {
            self.persist(&snapshot).await?;
        }
        Ok(())
    }

    /// Forget favorites and queued changes, e.g. after logout
    pub async fn clear_local(&self) -> Result<()> {
        *lock::write(&self.state) = FavoritesState::default();
        self.store.remove(keys::FAVORITES).await?;
        info!("cleared local favorites");
        Ok(())
    }

    async fn fetch_remote(&self, token: &str) -> Result<Vec<Favorite>> {
        let url = endpoint(&self.api_url, "/favoritos");

        Fetch::get(&self.client, &url)
            .bearer_auth(token)
            .error_message("Failed to load favorites")
            .execute::<Vec<Favorite>>()
            .await
    }

    // `None` when the server already had the favorite.
    async fn send_add(&self, token: &str, product_id: i64) -> Result<Option<Favorite>> {
        let url = endpoint(&self.api_url, "/favoritos");

        let result = Fetch::post(&self.client, &url)
            .bearer_auth(token)
            .json(&NewFavorite {
                produto_id: product_id,
            })?
            .error_message("Failed to add favorite")
            .execute::<AddFavoriteResponse>()
            .await;

        match result {
            Ok(response) => Ok(Some(response.favorito)),
            Err(Error::Api { status: 400, message }) if message == ALREADY_FAVORITE_MESSAGE => {
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    // A 404 means the favorite is already gone, which is what was asked for.
    async fn send_remove(&self, token: &str, product_id: i64) -> Result<()> {
        let url = endpoint(&self.api_url, &format!("/favoritos/{}", product_id));

        let result = Fetch::delete(&self.client, &url)
            .bearer_auth(token)
            .error_message("Failed to remove favorite")
            .execute_empty()
            .await;

        match result {
            Err(Error::Api { status: 404, .. }) => Ok(()),
            other => other,
        }
    }

    async fn persist(&self, state: &FavoritesState) -> Result<()> {
        self.store.set(keys::FAVORITES, state).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn logged_in(api_url: &str, store: &JsonStore) -> Arc<UserSession> {
        logged_in_as(api_url, store, 1, "tok-1").await
    }

    async fn logged_in_as(api_url: &str, store: &JsonStore, id: i64, token: &str) -> Arc<UserSession> {
        store
            .set(
                keys::USER,
                &json!({ "id": id, "nome": format!("Cliente {}", id), "email": format!("c{}@example.com", id) }),
            )
            .await
            .unwrap();
        store.set_raw(keys::USER_TOKEN, token).await.unwrap();
        let session = Arc::new(UserSession::new(api_url, Client::new(), store.clone()));
        session.restore().await.unwrap();
        session
    }

    async fn favorites_for(api_url: &str, store: JsonStore) -> Favorites {
        let session = logged_in(api_url, &store).await;
        Favorites::new(api_url, Client::new(), store, session)
    }

    fn favorite_json(id: i64, product_id: i64) -> serde_json::Value {
        json!({
            "id": id,
            "produto_id": product_id,
            "produto_nome": "Caneca",
            "produto_preco": 25.0,
            "produto_imagem": "",
            "produto_estoque": 4,
            "data_favorito": "2025-03-01T10:00:00"
        })
    }

    #[tokio::test]
    async fn test_add_confirmed() {
        let mock_server = MockServer::start().await;
        let api_url = format!("{}/api", mock_server.uri());

        Mock::given(method("POST"))
            .and(path("/api/favoritos"))
            .and(header("Authorization", "Bearer tok-1"))
            .and(body_json(json!({ "produto_id": 5 })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "mensagem": "Produto adicionado aos favoritos",
                "favorito": { "id": 11, "produto_id": 5, "data_favorito": "2025-03-01T10:00:00" }
            })))
            .mount(&mock_server)
            .await;

        let store = JsonStore::in_memory();
        let favorites = favorites_for(&api_url, store.clone()).await;

        assert_eq!(favorites.add(5).await.unwrap(), ChangeStatus::Confirmed);
        assert!(favorites.is_favorite(5));
        assert!(favorites.pending().is_empty());
        assert_eq!(favorites.favorites()[0].id, 11);

        let reloaded = Favorites::new(
            &api_url,
            Client::new(),
            store.clone(),
            logged_in(&api_url, &store).await,
        );
        reloaded.restore().await.unwrap();
        assert!(reloaded.is_favorite(5));
    }

    #[tokio::test]
    async fn test_rejected_add_rolls_back() {
        let mock_server = MockServer::start().await;
        let api_url = format!("{}/api", mock_server.uri());

        Mock::given(method("POST"))
            .and(path("/api/favoritos"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({ "erro": "Produto não encontrado" })),
            )
            .mount(&mock_server)
            .await;

        let favorites = favorites_for(&api_url, JsonStore::in_memory()).await;
        let err = favorites.add(99).await.unwrap_err();

        assert_eq!(err.user_message(), "Produto não encontrado");
        assert!(!favorites.is_favorite(99));
        assert!(favorites.pending().is_empty());
    }

    #[tokio::test]
    async fn test_offline_add_is_queued_then_replayed() {
        let store = JsonStore::in_memory();
        let offline = favorites_for("http://127.0.0.1:1/api", store.clone()).await;

        assert_eq!(offline.add(5).await.unwrap(), ChangeStatus::Queued);
        assert!(offline.is_favorite(5));
        assert_eq!(offline.pending(), vec![PendingChange::Add(5)]);

        let mock_server = MockServer::start().await;
        let api_url = format!("{}/api", mock_server.uri());

        Mock::given(method("GET"))
            .and(path("/api/favoritos"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .up_to_n_times(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/favoritos"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([favorite_json(11, 5)])))
            .mount(&mock_server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/favoritos"))
            .and(body_json(json!({ "produto_id": 5 })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "favorito": { "id": 11, "produto_id": 5, "data_favorito": "2025-03-01T10:00:00" }
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let online = favorites_for(&api_url, store).await;
        online.restore().await.unwrap();
        let result = online.sync().await.unwrap();

        assert_eq!(result.replayed, 1);
        assert_eq!(result.total, 1);
        assert!(online.pending().is_empty());
        assert_eq!(online.favorites()[0].product_name.as_deref(), Some("Caneca"));
    }

    #[tokio::test]
    async fn test_sync_skips_changes_server_already_has() {
        let mock_server = MockServer::start().await;
        let api_url = format!("{}/api", mock_server.uri());

        Mock::given(method("GET"))
            .and(path("/api/favoritos"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([favorite_json(11, 5)])))
            .expect(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/favoritos"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&mock_server)
            .await;

        let store = JsonStore::in_memory();
        store
            .set(
                keys::FAVORITES,
                &json!({ "usuario_id": 1, "favorites": [], "pending": [{ "op": "add", "produto_id": 5 }] }),
            )
            .await
            .unwrap();

        let favorites = favorites_for(&api_url, store).await;
        favorites.restore().await.unwrap();
        let list = favorites.list().await.unwrap();

        assert_eq!(list.len(), 1);
        assert!(list[0].is_confirmed());
        assert!(favorites.pending().is_empty());
    }

    #[tokio::test]
    async fn test_remove_treats_missing_as_done() {
        let mock_server = MockServer::start().await;
        let api_url = format!("{}/api", mock_server.uri());

        Mock::given(method("DELETE"))
            .and(path("/api/favoritos/5"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({ "erro": "Favorito não encontrado" })),
            )
            .mount(&mock_server)
            .await;

        let store = JsonStore::in_memory();
        store
            .set(keys::FAVORITES, &json!({ "usuario_id": 1, "favorites": [favorite_json(11, 5)], "pending": [] }))
            .await
            .unwrap();
        let favorites = favorites_for(&api_url, store).await;
        favorites.restore().await.unwrap();

        assert!(!favorites.toggle(5).await.unwrap());
        assert!(!favorites.is_favorite(5));
        assert!(favorites.pending().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_remove_restores_favorite() {
        let mock_server = MockServer::start().await;
        let api_url = format!("{}/api", mock_server.uri());

        Mock::given(method("DELETE"))
            .and(path("/api/favoritos/5"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "erro": "Erro ao remover favorito" })))
            .mount(&mock_server)
            .await;

        let store = JsonStore::in_memory();
        store
            .set(keys::FAVORITES, &json!({ "usuario_id": 1, "favorites": [favorite_json(11, 5)], "pending": [] }))
            .await
            .unwrap();
        let favorites = favorites_for(&api_url, store).await;
        favorites.restore().await.unwrap();

        assert!(favorites.remove(5).await.is_err());
        assert!(favorites.is_favorite(5));
        assert_eq!(favorites.favorites()[0].id, 11);
    }

    #[tokio::test]
    async fn test_status() {
        let mock_server = MockServer::start().await;
        let api_url = format!("{}/api", mock_server.uri());

        Mock::given(method("GET"))
            .and(path("/api/favoritos/5/status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "is_favorito": true })))
            .mount(&mock_server)
            .await;

        let favorites = favorites_for(&api_url, JsonStore::in_memory()).await;
        assert!(favorites.status(5).await.unwrap());
    }

    #[tokio::test]
    async fn test_requires_login() {
        let store = JsonStore::in_memory();
        let session = Arc::new(UserSession::new("http://127.0.0.1:1/api", Client::new(), store.clone()));
        let favorites = Favorites::new("http://127.0.0.1:1/api", Client::new(), store, session);

        assert!(matches!(favorites.add(1).await, Err(Error::NotAuthenticated)));
        assert!(matches!(favorites.sync().await, Err(Error::NotAuthenticated)));
        assert!(!favorites.is_favorite(1));
    }

    #[tokio::test]
    async fn test_add_already_on_server_stays_favorite() {
        let mock_server = MockServer::start().await;
        let api_url = format!("{}/api", mock_server.uri());

        Mock::given(method("POST"))
            .and(path("/api/favoritos"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({ "erro": ALREADY_FAVORITE_MESSAGE })),
            )
            .mount(&mock_server)
            .await;

        let favorites = favorites_for(&api_url, JsonStore::in_memory()).await;

        assert_eq!(favorites.add(5).await.unwrap(), ChangeStatus::Confirmed);
        assert!(favorites.is_favorite(5));
        assert!(favorites.pending().is_empty());
    }

    #[tokio::test]
    async fn test_queued_changes_stay_with_their_account() {
        let mock_server = MockServer::start().await;
        let api_url = format!("{}/api", mock_server.uri());

        Mock::given(method("GET"))
            .and(path("/api/favoritos"))
            .and(header("Authorization", "Bearer tok-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&mock_server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/favoritos"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&mock_server)
            .await;

        let store = JsonStore::in_memory();
        store
            .set(
                keys::FAVORITES,
                &json!({
                    "usuario_id": 1,
                    "favorites": [favorite_json(11, 5)],
                    "pending": [{ "op": "add", "produto_id": 9 }]
                }),
            )
            .await
            .unwrap();

        let session = logged_in_as(&api_url, &store, 2, "tok-2").await;
        let favorites = Favorites::new(&api_url, Client::new(), store.clone(), session);
        favorites.restore().await.unwrap();

        assert!(!favorites.is_favorite(5));
        assert!(favorites.pending().is_empty());

        let result = favorites.sync().await.unwrap();
        assert_eq!(result, FavoritesSync::default());

        let saved: serde_json::Value = store.get(keys::FAVORITES).await.unwrap().unwrap();
        assert_eq!(saved["usuario_id"], 2);
        assert_eq!(saved["pending"], json!([]));
    }

    #[tokio::test]
    async fn test_login_as_another_account_hides_cached_favorites() {
        let store = JsonStore::in_memory();
        store
            .set(
                keys::FAVORITES,
                &json!({ "usuario_id": 1, "favorites": [favorite_json(11, 5)], "pending": [] }),
            )
            .await
            .unwrap();
        store.remove(keys::USER).await.unwrap();

        let session = Arc::new(UserSession::new("http://127.0.0.1:1/api", Client::new(), store.clone()));
        let favorites = Favorites::new("http://127.0.0.1:1/api", Client::new(), store.clone(), session.clone());
        favorites.restore().await.unwrap();
        assert!(!favorites.is_favorite(5));

        logged_in_as("http://127.0.0.1:1/api", &store, 2, "tok-2").await;
        session.restore().await.unwrap();
        assert!(favorites.favorites().is_empty());
        assert!(!favorites.is_favorite(5));
    }
}
