//! Administrator session and back-office operations

mod types;

use log::{debug, info, warn};
use reqwest::Client;
use std::sync::RwLock;

use loja_rust_storage::JsonStore;

use crate::catalog::{Category, Product};
use crate::error::{Error, Result};
use crate::fetch::{endpoint, error_from_response, is_json, Fetch};
use crate::keys;
use crate::lock;
use crate::orders::OrderStatus;

pub use types::*;
use types::{
    ActiveFlag, AdminCredentials, AdminLoginResponse, CategoryEnvelope, ProductEnvelope,
    StatusBody,
};

/// Shown when the login endpoint answers with something other than JSON,
/// which usually means the request reached a dev server instead of the API
pub const SERVER_UNREACHABLE_MESSAGE: &str =
    "Server unreachable. Check that the backend is running.";

/// Client for the `/admin` routes.
///
/// The token is persisted as a bare string under `admin_token` and the
/// profile under `admin_data`.
pub struct AdminClient {
    api_url: String,
    client: Client,
    store: JsonStore,
    session: RwLock<Option<AdminSession>>,
}

impl AdminClient {
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

    /// Load the stored admin session and check that the token is still
    /// accepted. The session is dropped when the check fails for any reason.
    pub async fn restore(&self) -> Result<bool> {
        let admin = match self.store.get::<Admin>(keys::ADMIN_DATA).await {
            Ok(admin) => admin,
            Err(err) => {
                warn!("discarding unreadable admin profile: {}", err);
                None
            }
        };
        let token = self.store.get_raw(keys::ADMIN_TOKEN).await?;

        let (admin, token) = match (admin, token) {
            (Some(admin), Some(token)) if !token.is_empty() => (admin, token),
            _ => return Ok(false),
        };
        *lock::write(&self.session) = Some(AdminSession { token, admin });

        match self.verify().await {
            Ok(true) => Ok(true),
            Ok(false) => {
                info!("stored admin token rejected");
                self.logout().await?;
                Ok(false)
            }
            Err(err) => {
                warn!("could not verify admin token: {}", err);
                self.logout().await?;
                Ok(false)
            }
        }
    }

    /// Log in as administrator
    pub async fn login(&self, username: &str, password: &str) -> Result<Admin> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(Error::validation("Username and password are required"));
        }

        let url = self.url("/admin/login");
        let response = Fetch::post(&self.client, &url)
            .json(&AdminCredentials {
                username,
                senha: password,
            })?
            .execute_raw()
            .await?;

        let status = response.status();
        if !is_json(&response) {
            let body = response.text().await.unwrap_or_default();
            warn!(
                "admin login got a non-JSON answer ({}): {}",
                status,
                body.chars().take(200).collect::<String>()
            );
            if status.is_success() {
                return Err(Error::invalid_response(SERVER_UNREACHABLE_MESSAGE));
            }
            return Err(Error::api(status.as_u16(), SERVER_UNREACHABLE_MESSAGE));
        }
        if !status.is_success() {
            return Err(error_from_response(response, "Login failed").await);
        }

        let body: AdminLoginResponse = serde_json::from_str(&response.text().await?)?;
        info!("admin {} logged in", body.admin.username);

        if let Err(err) = self.save(&body.token, &body.admin).await {
            self.forget_saved().await;
            return Err(err);
        }
        *lock::write(&self.session) = Some(AdminSession {
            token: body.token.clone(),
            admin: body.admin.clone(),
        });

        Ok(body.admin)
    }

    async fn save(&self, token: &str, admin: &Admin) -> Result<()> {
        self.store.set_raw(keys::ADMIN_TOKEN, token).await?;
        self.store.set(keys::ADMIN_DATA, admin).await?;
        Ok(())
    }

    async fn forget_saved(&self) {
        for key in [keys::ADMIN_TOKEN, keys::ADMIN_DATA] {
            if let Err(err) = self.store.remove(key).await {
                warn!("could not remove {}: {}", key, err);
            }
        }
    }

    /// Ask the server whether the current token is still valid
    pub async fn verify(&self) -> Result<bool> {
        let token = self.require_token()?;
        let url = self.url("/admin/verify");

        let response = Fetch::get(&self.client, &url)
            .bearer_auth(&token)
            .execute_raw()
            .await?;

        debug!("admin verify: {}", response.status());
        Ok(response.status().is_success())
    }

    /// Forget the admin session locally
    pub async fn logout(&self) -> Result<()> {
        lock::write(&self.session).take();
        self.store.remove(keys::ADMIN_TOKEN).await?;
        self.store.remove(keys::ADMIN_DATA).await?;
        Ok(())
    }

    pub fn session(&self) -> Option<AdminSession> {
        lock::read(&self.session).clone()
    }

    pub fn admin(&self) -> Option<Admin> {
        lock::read(&self.session)
            .as_ref()
            .map(|session| session.admin.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        lock::read(&self.session).is_some()
    }

    fn require_token(&self) -> Result<String> {
        lock::read(&self.session)
            .as_ref()
            .map(|session| session.token.clone())
            .ok_or(Error::NotAuthenticated)
    }

    pub async fn create_product(&self, product: &ProductInput) -> Result<Product> {
        if product.name.trim().is_empty() {
            return Err(Error::validation("Product name is required"));
        }
        if product.price.is_sign_negative() {
            return Err(Error::validation("Price cannot be negative"));
        }
        let token = self.require_token()?;
        let url = self.url("/admin/produtos");

        let response = Fetch::post(&self.client, &url)
            .bearer_auth(&token)
            .json(product)?
            .error_message("Failed to create product")
            .execute::<ProductEnvelope>()
            .await?;

        info!("created product {}", response.produto.id);
        Ok(response.produto)
    }

    pub async fn update_product(&self, product_id: i64, patch: &ProductPatch) -> Result<Product> {
        let token = self.require_token()?;
        let url = self.url(&format!("/admin/produtos/{}", product_id));

        let response = Fetch::put(&self.client, &url)
            .bearer_auth(&token)
            .json(patch)?
            .error_message("Failed to update product")
            .execute::<ProductEnvelope>()
            .await?;

        Ok(response.produto)
    }

    /// Delete a product. The backend refuses products that appear in orders.
    pub async fn delete_product(&self, product_id: i64) -> Result<()> {
        let token = self.require_token()?;
        let url = self.url(&format!("/admin/produtos/{}", product_id));

        Fetch::delete(&self.client, &url)
            .bearer_auth(&token)
            .error_message("Failed to delete product")
            .execute_empty()
            .await?;

        info!("deleted product {}", product_id);
        Ok(())
    }

    pub async fn create_category(&self, category: &CategoryInput) -> Result<Category> {
        if category.name.trim().is_empty() {
            return Err(Error::validation("Category name is required"));
        }
        let token = self.require_token()?;
        let url = self.url("/admin/categorias");

        let response = Fetch::post(&self.client, &url)
            .bearer_auth(&token)
            .json(category)?
            .error_message("Failed to create category")
            .execute::<CategoryEnvelope>()
            .await?;

        Ok(response.categoria)
    }

    /// Every customer account, newest first
    pub async fn list_users(&self) -> Result<Vec<UserSummary>> {
        let token = self.require_token()?;
        let url = self.url("/admin/usuarios");

        Fetch::get(&self.client, &url)
            .bearer_auth(&token)
            .error_message("Failed to load users")
            .execute::<Vec<UserSummary>>()
            .await
    }

    /// Enable or disable a customer account
    pub async fn set_user_active(&self, user_id: i64, active: bool) -> Result<()> {
        let token = self.require_token()?;
        let url = self.url(&format!("/admin/usuarios/{}/ativo", user_id));

        Fetch::put(&self.client, &url)
            .bearer_auth(&token)
            .json(&ActiveFlag { ativo: active })?
            .error_message("Failed to update user")
            .execute_empty()
            .await
    }

    pub async fn update_order_status(
        &self,
        order_id: i64,
        status: &OrderStatus,
    ) -> Result<StatusChange> {
        if let OrderStatus::Unknown(raw) = status {
            return Err(Error::validation(format!("Unknown order status: {}", raw)));
        }
        let token = self.require_token()?;
        let url = self.url(&format!("/admin/pedidos/{}/status", order_id));

        Fetch::put(&self.client, &url)
            .bearer_auth(&token)
            .json(&StatusBody {
                status: status.as_str(),
            })?
            .error_message("Failed to update order status")
            .execute::<StatusChange>()
            .await
    }

    pub async fn order_statistics(&self) -> Result<OrderStatistics> {
        let token = self.require_token()?;
        let url = self.url("/admin/pedidos/estatisticas");

        Fetch::get(&self.client, &url)
            .bearer_auth(&token)
            .error_message("Failed to load statistics")
            .execute::<OrderStatistics>()
            .await
    }
}
