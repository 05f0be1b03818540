//! Loja Rust Client Library
//!
//! Client-side state for the Loja storefront: cart, orders, the customer
//! session, favorites, the admin session and the theme preference, persisted
//! to a device-local key-value store and kept in step with the Loja REST API.

pub mod admin;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod config;
pub mod error;
pub mod favorites;
pub mod fetch;
pub mod keys;
pub mod orders;
pub mod preferences;

mod lock;
#[cfg(test)]
mod test_util;

use log::{info, warn};
use reqwest::Client;
use std::sync::Arc;

use loja_rust_storage::{FileStore, JsonStore};

use crate::admin::AdminClient;
use crate::auth::UserSession;
use crate::cart::CartStore;
use crate::catalog::CatalogClient;
use crate::config::ClientOptions;
use crate::error::Result;
use crate::favorites::Favorites;
use crate::orders::{CustomerDetails, NewOrder, Order, OrderStore};
use crate::preferences::ThemeStore;

/// The main entry point for the Loja client.
///
/// Owns one instance of every state container, all sharing the same HTTP
/// client and local store.
pub struct Loja {
    /// Client options
    pub options: ClientOptions,
    store: JsonStore,
    catalog: CatalogClient,
    cart: CartStore,
    session: Arc<UserSession>,
    orders: OrderStore,
    favorites: Favorites,
    admin: AdminClient,
    theme: ThemeStore,
}

impl Loja {
    /// Create a new client.
    ///
    /// State is kept in files under `options.storage_dir`, or in memory when
    /// no directory is set.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use loja_rust::{config::ClientOptions, Loja};
    ///
    /// # async fn run() -> loja_rust::error::Result<()> {
    /// let loja = Loja::new(ClientOptions::from_env().with_storage_dir("/tmp/loja"))?;
    /// loja.restore().await?;
    /// println!("{} items in cart", loja.cart().item_count());
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(options: ClientOptions) -> Result<Self> {
        let store = match &options.storage_dir {
            Some(dir) => JsonStore::new(Arc::new(FileStore::new(dir.clone()))),
            None => {
                warn!("no storage directory configured; state will not survive a restart");
                JsonStore::in_memory()
            }
        };
        Self::with_store(options, store)
    }

    /// Create a new client on top of an existing store
    pub fn with_store(options: ClientOptions, store: JsonStore) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = options.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder.build()?;
        let api_url = options.api_url.clone();

        let session = Arc::new(UserSession::new(&api_url, http_client.clone(), store.clone()));

        Ok(Self {
            catalog: CatalogClient::new(&api_url, http_client.clone()),
            cart: CartStore::new(store.clone()),
            orders: OrderStore::new(&api_url, http_client.clone(), store.clone(), session.clone()),
            favorites: Favorites::new(&api_url, http_client.clone(), store.clone(), session.clone()),
            admin: AdminClient::new(&api_url, http_client, store.clone()),
            theme: ThemeStore::new(store.clone()),
            session,
            store,
            options,
        })
    }

    /// Load everything persisted by a previous run.
    ///
    /// A stored admin session is verified against the server and dropped if
    /// the check fails.
    pub async fn restore(&self) -> Result<()> {
        self.cart.load().await?;
        self.orders.restore().await?;
        let logged_in = self.session.restore().await?;
        self.favorites.restore().await?;
        self.theme.load().await?;
        let admin = self.admin.restore().await?;

        info!(
            "restored state: user session {}, admin session {}, {} cart items",
            logged_in,
            admin,
            self.cart.item_count()
        );
        Ok(())
    }

    /// Place an order for everything in the cart and take the ordered
    /// quantities out of it.
    ///
    /// Lines added while the order is in flight stay in the cart. The cart
    /// is left as it was when the order is rejected.
    pub async fn checkout(&self, customer: &CustomerDetails) -> Result<Order> {
        let items = self.cart.items();
        let order = NewOrder::from_cart(&items, customer)?;
        let created = self.orders.create_order(&order).await?;
        self.cart.remove_ordered(&items).await?;
        Ok(created)
    }

    /// Log the customer out and forget their favorites
    pub async fn logout(&self) -> Result<()> {
        self.session.logout().await?;
        self.favorites.clear_local().await
    }

    pub fn catalog(&self) -> &CatalogClient {
        &self.catalog
    }

    pub fn cart(&self) -> &CartStore {
        &self.cart
    }

    pub fn orders(&self) -> &OrderStore {
        &self.orders
    }

    pub fn session(&self) -> &UserSession {
        &self.session
    }

    pub fn favorites(&self) -> &Favorites {
        &self.favorites
    }

    pub fn admin(&self) -> &AdminClient {
        &self.admin
    }

    pub fn theme(&self) -> &ThemeStore {
        &self.theme
    }

    /// The local store shared by every container
    pub fn store(&self) -> &JsonStore {
        &self.store
    }
}

/// A convenience module for common imports
pub mod prelude {
    pub use crate::cart::{Cart, CartItem};
    pub use crate::catalog::{Category, Product, ProductQuery};
    pub use crate::config::ClientOptions;
    pub use crate::error::{Error, Result};
    pub use crate::orders::{CustomerDetails, Order, OrderStatus};
    pub use crate::preferences::Theme;
    pub use crate::Loja;
}
