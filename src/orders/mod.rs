//! Checkout and the cached order list

mod reconcile;
mod types;

use log::{debug, error, info, warn};
use reqwest::Client;
use std::sync::{Arc, RwLock};

use loja_rust_storage::JsonStore;

use crate::auth::UserSession;
use crate::error::{Error, Result};
use crate::fetch::{endpoint, Fetch};
use crate::keys;
use crate::lock;

pub use reconcile::{reconcile_orders, OrderReconciliation};
pub use types::*;

/// Order container.
///
/// Holds the last order list seen by this device, persisted under `orders`.
/// Failed calls never touch the cache.
pub struct OrderStore {
    api_url: String,
    client: Client,
    store: JsonStore,
    session: Arc<UserSession>,
    orders: RwLock<Vec<Order>>,
}

impl OrderStore {
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
            orders: RwLock::new(Vec::new()),
        }
    }

    /// Load the cached list from the local store
    pub async fn restore(&self) -> Result<()> {
        let cached = match self.store.get::<Vec<Order>>(keys::ORDERS).await {
            Ok(cached) => cached.unwrap_or_default(),
            Err(err) => {
                warn!("discarding unreadable order cache: {}", err);
                Vec::new()
            }
        };
        *lock::write(&self.orders) = cached;
        Ok(())
    }

    /// Snapshot of the cached orders, newest first
    pub fn orders(&self) -> Vec<Order> {
        lock::read(&self.orders).clone()
    }

    /// Submit an order. On success the new order is put at the front of the
    /// cache.
    ///
    /// The bearer token is attached when a user is logged in so the order is
    /// linked to the account; guests can order too.
    pub async fn create_order(&self, order: &NewOrder) -> Result<Order> {
        if order.items.is_empty() {
            return Err(Error::validation("Your cart is empty"));
        }

        let url = endpoint(&self.api_url, "/pedidos");
        let token = self.session.token();

        let response = Fetch::post(&self.client, &url)
            .optional_bearer_auth(token.as_deref())
            .json(order)?
            .error_message("Failed to create order")
            .execute::<CreateOrderResponse>()
            .await
            .map_err(|err| {
                error!("order submission failed: {}", err);
                err
            })?;

        let created = Order::from_submission(response.pedido, order);
        info!("created order {} ({})", created.id, created.total);

        let snapshot = {
            let mut orders = lock::write(&self.orders);
            orders.retain(|existing| existing.id != created.id);
            orders.insert(0, created.clone());
            orders.clone()
        };
        self.persist(&snapshot).await?;

        Ok(created)
    }

    /// Replace the cache with every order on the server
    pub async fn load_orders(&self) -> Result<Vec<Order>> {
        let url = endpoint(&self.api_url, "/pedidos");
        let token = self.session.token();

        let orders = Fetch::get(&self.client, &url)
            .optional_bearer_auth(token.as_deref())
            .error_message("Failed to load orders")
            .execute::<Vec<Order>>()
            .await?;

        debug!("loaded {} orders", orders.len());
        *lock::write(&self.orders) = orders.clone();
        self.persist(&orders).await?;

        Ok(orders)
    }

    /// Fetch the logged-in user's order history and merge it into the cache
    pub async fn load_history(&self) -> Result<OrderReconciliation> {
        let token = self.session.require_token()?;
        let url = endpoint(&self.api_url, "/usuarios/historico");

        let remote = Fetch::get(&self.client, &url)
            .bearer_auth(&token)
            .error_message("Failed to load order history")
            .execute::<Vec<Order>>()
            .await?;

        let result = {
            let mut orders = lock::write(&self.orders);
            let result = reconcile_orders(&orders, remote);
            *orders = result.orders.clone();
            result
        };
        debug!(
            "order history: {} added, {} updated, {} dropped",
            result.added, result.updated, result.dropped
        );
        self.persist(&result.orders).await?;

        Ok(result)
    }

    /// Fetch one order. The cache is not changed.
    pub async fn get_order(&self, order_id: i64) -> Result<Order> {
        let url = endpoint(&self.api_url, &format!("/pedidos/{}", order_id));
        let token = self.session.token();

        Fetch::get(&self.client, &url)
            .optional_bearer_auth(token.as_deref())
            .error_message("Order not found")
            .execute::<Order>()
            .await
    }

    /// Forget every cached order
    pub async fn clear(&self) -> Result<()> {
        lock::write(&self.orders).clear();
        self.store.remove(keys::ORDERS).await?;
        Ok(())
    }

    async fn persist(&self, orders: &[Order]) -> Result<()> {
        self.store.set(keys::ORDERS, orders).await.map_err(|err| {
            error!("failed to save orders: {}", err);
            Error::from(err)
        })
    }
}
