//! Shopping cart state, persisted to the local store after every change

mod items;

use log::{error, info, warn};
use rust_decimal::Decimal;
use std::sync::RwLock;
use tokio::sync::Mutex;

use loja_rust_storage::JsonStore;

use crate::catalog::Product;
use crate::error::{Error, Result};
use crate::keys;
use crate::lock;

pub use items::{Cart, CartItem};
use items::LegacyCartItem;

/// Cart container.
///
/// Every mutation is applied to memory first, then the whole list is written
/// under the `cart` key. Writes run one at a time and each one saves the cart
/// as it is when the write starts, so storage always ends up with the latest
/// state.
///
/// Memory is the source of truth while the process runs. A failed write is
/// logged and does not fail the mutation; the next successful write stores
/// everything.
pub struct CartStore {
    store: JsonStore,
    cart: RwLock<Cart>,
    writer: Mutex<()>,
}

impl CartStore {
    pub fn new(store: JsonStore) -> Self {
        Self {
            store,
            cart: RwLock::new(Cart::new()),
            writer: Mutex::new(()),
        }
    }

    /// Load the persisted cart, migrating lines left under the legacy
    /// `carrinho` key.
    pub async fn load(&self) -> Result<()> {
        let saved = match self.store.get::<Vec<CartItem>>(keys::CART).await {
            Ok(saved) => saved.unwrap_or_default(),
            Err(err) => {
                warn!("discarding unreadable cart: {}", err);
                Vec::new()
            }
        };
        let mut cart = Cart::from_items(saved);

        let legacy = match self.store.get::<Vec<LegacyCartItem>>(keys::LEGACY_CART).await {
            Ok(legacy) => legacy,
            Err(err) => {
                warn!("discarding unreadable legacy cart: {}", err);
                Some(Vec::new())
            }
        };

        match legacy {
            Some(legacy) => {
                info!("migrating {} legacy cart lines", legacy.len());
                cart.merge_legacy(legacy);
                *lock::write(&self.cart) = cart;
                // The legacy key is only dropped once its lines are saved.
                self.persist().await?;
                self.store.remove(keys::LEGACY_CART).await?;
            }
            None => {
                *lock::write(&self.cart) = cart;
            }
        }

        Ok(())
    }

    /// Snapshot of the current lines
    pub fn items(&self) -> Vec<CartItem> {
        lock::read(&self.cart).items().to_vec()
    }

    /// Snapshot of the whole cart
    pub fn snapshot(&self) -> Cart {
        lock::read(&self.cart).clone()
    }

    /// Sum of price × quantity
    pub fn total(&self) -> Decimal {
        lock::read(&self.cart).total()
    }

    /// Sum of quantities
    pub fn item_count(&self) -> u32 {
        lock::read(&self.cart).item_count()
    }

    pub fn is_empty(&self) -> bool {
        lock::read(&self.cart).is_empty()
    }

    pub fn contains(&self, product_id: i64) -> bool {
        lock::read(&self.cart).contains(product_id)
    }

    pub fn quantity_of(&self, product_id: i64) -> u32 {
        lock::read(&self.cart).quantity_of(product_id)
    }

    /// Add one unit of `product`
    pub async fn add_item(&self, product: &Product) -> Result<()> {
        lock::write(&self.cart).add(product, 1);
        self.save().await;
        Ok(())
    }

    /// Add `quantity` units of `product`, refusing to go past the stock
    /// recorded in the product snapshot
    pub async fn add_quantity(&self, product: &Product, quantity: u32) -> Result<()> {
        if quantity == 0 {
            return Err(Error::validation("Quantity must be at least 1"));
        }

        {
            let mut cart = lock::write(&self.cart);
            let wanted = cart.quantity_of(product.id).saturating_add(quantity);
            if wanted > product.stock {
                return Err(Error::InsufficientStock {
                    product_id: product.id,
                    available: product.stock,
                });
            }
            cart.add(product, quantity);
        }
        self.save().await;
        Ok(())
    }

    /// Remove the line for `product_id`, if present
    pub async fn remove_item(&self, product_id: i64) -> Result<()> {
        lock::write(&self.cart).remove(product_id);
        self.save().await;
        Ok(())
    }

    /// Set the quantity of a line; zero or negative removes it
    pub async fn update_quantity(&self, product_id: i64, quantity: i64) -> Result<()> {
        lock::write(&self.cart).set_quantity(product_id, quantity);
        self.save().await;
        Ok(())
    }

    /// Empty the cart
    pub async fn clear(&self) -> Result<()> {
        lock::write(&self.cart).clear();
        self.save().await;
        Ok(())
    }

    /// Take the quantities of an order placed from `ordered` out of the cart
    pub async fn remove_ordered(&self, ordered: &[CartItem]) -> Result<()> {
        lock::write(&self.cart).remove_ordered(ordered);
        self.save().await;
        Ok(())
    }

    async fn save(&self) {
        if let Err(err) = self.persist().await {
            error!("failed to save cart, keeping changes in memory: {}", err);
        }
    }

    async fn persist(&self) -> Result<()> {
        let _writer = self.writer.lock().await;
        let cart = self.snapshot();
        self.store.set(keys::CART, &cart).await?;
        Ok(())
    }
}
