//! Cart line items and the pure cart model

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::catalog::Product;

/// One product entry in the cart, with its own quantity.
///
/// Name, price, image and category are a snapshot taken when the product
/// was first added; later catalog changes do not affect the line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    /// Line id, unique within the cart
    pub id: i64,

    #[serde(rename = "produto_id")]
    pub product_id: i64,

    #[serde(rename = "nome")]
    pub name: String,

    #[serde(rename = "preco")]
    pub unit_price: Decimal,

    #[serde(rename = "quantidade")]
    pub quantity: u32,

    #[serde(rename = "imagem_url", default)]
    pub image_url: Option<String>,

    #[serde(rename = "categoria_nome", default)]
    pub category_name: Option<String>,
}

impl CartItem {
    fn from_product(id: i64, product: &Product, quantity: u32) -> Self {
        Self {
            id,
            product_id: product.id,
            name: product.name.clone(),
            unit_price: product.price,
            quantity,
            image_url: product.image_url.clone(),
            category_name: product.category_name.clone(),
        }
    }

    /// unit price × quantity
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Line item as written under the legacy `carrinho` key, where `id` is the
/// product id
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct LegacyCartItem {
    id: i64,
    nome: String,
    preco: Decimal,
    quantidade: u32,
    #[serde(default)]
    imagem_url: Option<String>,
}

/// In-memory cart.
///
/// Lines are unique by `product_id` and always have a quantity of at least 1.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a cart from persisted lines, folding duplicates and dropping
    /// empty lines
    pub fn from_items(items: Vec<CartItem>) -> Self {
        let mut cart = Cart::new();
        for item in items {
            if item.quantity == 0 {
                continue;
            }
            match cart.line_mut(item.product_id) {
                Some(line) => line.quantity = line.quantity.saturating_add(item.quantity),
                None => cart.items.push(item),
            }
        }
        cart
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    fn line(&self, product_id: i64) -> Option<&CartItem> {
        self.items.iter().find(|item| item.product_id == product_id)
    }

    fn line_mut(&mut self, product_id: i64) -> Option<&mut CartItem> {
        self.items.iter_mut().find(|item| item.product_id == product_id)
    }

    /// Adds `quantity` units of `product`, creating the line if needed.
    /// A zero quantity is ignored.
    pub fn add(&mut self, product: &Product, quantity: u32) {
        if quantity == 0 {
            return;
        }
        if let Some(line) = self.line_mut(product.id) {
            line.quantity = line.quantity.saturating_add(quantity);
            return;
        }
        let id = self.next_line_id();
        self.items
            .push(CartItem::from_product(id, product, quantity));
    }

    /// Removes the line for `product_id`. Returns whether a line was removed.
    pub fn remove(&mut self, product_id: i64) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.product_id != product_id);
        self.items.len() != before
    }

    /// Sets the quantity of an existing line; `quantity <= 0` removes it.
    /// Returns whether the cart changed.
    pub fn set_quantity(&mut self, product_id: i64, quantity: i64) -> bool {
        if quantity <= 0 {
            return self.remove(product_id);
        }
        let quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
        match self.line_mut(product_id) {
            Some(line) if line.quantity != quantity => {
                line.quantity = quantity;
                true
            }
            _ => false,
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Takes the quantities of `ordered` out of the cart. Lines that drop to
    /// zero are removed; anything added since `ordered` was taken stays.
    pub fn remove_ordered(&mut self, ordered: &[CartItem]) {
        for done in ordered {
            if let Some(line) = self.line_mut(done.product_id) {
                line.quantity = line.quantity.saturating_sub(done.quantity);
            }
        }
        self.items.retain(|item| item.quantity > 0);
    }

    pub fn contains(&self, product_id: i64) -> bool {
        self.line(product_id).is_some()
    }

    pub fn quantity_of(&self, product_id: i64) -> u32 {
        self.line(product_id).map(|item| item.quantity).unwrap_or(0)
    }

    /// Sum of price × quantity over every line
    pub fn total(&self) -> Decimal {
        self.items.iter().map(CartItem::line_total).sum()
    }

    /// Sum of quantities over every line
    pub fn item_count(&self) -> u32 {
        self.items
            .iter()
            .fold(0u32, |count, item| count.saturating_add(item.quantity))
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Fold lines from the legacy store into this cart
    pub(crate) fn merge_legacy(&mut self, legacy: Vec<LegacyCartItem>) {
        for old in legacy {
            if old.quantidade == 0 {
                continue;
            }
            if let Some(line) = self.line_mut(old.id) {
                line.quantity = line.quantity.saturating_add(old.quantidade);
                continue;
            }
            let id = self.next_line_id();
            self.items.push(CartItem {
                id,
                product_id: old.id,
                name: old.nome,
                unit_price: old.preco,
                quantity: old.quantidade,
                image_url: old.imagem_url,
                category_name: None,
            });
        }
    }

    // Millisecond timestamp, bumped past the largest id already in use.
    fn next_line_id(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let max = self.items.iter().map(|item| item.id).max().unwrap_or(0);
        now.max(max + 1)
    }
}
