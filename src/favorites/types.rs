//! Types for favorites

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A product the user marked as favorite, with a snapshot of the product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Favorite {
    /// Zero until the server has confirmed the favorite
    #[serde(default)]
    pub id: i64,

    #[serde(rename = "produto_id")]
    pub product_id: i64,

    #[serde(rename = "produto_nome", default)]
    pub product_name: Option<String>,

    #[serde(rename = "produto_preco", default)]
    pub product_price: Option<Decimal>,

    #[serde(rename = "produto_imagem", default)]
    pub product_image: Option<String>,

    #[serde(
        rename = "produto_estoque",
        default,
        deserialize_with = "crate::catalog::deserialize_optional_stock"
    )]
    pub product_stock: Option<u32>,

    #[serde(rename = "data_favorito", default)]
    pub added_at: Option<NaiveDateTime>,
}

impl Favorite {
    /// Local record for a favorite the server has not confirmed yet
    pub fn unconfirmed(product_id: i64) -> Self {
        Self {
            id: 0,
            product_id,
            product_name: None,
            product_price: None,
            product_image: None,
            product_stock: None,
            added_at: None,
        }
    }

    pub fn is_confirmed(&self) -> bool {
        self.id != 0
    }
}

/// A local change the server has not acknowledged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "op", content = "produto_id", rename_all = "snake_case")]
pub enum PendingChange {
    Add(i64),
    Remove(i64),
}

impl PendingChange {
    pub fn product_id(&self) -> i64 {
        match self {
            Self::Add(id) | Self::Remove(id) => *id,
        }
    }
}

/// Whether a change reached the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeStatus {
    /// The server accepted the change
    Confirmed,
    /// The server was unreachable; the change is replayed on the next sync
    Queued,
}

/// Outcome of [`Favorites::sync`](super::Favorites::sync)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FavoritesSync {
    /// Pending changes the server accepted
    pub replayed: usize,
    /// Pending changes the server rejected; they are dropped
    pub rejected: usize,
    /// Favorites after the merge
    pub total: usize,
}

/// What is persisted under the `favorites` key
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct FavoritesState {
    /// Account the favorites and queued changes belong to
    #[serde(rename = "usuario_id", default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<i64>,
    #[serde(default)]
    pub favorites: Vec<Favorite>,
    #[serde(default)]
    pub pending: Vec<PendingChange>,
}

impl FavoritesState {
    pub fn owned_by(user_id: i64) -> Self {
        Self {
            owner: Some(user_id),
            ..Self::default()
        }
    }

    pub fn contains(&self, product_id: i64) -> bool {
        self.favorites
            .iter()
            .any(|favorite| favorite.product_id == product_id)
    }

    /// Queue `change`, replacing any earlier change for the same product
    pub fn record(&mut self, change: PendingChange) {
        self.pending
            .retain(|queued| queued.product_id() != change.product_id());
        self.pending.push(change);
    }

    /// Drop `change` from the queue. Returns false if it was superseded.
    pub fn settle(&mut self, change: PendingChange) -> bool {
        match self.pending.iter().position(|queued| *queued == change) {
            Some(idx) => {
                self.pending.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Remove and return the favorite for `product_id`
    pub fn take(&mut self, product_id: i64) -> Option<Favorite> {
        let idx = self
            .favorites
            .iter()
            .position(|favorite| favorite.product_id == product_id)?;
        Some(self.favorites.remove(idx))
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct NewFavorite {
    pub produto_id: i64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AddFavoriteResponse {
    pub favorito: Favorite,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FavoriteStatus {
    pub is_favorito: bool,
}
