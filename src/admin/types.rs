//! Types for the admin endpoints

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::auth::User;
use crate::catalog::{Category, Product};
use crate::orders::OrderStatus;

/// Administrator account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Admin {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Logged-in administrator
#[derive(Debug, Clone, PartialEq)]
pub struct AdminSession {
    /// Bearer token for the `/admin` routes
    pub token: String,
    pub admin: Admin,
}

/// New product
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductInput {
    #[serde(rename = "nome")]
    pub name: String,

    #[serde(rename = "descricao")]
    pub description: String,

    #[serde(rename = "preco")]
    pub price: Decimal,

    #[serde(rename = "categoria_id")]
    pub category_id: i64,

    #[serde(rename = "estoque")]
    pub stock: u32,

    #[serde(rename = "imagem_url", skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    /// Inactive products are hidden from the storefront
    #[serde(rename = "ativo")]
    pub active: bool,
}

impl ProductInput {
    pub fn new(name: &str, description: &str, price: Decimal, category_id: i64) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            price,
            category_id,
            stock: 0,
            image_url: None,
            active: true,
        }
    }

    pub fn with_stock(mut self, stock: u32) -> Self {
        self.stock = stock;
        self
    }

    pub fn with_image_url(mut self, url: &str) -> Self {
        self.image_url = Some(url.to_string());
        self
    }
}

/// Product fields to change; `None` leaves a field as it is
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProductPatch {
    #[serde(rename = "nome", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(rename = "descricao", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(rename = "preco", skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,

    #[serde(rename = "estoque", skip_serializing_if = "Option::is_none")]
    pub stock: Option<u32>,

    #[serde(rename = "imagem_url", skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    #[serde(rename = "categoria_id", skip_serializing_if = "Option::is_none")]
    pub category_id: Option<i64>,

    #[serde(rename = "ativo", skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

/// New category
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryInput {
    #[serde(rename = "nome")]
    pub name: String,

    #[serde(rename = "descricao", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A customer account as listed for administrators
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UserSummary {
    #[serde(flatten)]
    pub user: User,

    #[serde(rename = "ativo")]
    pub active: bool,

    #[serde(rename = "total_pedidos", default)]
    pub order_count: u64,
}

/// Result of an order status change
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StatusChange {
    pub id: i64,
    pub status: OrderStatus,
    #[serde(rename = "data_atualizacao")]
    pub updated_at: NaiveDateTime,
}

/// Short order entry in [`OrderStatistics`]
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RecentOrder {
    pub id: i64,
    pub total: Decimal,
    pub status: OrderStatus,
    #[serde(rename = "data_pedido")]
    pub created_at: NaiveDateTime,
    #[serde(rename = "nome_cliente", default)]
    pub customer_name: Option<String>,
}

/// Dashboard figures
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OrderStatistics {
    #[serde(rename = "total_pedidos")]
    pub total_orders: u64,

    /// Sum over processing, shipped and delivered orders
    #[serde(rename = "faturamento_total")]
    pub revenue: Decimal,

    #[serde(default)]
    pub status_counts: HashMap<OrderStatus, u64>,

    #[serde(rename = "pedidos_recentes", default)]
    pub recent_orders: Vec<RecentOrder>,
}

impl OrderStatistics {
    pub fn count(&self, status: &OrderStatus) -> u64 {
        self.status_counts.get(status).copied().unwrap_or(0)
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct AdminCredentials<'a> {
    pub username: &'a str,
    pub senha: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AdminLoginResponse {
    pub token: String,
    pub admin: Admin,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProductEnvelope {
    pub produto: Product,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CategoryEnvelope {
    pub categoria: Category,
}

#[derive(Debug, Serialize)]
pub(crate) struct ActiveFlag {
    pub ativo: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct StatusBody<'a> {
    pub status: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_statistics_from_backend_json() {
        let stats: OrderStatistics = serde_json::from_value(json!({
            "total_pedidos": 12,
            "faturamento_total": 1530.5,
            "status_counts": { "pendente": 3, "processando": 2, "enviado": 4, "entregue": 3 },
            "pedidos_recentes": [{
                "id": 12,
                "total": 99.9,
                "status": "pendente",
                "data_pedido": "2025-03-04T18:20:00",
                "nome_cliente": "Ana"
            }]
        }))
        .unwrap();

        assert_eq!(stats.revenue, Decimal::new(15305, 1));
        assert_eq!(stats.count(&OrderStatus::Shipped), 4);
        assert_eq!(stats.count(&OrderStatus::Cancelled), 0);
        assert_eq!(stats.recent_orders[0].customer_name.as_deref(), Some("Ana"));
    }

    #[test]
    fn test_user_summary_flattens_profile() {
        let summary: UserSummary = serde_json::from_value(json!({
            "id": 4,
            "nome": "Bia",
            "email": "bia@example.com",
            "telefone": "",
            "endereco": "",
            "is_admin": false,
            "data_criacao": "2025-01-10T08:00:00",
            "data_nascimento": null,
            "genero": "",
            "avatar_url": "",
            "ativo": false,
            "total_pedidos": 2
        }))
        .unwrap();

        assert_eq!(summary.user.name, "Bia");
        assert!(!summary.active);
        assert_eq!(summary.order_count, 2);
    }

    #[test]
    fn test_product_patch_sends_only_changes() {
        let patch = ProductPatch {
            price: Some(Decimal::new(4990, 2)),
            active: Some(false),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            json!({ "preco": 49.9, "ativo": false })
        );
    }
}
