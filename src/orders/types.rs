//! Types for orders and checkout

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::cart::CartItem;
use crate::error::{Error, Result};

/// Lifecycle state of an order.
///
/// Values the client does not know are kept verbatim in `Unknown`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Unknown(String),
}

impl OrderStatus {
    /// Every status the backend accepts
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    /// Wire value
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pendente",
            Self::Processing => "processando",
            Self::Shipped => "enviado",
            Self::Delivered => "entregue",
            Self::Cancelled => "cancelado",
            Self::Unknown(raw) => raw,
        }
    }

    /// Display text
    pub fn label(&self) -> &str {
        match self {
            Self::Pending => "Pending",
            Self::Processing => "Processing",
            Self::Shipped => "Shipped",
            Self::Delivered => "Delivered",
            Self::Cancelled => "Cancelled",
            Self::Unknown(raw) => raw,
        }
    }

    /// Badge colour as a hex string
    pub fn color(&self) -> &'static str {
        match self {
            Self::Pending => "#ffc107",
            Self::Processing => "#17a2b8",
            Self::Shipped => "#007bff",
            Self::Delivered => "#28a745",
            Self::Cancelled => "#dc3545",
            Self::Unknown(_) => "#6c757d",
        }
    }
}

impl From<String> for OrderStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "pendente" => Self::Pending,
            "processando" => Self::Processing,
            "enviado" => Self::Shipped,
            "entregue" => Self::Delivered,
            "cancelado" => Self::Cancelled,
            _ => Self::Unknown(value),
        }
    }
}

impl From<OrderStatus> for String {
    fn from(status: OrderStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One product line of a placed order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    /// Zero until the backend has assigned an id
    #[serde(default)]
    pub id: i64,

    #[serde(rename = "produto_id")]
    pub product_id: i64,

    #[serde(rename = "quantidade")]
    pub quantity: u32,

    #[serde(rename = "preco_unitario")]
    pub unit_price: Decimal,

    #[serde(rename = "produto_nome", default)]
    pub product_name: String,

    #[serde(rename = "produto_imagem", default)]
    pub product_image: Option<String>,
}

/// A placed order as cached on the device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,

    pub total: Decimal,

    pub status: OrderStatus,

    #[serde(rename = "data_pedido")]
    pub created_at: NaiveDateTime,

    #[serde(rename = "data_atualizacao", default)]
    pub updated_at: Option<NaiveDateTime>,

    #[serde(rename = "nome_cliente", default)]
    pub customer_name: Option<String>,

    #[serde(rename = "email_cliente", default)]
    pub customer_email: Option<String>,

    #[serde(rename = "telefone_cliente", default)]
    pub customer_phone: Option<String>,

    #[serde(rename = "endereco_entrega", default)]
    pub delivery_address: Option<String>,

    #[serde(rename = "cidade_entrega", default)]
    pub delivery_city: Option<String>,

    #[serde(rename = "cep_entrega", default)]
    pub delivery_postal_code: Option<String>,

    #[serde(rename = "observacoes", default)]
    pub notes: Option<String>,

    #[serde(rename = "itens", default)]
    pub items: Vec<OrderLine>,
}

/// Contact and delivery details collected at checkout
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CustomerDetails {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub notes: Option<String>,
}

impl CustomerDetails {
    /// Every field except `notes` is required and the email must look like
    /// `local@domain.tld`
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("name", &self.name),
            ("email", &self.email),
            ("phone", &self.phone),
            ("address", &self.address),
            ("city", &self.city),
            ("postal code", &self.postal_code),
        ];
        let missing: Vec<&str> = required
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(field, _)| *field)
            .collect();

        if !missing.is_empty() {
            return Err(Error::validation(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )));
        }

        if !looks_like_email(self.email.trim()) {
            return Err(Error::validation("Enter a valid email address"));
        }

        Ok(())
    }
}

fn looks_like_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    domain
        .char_indices()
        .any(|(idx, c)| c == '.' && idx > 0 && idx + 1 < domain.len())
}

/// A line of an order being submitted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOrderItem {
    #[serde(rename = "produto_id")]
    pub product_id: i64,

    #[serde(rename = "quantidade")]
    pub quantity: u32,

    #[serde(rename = "preco")]
    pub unit_price: Decimal,

    #[serde(rename = "nome")]
    pub name: String,

    #[serde(rename = "imagem_url", default)]
    pub image_url: Option<String>,
}

/// Checkout payload for `POST /pedidos`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOrder {
    #[serde(rename = "itens")]
    pub items: Vec<NewOrderItem>,

    pub total: Decimal,

    #[serde(rename = "nome_cliente")]
    pub customer_name: String,

    #[serde(rename = "email_cliente")]
    pub customer_email: String,

    #[serde(rename = "telefone_cliente")]
    pub customer_phone: String,

    #[serde(rename = "endereco_entrega")]
    pub delivery_address: String,

    #[serde(rename = "cidade_entrega")]
    pub delivery_city: String,

    #[serde(rename = "cep_entrega")]
    pub delivery_postal_code: String,

    #[serde(rename = "observacoes", default)]
    pub notes: String,
}

impl NewOrder {
    /// Build a checkout payload from cart lines, validating the customer
    /// details and rejecting an empty cart
    pub fn from_cart(items: &[CartItem], customer: &CustomerDetails) -> Result<Self> {
        if items.is_empty() {
            return Err(Error::validation("Your cart is empty"));
        }
        customer.validate()?;

        let items: Vec<NewOrderItem> = items
            .iter()
            .map(|item| NewOrderItem {
                product_id: item.product_id,
                quantity: item.quantity,
                unit_price: item.unit_price,
                name: item.name.clone(),
                image_url: item.image_url.clone(),
            })
            .collect();
        let total = items
            .iter()
            .map(|item| item.unit_price * Decimal::from(item.quantity))
            .sum();

        Ok(Self {
            items,
            total,
            customer_name: customer.name.trim().to_string(),
            customer_email: customer.email.trim().to_string(),
            customer_phone: customer.phone.trim().to_string(),
            delivery_address: customer.address.trim().to_string(),
            delivery_city: customer.city.trim().to_string(),
            delivery_postal_code: customer.postal_code.trim().to_string(),
            notes: customer.notes.clone().unwrap_or_default(),
        })
    }
}

/// Summary the backend returns after creating an order
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CreatedOrder {
    pub id: i64,
    pub total: Decimal,
    pub status: OrderStatus,
    pub data_pedido: NaiveDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CreateOrderResponse {
    pub pedido: CreatedOrder,
}

impl Order {
    /// Local record for a freshly created order: server-assigned fields from
    /// `created`, everything else from the submitted payload
    pub(crate) fn from_submission(created: CreatedOrder, submitted: &NewOrder) -> Self {
        Self {
            id: created.id,
            total: created.total,
            status: created.status,
            created_at: created.data_pedido,
            updated_at: Some(created.data_pedido),
            customer_name: Some(submitted.customer_name.clone()),
            customer_email: Some(submitted.customer_email.clone()),
            customer_phone: Some(submitted.customer_phone.clone()),
            delivery_address: Some(submitted.delivery_address.clone()),
            delivery_city: Some(submitted.delivery_city.clone()),
            delivery_postal_code: Some(submitted.delivery_postal_code.clone()),
            notes: Some(submitted.notes.clone()),
            items: submitted
                .items
                .iter()
                .map(|item| OrderLine {
                    id: 0,
                    product_id: item.product_id,
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                    product_name: if item.name.is_empty() {
                        "Product".to_string()
                    } else {
                        item.name.clone()
                    },
                    product_image: item.image_url.clone(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn customer() -> CustomerDetails {
        CustomerDetails {
            name: "Ana Souza".to_string(),
            email: "ana@example.com".to_string(),
            phone: "+258 84 000 0000".to_string(),
            address: "Av. Julius Nyerere, 100".to_string(),
            city: "Maputo".to_string(),
            postal_code: "1100".to_string(),
            notes: None,
        }
    }

    #[test]
    fn test_status_round_trip_and_unknown() {
        let status: OrderStatus = serde_json::from_value(json!("enviado")).unwrap();
        assert_eq!(status, OrderStatus::Shipped);
        assert_eq!(status.color(), "#007bff");
        assert_eq!(serde_json::to_value(&status).unwrap(), json!("enviado"));

        let status: OrderStatus = serde_json::from_value(json!("devolvido")).unwrap();
        assert_eq!(status, OrderStatus::Unknown("devolvido".to_string()));
        assert_eq!(status.label(), "devolvido");
        assert_eq!(status.color(), "#6c757d");
        assert_eq!(serde_json::to_value(&status).unwrap(), json!("devolvido"));
    }

    #[test]
    fn test_validate_reports_missing_fields() {
        let mut details = customer();
        details.email = "  ".to_string();
        details.postal_code = String::new();

        match details.validate() {
            Err(Error::Validation(msg)) => {
                assert_eq!(msg, "Missing required fields: email, postal code");
            }
            other => panic!("Expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_email_shape() {
        assert!(looks_like_email("ana@example.com"));
        assert!(looks_like_email("a.b@c.co.mz"));
        assert!(!looks_like_email("ana@example"));
        assert!(!looks_like_email("ana@.com"));
        assert!(!looks_like_email("ana@example."));
        assert!(!looks_like_email("@example.com"));
        assert!(!looks_like_email("ana @example.com"));
        assert!(!looks_like_email("ana@ex@ample.com"));
    }

    #[test]
    fn test_order_parses_history_entry_without_customer_fields() {
        let order: Order = serde_json::from_value(json!({
            "id": 5,
            "total": 120.0,
            "status": "pendente",
            "data_pedido": "2025-03-01T10:15:30.123456",
            "data_atualizacao": "2025-03-01T10:15:30",
            "itens": [{
                "id": 9,
                "produto_id": 2,
                "produto_nome": "Produto removido",
                "produto_imagem": "",
                "quantidade": 2,
                "preco_unitario": 60.0
            }]
        }))
        .unwrap();

        assert_eq!(order.status, OrderStatus::Pending);
        assert!(order.customer_name.is_none());
        assert_eq!(order.items[0].quantity, 2);
    }
}
