//! Types for products and categories

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

/// A product as listed by the storefront
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,

    #[serde(rename = "nome")]
    pub name: String,

    #[serde(rename = "descricao", default)]
    pub description: Option<String>,

    #[serde(rename = "preco")]
    pub price: Decimal,

    /// Units in stock when the product was fetched
    #[serde(rename = "estoque", default, deserialize_with = "deserialize_stock")]
    pub stock: u32,

    #[serde(rename = "imagem_url", default)]
    pub image_url: Option<String>,

    #[serde(rename = "categoria_id", default)]
    pub category_id: Option<i64>,

    #[serde(rename = "categoria_nome", default)]
    pub category_name: Option<String>,
}

impl Product {
    pub fn in_stock(&self) -> bool {
        self.stock > 0
    }
}

fn clamp_stock(stock: i64) -> u32 {
    u32::try_from(stock.max(0)).unwrap_or(u32::MAX)
}

// Stock is stored as a plain integer on the server and can go negative or
// be null; both read as no stock.
pub(crate) fn deserialize_stock<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<i64>::deserialize(deserializer)?
        .map(clamp_stock)
        .unwrap_or(0))
}

pub(crate) fn deserialize_optional_stock<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<i64>::deserialize(deserializer)?.map(clamp_stock))
}

/// A product category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,

    #[serde(rename = "nome")]
    pub name: String,

    #[serde(rename = "descricao", default)]
    pub description: Option<String>,
}

/// Stock filter for product searches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Availability {
    #[default]
    All,
    InStock,
    OutOfStock,
}

impl Availability {
    fn as_param(&self) -> Option<&'static str> {
        match self {
            Self::All => None,
            Self::InStock => Some("disponivel"),
            Self::OutOfStock => Some("indisponivel"),
        }
    }
}

/// Sort order for product searches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductSort {
    Name,
    PriceAsc,
    PriceDesc,
    Newest,
}

impl ProductSort {
    fn as_param(&self) -> &'static str {
        match self {
            Self::Name => "nome",
            Self::PriceAsc => "preco_asc",
            Self::PriceDesc => "preco_desc",
            Self::Newest => "data_desc",
        }
    }
}

/// Filters for listing products
#[derive(Debug, Clone, Default)]
pub struct ProductQuery {
    pub search: Option<String>,
    pub category_id: Option<i64>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub availability: Availability,
    pub sort: Option<ProductSort>,
}

impl ProductQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Match products whose name contains `text`
    pub fn search(mut self, text: &str) -> Self {
        self.search = Some(text.to_string());
        self
    }

    pub fn category(mut self, category_id: i64) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn price_between(mut self, min: Option<Decimal>, max: Option<Decimal>) -> Self {
        self.min_price = min;
        self.max_price = max;
        self
    }

    pub fn availability(mut self, availability: Availability) -> Self {
        self.availability = availability;
        self
    }

    pub fn sort_by(mut self, sort: ProductSort) -> Self {
        self.sort = Some(sort);
        self
    }

    /// Query string pairs in the order the backend expects them
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();

        if let Some(search) = self.search.as_deref().map(str::trim) {
            if !search.is_empty() {
                params.push(("busca".to_string(), search.to_string()));
            }
        }
        if let Some(category_id) = self.category_id {
            params.push(("categoria_id".to_string(), category_id.to_string()));
        }
        if let Some(min) = self.min_price {
            params.push(("preco_min".to_string(), min.to_string()));
        }
        if let Some(max) = self.max_price {
            params.push(("preco_max".to_string(), max.to_string()));
        }
        if let Some(availability) = self.availability.as_param() {
            params.push(("disponibilidade".to_string(), availability.to_string()));
        }
        if let Some(sort) = self.sort {
            params.push(("ordenacao".to_string(), sort.as_param().to_string()));
        }

        params
    }
}
