//! Read-only access to products and categories

mod types;

use reqwest::Client;

use crate::error::Result;
use crate::fetch::{endpoint, Fetch};

pub use types::*;
pub(crate) use types::deserialize_optional_stock;

/// Client for the public catalog endpoints
#[derive(Clone)]
pub struct CatalogClient {
    api_url: String,
    client: Client,
}

impl CatalogClient {
    pub(crate) fn new(api_url: &str, client: Client) -> Self {
        Self {
            api_url: api_url.to_string(),
            client,
        }
    }

    /// List active products matching `query`
    pub async fn products(&self, query: &ProductQuery) -> Result<Vec<Product>> {
        let url = endpoint(&self.api_url, "/produtos");

        Fetch::get(&self.client, &url)
            .query(query.to_params())
            .error_message("Failed to load products")
            .execute::<Vec<Product>>()
            .await
    }

    /// Fetch a single product
    pub async fn product(&self, product_id: i64) -> Result<Product> {
        let url = endpoint(&self.api_url, &format!("/produtos/{}", product_id));

        Fetch::get(&self.client, &url)
            .error_message("Product not found")
            .execute::<Product>()
            .await
    }

    /// List every category
    pub async fn categories(&self) -> Result<Vec<Category>> {
        let url = endpoint(&self.api_url, "/categorias");

        Fetch::get(&self.client, &url)
            .error_message("Failed to load categories")
            .execute::<Vec<Category>>()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn catalog(server: &MockServer) -> CatalogClient {
        CatalogClient::new(&format!("{}/api", server.uri()), Client::new())
    }

    #[tokio::test]
    async fn test_products_with_filters() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/produtos"))
            .and(query_param("categoria_id", "2"))
            .and(query_param("busca", "camisa"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {
                    "id": 10,
                    "nome": "Camisa Polo",
                    "descricao": "Algodão",
                    "preco": 89.9,
                    "estoque": 3,
                    "imagem_url": "https://img.example/polo.png",
                    "categoria_id": 2,
                    "categoria_nome": "Roupas"
                }
            ])))
            .mount(&mock_server)
            .await;

        let query = ProductQuery::new().search("camisa").category(2);
        let products = catalog(&mock_server).products(&query).await.unwrap();

        assert_eq!(products.len(), 1);
        assert_eq!(products[0].category_name.as_deref(), Some("Roupas"));
    }

    #[tokio::test]
    async fn test_missing_product() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/produtos/999"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
            .mount(&mock_server)
            .await;

        let result = catalog(&mock_server).product(999).await;
        match result {
            Err(Error::Api { status, message }) => {
                assert_eq!(status, 404);
                assert_eq!(message, "Product not found");
            }
            other => panic!("Expected Api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_categories() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/categorias"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "id": 1, "nome": "Eletrônicos", "descricao": "Smartphones, tablets e acessórios" },
                { "id": 2, "nome": "Roupas", "descricao": null }
            ])))
            .mount(&mock_server)
            .await;

        let categories = catalog(&mock_server).categories().await.unwrap();
        assert_eq!(categories.len(), 2);
        assert!(categories[1].description.is_none());
    }
}
