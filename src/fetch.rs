//! HTTP request helper for talking to the Loja API

use log::{debug, warn};
use reqwest::{
    header::{HeaderMap, HeaderValue, CONTENT_TYPE},
    Client, Method, RequestBuilder, Response,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};

/// Longest slice of a non-JSON body kept in logs and errors
const BODY_SNIPPET_LEN: usize = 200;

/// Error body returned by the backend on failure
#[derive(Debug, Deserialize)]
struct ErrorBody {
    erro: Option<String>,
}

/// Helper for building and executing HTTP requests
pub struct FetchBuilder<'a> {
    client: &'a Client,
    url: String,
    method: Method,
    headers: HeaderMap,
    query_params: Vec<(String, String)>,
    body: Option<Vec<u8>>,
    error_message: Option<String>,
}

impl<'a> FetchBuilder<'a> {
    /// Create a new FetchBuilder
    pub fn new(client: &'a Client, url: &str, method: Method) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert("Accept", HeaderValue::from_static("application/json"));

        Self {
            client,
            url: url.to_string(),
            method,
            headers,
            query_params: Vec::new(),
            body: None,
            error_message: None,
        }
    }

    /// Add a header to the request
    pub fn header(mut self, name: &'static str, value: &str) -> Self {
        if let Ok(value) = HeaderValue::from_str(value) {
            self.headers.insert(name, value);
        }
        self
    }

    /// Add bearer token authentication to the request
    pub fn bearer_auth(self, token: &str) -> Self {
        self.header("Authorization", &format!("Bearer {}", token))
    }

    /// Add bearer authentication only when a token is present
    pub fn optional_bearer_auth(self, token: Option<&str>) -> Self {
        match token {
            Some(token) => self.bearer_auth(token),
            None => self,
        }
    }

    /// Add query parameters to the request, in order
    pub fn query(mut self, params: Vec<(String, String)>) -> Self {
        self.query_params.extend(params);
        self
    }

    /// Add a JSON body to the request
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self> {
        let json = serde_json::to_vec(body)?;
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        self.body = Some(json);
        Ok(self)
    }

    /// Message used when a failed response carries no `erro` field
    pub fn error_message(mut self, message: &str) -> Self {
        self.error_message = Some(message.to_string());
        self
    }

    /// Build the request
    fn build(&self) -> Result<RequestBuilder> {
        let mut url = Url::parse(&self.url)?;

        if !self.query_params.is_empty() {
            let mut query_pairs = url.query_pairs_mut();
            for (key, value) in &self.query_params {
                query_pairs.append_pair(key, value);
            }
        }

        let mut req = self.client.request(self.method.clone(), url.as_str());
        req = req.headers(self.headers.clone());

        if let Some(body) = &self.body {
            req = req.body(body.clone());
        }

        Ok(req)
    }

    /// Execute the request and parse the response as JSON
    pub async fn execute<T: DeserializeOwned>(&self) -> Result<T> {
        let response = self.send_checked().await?;

        if !is_json(&response) {
            let content_type = content_type(&response);
            let text = response.text().await.unwrap_or_default();
            warn!(
                "{} {} returned non-JSON content ({}): {}",
                self.method,
                self.url,
                content_type,
                snippet(&text)
            );
            return Err(Error::invalid_response(format!(
                "expected JSON, got {}",
                content_type
            )));
        }

        let text = response.text().await?;
        let result = serde_json::from_str::<T>(&text)?;
        Ok(result)
    }

    /// Execute the request, check the status and discard the body
    pub async fn execute_empty(&self) -> Result<()> {
        self.send_checked().await?;
        Ok(())
    }

    /// Execute the request and return the raw response
    pub async fn execute_raw(&self) -> Result<Response> {
        let req = self.build()?;
        debug!("{} {}", self.method, self.url);
        let response = req.send().await?;
        Ok(response)
    }

    async fn send_checked(&self) -> Result<Response> {
        let response = self.execute_raw().await?;

        if !response.status().is_success() {
            let fallback = self.error_message.clone().unwrap_or_else(|| {
                format!("Request failed with status {}", response.status())
            });
            return Err(error_from_response(response, &fallback).await);
        }

        Ok(response)
    }
}

/// Turn a failed response into [`Error::Api`], preferring the backend's
/// `erro` field over `fallback`
pub async fn error_from_response(response: Response, fallback: &str) -> Error {
    let status = response.status().as_u16();
    let json = is_json(&response);
    let text = match response.text().await {
        Ok(text) => text,
        Err(err) => {
            warn!("could not read error body (status {}): {}", status, err);
            return Error::api(status, fallback);
        }
    };

    let message = if json {
        serde_json::from_str::<ErrorBody>(&text)
            .ok()
            .and_then(|body| body.erro)
            .filter(|msg| !msg.trim().is_empty())
    } else {
        None
    };

    match message {
        Some(message) => {
            debug!("API error {}: {}", status, message);
            Error::api(status, message)
        }
        None => {
            warn!("API error {} without message: {}", status, snippet(&text));
            Error::api(status, fallback)
        }
    }
}

/// Whether the response declares a JSON body
pub fn is_json(response: &Response) -> bool {
    content_type(response).contains("application/json")
}

fn content_type(response: &Response) -> String {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("")
        .to_string()
}

fn snippet(text: &str) -> &str {
    match text.char_indices().nth(BODY_SNIPPET_LEN) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Helper for creating HTTP requests
pub struct Fetch;

impl Fetch {
    /// Create a GET request
    pub fn get<'a>(client: &'a Client, url: &str) -> FetchBuilder<'a> {
        FetchBuilder::new(client, url, Method::GET)
    }

    /// Create a POST request
    pub fn post<'a>(client: &'a Client, url: &str) -> FetchBuilder<'a> {
        FetchBuilder::new(client, url, Method::POST)
    }

    /// Create a PUT request
    pub fn put<'a>(client: &'a Client, url: &str) -> FetchBuilder<'a> {
        FetchBuilder::new(client, url, Method::PUT)
    }

    /// Create a DELETE request
    pub fn delete<'a>(client: &'a Client, url: &str) -> FetchBuilder<'a> {
        FetchBuilder::new(client, url, Method::DELETE)
    }
}

/// Join the API base URL and an endpoint path
pub(crate) fn endpoint(api_url: &str, path: &str) -> String {
    format!("{}{}", api_url.trim_end_matches('/'), path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Debug, Deserialize)]
    struct Status {
        ok: bool,
    }

    #[tokio::test]
    async fn test_execute_sends_bearer_and_query() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/status"))
            .and(header("Authorization", "Bearer tok"))
            .and(query_param("busca", "caneca azul"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
            .mount(&mock_server)
            .await;

        let client = Client::new();
        let url = endpoint(&format!("{}/api", mock_server.uri()), "/status");
        let status: Status = Fetch::get(&client, &url)
            .bearer_auth("tok")
            .query(vec![("busca".to_string(), "caneca azul".to_string())])
            .execute()
            .await
            .unwrap();

        assert!(status.ok);
    }

    #[tokio::test]
    async fn test_error_uses_erro_field() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/pedidos"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({ "erro": "Campo obrigatório: itens" })),
            )
            .mount(&mock_server)
            .await;

        let client = Client::new();
        let url = format!("{}/api/pedidos", mock_server.uri());
        let result = Fetch::post(&client, &url)
            .json(&json!({}))
            .unwrap()
            .error_message("Failed to create order")
            .execute::<serde_json::Value>()
            .await;

        match result {
            Err(Error::Api { status, message }) => {
                assert_eq!(status, 400);
                assert_eq!(message, "Campo obrigatório: itens");
            }
            other => panic!("Expected Api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_error_without_json_body_uses_fallback() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/pedidos"))
            .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad Gateway</html>"))
            .mount(&mock_server)
            .await;

        let client = Client::new();
        let url = format!("{}/api/pedidos", mock_server.uri());
        let result = Fetch::get(&client, &url)
            .error_message("Failed to load orders")
            .execute::<serde_json::Value>()
            .await;

        match result {
            Err(Error::Api { status, message }) => {
                assert_eq!(status, 502);
                assert_eq!(message, "Failed to load orders");
            }
            other => panic!("Expected Api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_success_with_html_is_invalid_response() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/pedidos"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw("<!doctype html><p>Expo dev server</p>", "text/html"),
            )
            .mount(&mock_server)
            .await;

        let client = Client::new();
        let url = format!("{}/api/pedidos", mock_server.uri());
        let result = Fetch::get(&client, &url).execute::<serde_json::Value>().await;

        assert!(matches!(result, Err(Error::InvalidResponse(_))));
    }

    #[test]
    fn test_snippet_respects_char_boundaries() {
        let long = "é".repeat(500);
        assert_eq!(snippet(&long).chars().count(), BODY_SNIPPET_LEN);
        assert_eq!(snippet("curto"), "curto");
    }
}
