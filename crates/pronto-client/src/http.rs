//! # HTTP Backend
//!
//! `reqwest` implementation of every collaborator trait against the REST
//! backend.
//!
//! ## Request Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  endpoint(path) ──► send (timeout) ──► status check ──► decode JSON     │
//! │                          │                  │                │          │
//! │                          ▼                  ▼                ▼          │
//! │                Connection / Timeout   Http / NotFound      Decode       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! List endpoints may answer with a bare array or a paginated
//! `{ "results": [...] }` object; both are accepted.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use pronto_core::{
    Category, Customer, CustomerId, InventoryRecord, OrderId, Product, ProductId, SalePayload,
};

use crate::error::{ClientError, ClientResult};
use crate::{CatalogService, CustomerDirectory, OrderService};

/// Page size requested from list endpoints.
const LIST_LIMIT: u32 = 100;

// =============================================================================
// Endpoints
// =============================================================================

/// Endpoint paths relative to the base URL.
///
/// `{id}` is replaced with the customer or product id. Deployments with
/// different routes override these in the `[api.endpoints]` config table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub customer: String,
    pub sales: String,
    pub categories: String,
    pub products: String,
    pub inventory: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Endpoints {
            customer: "/customers/{id}".to_string(),
            sales: "/sales".to_string(),
            categories: "/products/categories".to_string(),
            products: "/products".to_string(),
            inventory: "/products/{id}/inventory".to_string(),
        }
    }
}

// =============================================================================
// Response Shapes
// =============================================================================

#[derive(Deserialize)]
#[serde(untagged)]
enum Listing<T> {
    Paged { results: Vec<T> },
    Plain(Vec<T>),
}

impl<T> Listing<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            Listing::Paged { results } => results,
            Listing::Plain(items) => items,
        }
    }
}

#[derive(Deserialize)]
struct Created {
    id: OrderId,
}

// =============================================================================
// HttpBackend
// =============================================================================

/// Client for the catalog, customer and order endpoints.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: Url,
    endpoints: Endpoints,
    timeout: Duration,
}

impl HttpBackend {
    /// Creates a backend client.
    ///
    /// ## Errors
    /// - `InvalidUrl` if `base_url` is not an absolute http(s) URL
    pub fn new(base_url: &str, timeout: Duration) -> ClientResult<Self> {
        let base_url = Url::parse(base_url)?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ClientError::InvalidUrl(format!(
                "unsupported scheme '{}'",
                base_url.scheme()
            )));
        }

        Ok(HttpBackend {
            client: build_client(timeout, HeaderMap::new())?,
            base_url,
            endpoints: Endpoints::default(),
            timeout,
        })
    }

    /// Sends `headers` with every request (e.g. a CSRF token the backend
    /// expects on `POST`).
    ///
    /// ## Errors
    /// - `InvalidHeader` if a name or value is not a valid HTTP header
    pub fn with_default_headers(mut self, headers: &BTreeMap<String, String>) -> ClientResult<Self> {
        let mut map = HeaderMap::with_capacity(headers.len());
        for (name, value) in headers {
            let invalid = |reason: String| ClientError::InvalidHeader {
                name: name.clone(),
                reason,
            };
            let header_name =
                HeaderName::from_bytes(name.as_bytes()).map_err(|e| invalid(e.to_string()))?;
            let header_value =
                HeaderValue::from_str(value).map_err(|e| invalid(e.to_string()))?;
            map.insert(header_name, header_value);
        }

        self.client = build_client(self.timeout, map)?;
        Ok(self)
    }

    /// Replaces the endpoint paths.
    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Appends an endpoint path to the base URL, keeping any base path
    /// (`http://host/api` + `/sales` = `http://host/api/sales`).
    fn endpoint(&self, path: &str, id: Option<i64>) -> ClientResult<Url> {
        let path = match id {
            Some(id) => path.replace("{id}", &id.to_string()),
            None => path.to_string(),
        };
        let joined = format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Ok(Url::parse(&joined)?)
    }

    async fn send(&self, request: RequestBuilder, resource: &str) -> ClientResult<Response> {
        let response = request.send().await.map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound {
                resource: resource.to_string(),
            });
        }

        let body = response.text().await.unwrap_or_default();
        warn!(status = status.as_u16(), resource, "Backend returned an error");
        Err(ClientError::Http {
            status: status.as_u16(),
            body,
        })
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ClientError::Connection(e.to_string()))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn get_list<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, String)],
        resource: &str,
    ) -> ClientResult<Vec<T>> {
        debug!(%url, resource, "GET");
        let response = self.send(self.client.get(url).query(query), resource).await?;
        let listing: Listing<T> = Self::decode(response).await?;
        Ok(listing.into_vec())
    }

    fn transport_error(&self, err: reqwest::Error) -> ClientError {
        if err.is_timeout() {
            ClientError::Timeout(self.timeout.as_secs())
        } else {
            ClientError::Connection(err.to_string())
        }
    }
}

fn build_client(timeout: Duration, headers: HeaderMap) -> ClientResult<Client> {
    Client::builder()
        .timeout(timeout)
        .default_headers(headers)
        .build()
        .map_err(|e| ClientError::Connection(e.to_string()))
}

#[async_trait]
impl OrderService for HttpBackend {
    async fn submit_sale(&self, payload: &SalePayload) -> ClientResult<OrderId> {
        let url = self.endpoint(&self.endpoints.sales, None)?;
        debug!(%url, items = payload.items.len(), total = %payload.total, "Submitting sale");

        let response = self.send(self.client.post(url).json(payload), "sale").await?;
        let created: Created = Self::decode(response).await?;
        Ok(created.id)
    }
}

#[async_trait]
impl CustomerDirectory for HttpBackend {
    async fn fetch_customer(&self, id: CustomerId) -> ClientResult<Customer> {
        let url = self.endpoint(&self.endpoints.customer, Some(id))?;
        debug!(%url, customer_id = id, "Fetching customer");

        let response = self
            .send(self.client.get(url), &format!("customer {}", id))
            .await?;
        Self::decode(response).await
    }
}

#[async_trait]
impl CatalogService for HttpBackend {
    async fn categories(&self) -> ClientResult<Vec<Category>> {
        let url = self.endpoint(&self.endpoints.categories, None)?;
        self.get_list(url, &[], "categories").await
    }

    async fn products_in_category(&self, category_id: i64) -> ClientResult<Vec<Product>> {
        let url = self.endpoint(&self.endpoints.products, None)?;
        let query = [
            ("category", category_id.to_string()),
            ("available", "true".to_string()),
            ("limit", LIST_LIMIT.to_string()),
        ];
        self.get_list(url, &query, "products").await
    }

    async fn search(&self, query: &str) -> ClientResult<Vec<Product>> {
        let url = self.endpoint(&self.endpoints.products, None)?;
        let query = [
            ("search", query.to_string()),
            ("available", "true".to_string()),
            ("limit", LIST_LIMIT.to_string()),
        ];
        self.get_list(url, &query, "products").await
    }

    async fn find_by_code(&self, code: &str) -> ClientResult<Option<Product>> {
        let url = self.endpoint(&self.endpoints.products, None)?;
        let query = [("code", code.to_string()), ("available", "true".to_string())];
        let products: Vec<Product> = self.get_list(url, &query, "products").await?;
        Ok(products.into_iter().next())
    }

    async fn inventory(&self, product_id: ProductId, store_id: &str) -> ClientResult<Option<i64>> {
        let url = self.endpoint(&self.endpoints.inventory, Some(product_id))?;
        let query = [("store", store_id.to_string())];
        let records: Vec<InventoryRecord> = self.get_list(url, &query, "inventory").await?;
        Ok(records.first().map(|r| r.quantity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_keeps_base_path() {
        let backend = HttpBackend::new("http://pos.local/api/", Duration::from_secs(5)).unwrap();

        assert_eq!(
            backend.endpoint("/sales", None).unwrap().as_str(),
            "http://pos.local/api/sales"
        );
        assert_eq!(
            backend
                .endpoint(&backend.endpoints().customer, Some(7))
                .unwrap()
                .as_str(),
            "http://pos.local/api/customers/7"
        );
    }

    #[test]
    fn test_rejects_non_http_base_url() {
        assert!(matches!(
            HttpBackend::new("ftp://pos.local", Duration::from_secs(5)),
            Err(ClientError::InvalidUrl(_))
        ));
        assert!(HttpBackend::new("not a url", Duration::from_secs(5)).is_err());
    }

    #[test]
    fn test_listing_accepts_both_shapes() {
        let paged: Listing<i64> = serde_json::from_str(r#"{"results":[1,2]}"#).unwrap();
        let plain: Listing<i64> = serde_json::from_str("[3]").unwrap();
        assert_eq!(paged.into_vec(), vec![1, 2]);
        assert_eq!(plain.into_vec(), vec![3]);
    }

    #[test]
    fn test_endpoints_partial_override() {
        let endpoints: Endpoints = serde_json::from_str(r#"{"sales":"/ventas/pedidos/"}"#).unwrap();
        assert_eq!(endpoints.sales, "/ventas/pedidos/");
        assert_eq!(endpoints.customer, "/customers/{id}");
    }
}
