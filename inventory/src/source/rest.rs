//! JSON-over-HTTP data source.

use super::{InventorySource, SourceFuture};
use crate::error::SourceError;
use crate::types::{Category, HistoryEntry, Item, ItemId};
use reqwest::{Client, Method, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Inventory backend reached over HTTP
///
/// | Operation         | Request                |
/// |-------------------|------------------------|
/// | `load_categories` | `GET /categories`      |
/// | `load_items`      | `GET /items`           |
/// | `load_history`    | `GET /history`         |
/// | `create_category` | `POST /categories`     |
/// | `save_item`       | `PUT /items/{id}`      |
/// | `delete_item`     | `DELETE /items/{id}`   |
/// | `append_history`  | `POST /history`        |
///
/// Any non-2xx response is reported as [`SourceError::Status`].
#[derive(Clone, Debug)]
pub struct RestSource {
    client: Client,
    base_url: String,
}

impl RestSource {
    /// Create a source for the backend at `base_url`
    ///
    /// Every request is bounded by `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Config`] if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SourceError::Config(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Base URL requests are sent to, without a trailing slash
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, format!("{}{path}", self.base_url))
    }

    async fn send(&self, path: &str, request: RequestBuilder) -> Result<reqwest::Response, SourceError> {
        tracing::debug!(endpoint = path, "Sending inventory request");

        let response = request.send().await.map_err(|e| SourceError::Request {
            endpoint: path.to_string(),
            message: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(endpoint = path, status = status.as_u16(), "Inventory backend refused request");
            return Err(SourceError::Status {
                endpoint: path.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, SourceError> {
        let response = self.send(path, self.request(Method::GET, path)).await?;
        response.json::<T>().await.map_err(|e| SourceError::Decode {
            endpoint: path.to_string(),
            message: e.to_string(),
        })
    }

    async fn write<B: Serialize + Sync>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<(), SourceError> {
        let mut request = self.request(method, path);
        if let Some(body) = body {
            request = request.json(body);
        }
        self.send(path, request).await.map(|_| ())
    }
}

impl InventorySource for RestSource {
    fn load_categories(&self) -> SourceFuture<'_, Vec<Category>> {
        Box::pin(self.get("/categories"))
    }

    fn load_items(&self) -> SourceFuture<'_, Vec<Item>> {
        Box::pin(self.get("/items"))
    }

    fn load_history(&self) -> SourceFuture<'_, Vec<HistoryEntry>> {
        Box::pin(self.get("/history"))
    }

    fn create_category<'a>(&'a self, category: &'a Category) -> SourceFuture<'a, ()> {
        Box::pin(self.write(Method::POST, "/categories", Some(category)))
    }

    fn save_item<'a>(&'a self, item: &'a Item) -> SourceFuture<'a, ()> {
        Box::pin(async move {
            let path = format!("/items/{}", item.id);
            self.write(Method::PUT, &path, Some(item)).await
        })
    }

    fn delete_item<'a>(&'a self, id: &'a ItemId) -> SourceFuture<'a, ()> {
        Box::pin(async move {
            let path = format!("/items/{id}");
            self.write::<()>(Method::DELETE, &path, None).await
        })
    }

    fn append_history<'a>(&'a self, entry: &'a HistoryEntry) -> SourceFuture<'a, ()> {
        Box::pin(self.write(Method::POST, "/history", Some(entry)))
    }
}
