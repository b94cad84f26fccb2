use async_trait::async_trait;
use futures::stream::{ self, BoxStream, StreamExt };
use reqwest::{ Client, Method, RequestBuilder, StatusCode };
use serde_json::{ json, Value };
use std::collections::VecDeque;
use std::time::Duration;
use log::{ debug, error, info, warn };

use super::{
    DeleteOutcome,
    Document,
    IndexerStatus,
    ResourceKind,
    SearchQuery,
    SearchService,
};
use crate::error::ServiceError;

pub const SEARCH_API_VERSION: &str = "2024-07-01";

pub struct AzureSearchClient {
    client: Client,
    endpoint: String,
    admin_key: String,
    query_key: String,
}

/// Paging cursor for the document search stream.
struct SearchPager<'a> {
    client: &'a AzureSearchClient,
    url: String,
    next_body: Option<Value>,
    buffered: VecDeque<Document>,
}

impl<'a> SearchPager<'a> {
    async fn advance(mut self) -> Result<Option<(Document, Self)>, ServiceError> {
        loop {
            if let Some(doc) = self.buffered.pop_front() {
                return Ok(Some((doc, self)));
            }
            let body = match self.next_body.take() {
                Some(body) => body,
                None => {
                    return Ok(None);
                }
            };
            let (documents, next) = self.client.search_page(&self.url, &body).await?;
            if documents.is_empty() && next.is_some() {
                warn!("Empty search page with a continuation; stopping");
                return Ok(None);
            }
            self.buffered.extend(documents);
            self.next_body = next;
        }
    }
}

impl AzureSearchClient {
    pub fn new(endpoint: &str, admin_key: &str, query_key: &str) -> Result<Self, ServiceError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        let endpoint = endpoint.trim_end_matches('/').to_string();
        info!("Azure AI Search endpoint: {} (api-version {})", endpoint, SEARCH_API_VERSION);
        Ok(Self {
            client,
            endpoint,
            admin_key: admin_key.to_string(),
            query_key: query_key.to_string(),
        })
    }

    fn resource_url(&self, kind: ResourceKind, name: &str) -> String {
        format!(
            "{}/{}/{}?api-version={}",
            self.endpoint,
            kind.collection(),
            name,
            SEARCH_API_VERSION
        )
    }

    fn admin_request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("api-key", &self.admin_key)
            .header("Accept", "application/json")
    }

    async fn fail(
        operation: String,
        response: reqwest::Response
    ) -> ServiceError {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        error!("{} failed ({}): {}", operation, status, text);
        ServiceError::status(operation, status.as_u16(), text)
    }

    async fn search_page(
        &self,
        url: &str,
        body: &Value
    ) -> Result<(Vec<Document>, Option<Value>), ServiceError> {
        debug!("Search request to {}: {}", url, body);
        let resp = self.client
            .post(url)
            .header("api-key", &self.query_key)
            .header("Accept", "application/json")
            .json(body)
            .send().await?;

        if !resp.status().is_success() {
            return Err(Self::fail("search".to_string(), resp).await);
        }

        let mut page: Value = resp.json().await?;
        let documents = match page.get_mut("value").map(Value::take) {
            Some(Value::Array(hits)) =>
                hits
                    .into_iter()
                    .filter_map(|hit| {
                        match hit {
                            Value::Object(map) => Some(map),
                            other => {
                                warn!("Ignoring non-object search hit: {}", other);
                                None
                            }
                        }
                    })
                    .collect(),
            _ => {
                warn!("Search response carried no 'value' array");
                Vec::new()
            }
        };
        let next = page
            .get("@search.nextPageParameters")
            .filter(|v| v.is_object())
            .cloned();
        debug!("Search page returned {} documents (more pages: {})", documents.len(), next.is_some());
        Ok((documents, next))
    }

    fn search_body(query: &SearchQuery) -> Value {
        let mut body = json!({ "search": query.search_text, "count": true });
        if let Some(top) = query.top {
            body["top"] = json!(top);
        }
        if let Some(select) = &query.select {
            body["select"] = json!(select.join(","));
        }
        body
    }
}

#[async_trait]
impl SearchService for AzureSearchClient {
    async fn get_resource(
        &self,
        kind: ResourceKind,
        name: &str
    ) -> Result<Option<Value>, ServiceError> {
        let url = self.resource_url(kind, name);
        debug!("Checking whether {} '{}' exists", kind, name);
        let resp = self.admin_request(Method::GET, &url).send().await?;

        match resp.status() {
            StatusCode::NOT_FOUND => Ok(None),
            s if s.is_success() => Ok(Some(resp.json().await?)),
            _ => Err(Self::fail(format!("get {} '{}'", kind, name), resp).await),
        }
    }

    async fn create_or_update(
        &self,
        kind: ResourceKind,
        name: &str,
        definition: &Value
    ) -> Result<(), ServiceError> {
        let url = self.resource_url(kind, name);
        debug!("PUT {} '{}': {}", kind, name, definition);
        let resp = self
            .admin_request(Method::PUT, &url)
            .header("Content-Type", "application/json")
            .header("Prefer", "return=minimal")
            .json(definition)
            .send().await?;

        if resp.status().is_success() {
            info!("Created or updated {} '{}'", kind, name);
            Ok(())
        } else {
            Err(Self::fail(format!("create {} '{}'", kind, name), resp).await)
        }
    }

    async fn delete_resource(
        &self,
        kind: ResourceKind,
        name: &str
    ) -> Result<DeleteOutcome, ServiceError> {
        let url = self.resource_url(kind, name);
        let resp = self.admin_request(Method::DELETE, &url).send().await?;

        match resp.status() {
            StatusCode::NOT_FOUND => Ok(DeleteOutcome::NotFound),
            s if s.is_success() => Ok(DeleteOutcome::Deleted),
            _ => Err(Self::fail(format!("delete {} '{}'", kind, name), resp).await),
        }
    }

    async fn run_indexer(&self, name: &str) -> Result<(), ServiceError> {
        let url = format!(
            "{}/indexers/{}/run?api-version={}",
            self.endpoint,
            name,
            SEARCH_API_VERSION
        );
        let resp = self.admin_request(Method::POST, &url).send().await?;

        if resp.status().is_success() {
            info!("Indexer '{}' run requested", name);
            Ok(())
        } else {
            Err(Self::fail(format!("run indexer '{}'", name), resp).await)
        }
    }

    async fn indexer_status(&self, name: &str) -> Result<IndexerStatus, ServiceError> {
        let url = format!(
            "{}/indexers/{}/status?api-version={}",
            self.endpoint,
            name,
            SEARCH_API_VERSION
        );
        let resp = self.admin_request(Method::GET, &url).send().await?;

        if !resp.status().is_success() {
            return Err(Self::fail(format!("indexer status '{}'", name), resp).await);
        }
        let body: Value = resp.json().await?;
        IndexerStatus::from_response(&body)
    }

    fn search<'a>(
        &'a self,
        index_name: &'a str,
        query: SearchQuery
    ) -> BoxStream<'a, Result<Document, ServiceError>> {
        let pager = SearchPager {
            client: self,
            url: format!(
                "{}/indexes/{}/docs/search?api-version={}",
                self.endpoint,
                index_name,
                SEARCH_API_VERSION
            ),
            next_body: Some(Self::search_body(&query)),
            buffered: VecDeque::new(),
        };

        stream::try_unfold(pager, SearchPager::advance)
            .boxed()
    }
}
