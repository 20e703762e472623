//! PostgREST-backed [`RecordStore`].

use std::sync::{Arc, PoisonError, RwLock};

use reqwest::{Client, RequestBuilder, Response};
use store::records::filter_pairs;
use store::{Collection, DataError, Filter, Query, RecordStore, Row};

use super::ErrorBody;
use crate::auth::{AuthBackend, ListenerId, SessionStore};
use crate::config::ClientConfig;

/// Record collections over HTTP.
///
/// Clones share the HTTP client and the access token, so a clone handed to a
/// controller sees token changes made through any other clone.
#[derive(Clone, Debug)]
pub struct RestStore {
    client: Client,
    base_url: String,
    anon_key: String,
    access_token: Arc<RwLock<Option<String>>>,
}

impl RestStore {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.rest_url(),
            anon_key: config.backend.anon_key.clone(),
            access_token: Arc::new(RwLock::new(None)),
        }
    }

    /// Token sent as the bearer credential. `None` falls back to the anon key.
    pub fn set_access_token(&self, token: Option<String>) {
        *self
            .access_token
            .write()
            .unwrap_or_else(PoisonError::into_inner) = token;
    }

    /// Track the session held by `sessions`, starting with the current one.
    pub fn follow_session<A: AuthBackend>(&self, sessions: &SessionStore<A>) -> ListenerId {
        self.set_access_token(sessions.current_session().map(|s| s.access_token));
        let this = self.clone();
        sessions.on_session_change(move |change| {
            this.set_access_token(change.current.as_ref().map(|s| s.access_token.clone()));
        })
    }

    fn url(&self, collection: Collection) -> String {
        format!("{}/{}", self.base_url, collection.name())
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let token = self
            .access_token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .unwrap_or_else(|| self.anon_key.clone());
        request
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", token))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, DataError> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| DataError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let text = response.text().await.unwrap_or_default();
        let body = ErrorBody::parse(status, &text);
        let err = DataError::Rejected {
            code: body.code(),
            message: body.message().unwrap_or_default().to_string(),
        };
        tracing::warn!("Backend returned {}: {}", status, err);
        Err(err)
    }

    async fn rows(response: Response) -> Result<Vec<Row>, DataError> {
        response
            .json::<Vec<Row>>()
            .await
            .map_err(|e| DataError::Decode(e.to_string()))
    }
}

impl RecordStore for RestStore {
    async fn select(&self, query: &Query) -> Result<Vec<Row>, DataError> {
        let request = self
            .client
            .get(self.url(query.collection))
            .query(&query.to_query_pairs());
        let rows = Self::rows(self.send(request).await?).await?;
        tracing::debug!("Selected {} rows from {}", rows.len(), query.collection);
        Ok(rows)
    }

    async fn insert(&self, collection: Collection, rows: Vec<Row>) -> Result<Vec<Row>, DataError> {
        let request = self
            .client
            .post(self.url(collection))
            .header("Prefer", "return=representation")
            .json(&rows);
        Self::rows(self.send(request).await?).await
    }

    async fn update(
        &self,
        collection: Collection,
        filters: &[Filter],
        patch: Row,
    ) -> Result<(), DataError> {
        let request = self
            .client
            .patch(self.url(collection))
            .query(&filter_pairs(filters))
            .json(&patch);
        self.send(request).await?;
        Ok(())
    }

    async fn delete(&self, collection: Collection, filters: &[Filter]) -> Result<(), DataError> {
        let request = self
            .client
            .delete(self.url(collection))
            .query(&filter_pairs(filters));
        self.send(request).await?;
        Ok(())
    }
}
