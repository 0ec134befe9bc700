//! [`RestStore`], a [`StoreClient`] issuing one HTTP request per primitive.
//!
//! Non-2xx responses become store errors carrying the status and body; requests that run
//! past their timeout fail with [`ConnectorError::DeadlineExceeded`].

use async_trait::async_trait;
use reqwest::{Client, Method, Url};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::{sync::Arc, time::Duration};
use tracing::debug;

use firelayer_core::{
    client::{PatchSet, Snapshot, StoreClient, StoreClientBuilder},
    context::CallContext,
    error::{ConnectorError, ConnectorResult},
};

use crate::{
    config::{ConfigError, RestConfig},
    credential::CredentialProvider,
    query::{ReadQuery, location_url},
};

/// Body of a successful push.
#[derive(Deserialize)]
struct PushResponse {
    name: String,
}

/// Store client speaking the realtime database REST protocol.
///
/// Every primitive is one HTTP request against `<base>/<path>.json`. Requests are never
/// retried.
#[derive(Debug, Clone)]
pub struct RestStore {
    http: Client,
    base_url: String,
    credential: Option<Arc<dyn CredentialProvider>>,
    timeout: Option<Duration>,
}

impl RestStore {
    /// Creates a builder for the database at `database_url`.
    pub fn builder(database_url: &str) -> RestStoreBuilder {
        RestStoreBuilder::new(RestConfig::new(database_url))
    }

    /// Creates a builder from a full configuration.
    pub fn from_config(config: RestConfig) -> RestStoreBuilder {
        RestStoreBuilder::new(config)
    }

    /// The database base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn send(
        &self,
        ctx: &CallContext,
        operation: &str,
        method: Method,
        path: &str,
        query: ReadQuery<'_>,
        body: Option<&Value>,
    ) -> ConnectorResult<Value> {
        let url = location_url(&self.base_url, path);
        debug!(%method, path, operation, "sending request");

        let mut request = self.http.request(method, &url).query(&query.params());

        if let Some(provider) = &self.credential {
            if let Some(credential) = provider.credential().await? {
                request = request.query(&[credential.query_pair()]);
            }
        }
        if let Some(timeout) = ctx.timeout().or(self.timeout) {
            request = request.timeout(timeout);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| transport_error(operation, e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ConnectorError::store(operation, format!("{status}: {text}")));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| transport_error(operation, e))
    }
}

fn transport_error(operation: &str, err: reqwest::Error) -> ConnectorError {
    if err.is_timeout() {
        ConnectorError::DeadlineExceeded(format!("{operation}: {err}"))
    } else {
        ConnectorError::store(operation, err.to_string())
    }
}

/// Converts a collection read into a snapshot. The protocol returns `null` for empty
/// locations and may render integer-keyed children as an array.
fn snapshot_from(value: Value) -> Snapshot {
    match value {
        Value::Object(children) => children.into_iter().collect(),
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .filter(|(_, item)| !item.is_null())
            .map(|(index, item)| (index.to_string(), item))
            .collect(),
        _ => Snapshot::new(),
    }
}

#[async_trait]
impl StoreClient for RestStore {
    async fn create_child(
        &self,
        ctx: &CallContext,
        collection: &str,
        data: Value,
    ) -> ConnectorResult<String> {
        let response = self
            .send(ctx, "create_child", Method::POST, collection, ReadQuery::All, Some(&data))
            .await?;

        serde_json::from_value::<PushResponse>(response)
            .map(|pushed| pushed.name)
            .map_err(|e| ConnectorError::store("create_child", format!("unexpected push response: {e}")))
    }

    async fn read_child(
        &self,
        ctx: &CallContext,
        collection: &str,
        id: &str,
    ) -> ConnectorResult<Option<Value>> {
        let value = self
            .send(
                ctx,
                "read_child",
                Method::GET,
                &format!("{collection}/{id}"),
                ReadQuery::All,
                None,
            )
            .await?;

        Ok((!value.is_null()).then_some(value))
    }

    async fn read_collection(
        &self,
        ctx: &CallContext,
        collection: &str,
        limit: Option<usize>,
    ) -> ConnectorResult<Snapshot> {
        let query = limit.map_or(ReadQuery::All, ReadQuery::FirstByKey);

        self.send(ctx, "read_collection", Method::GET, collection, query, None)
            .await
            .map(snapshot_from)
    }

    async fn equality_query(
        &self,
        ctx: &CallContext,
        collection: &str,
        property: &str,
        value: &Value,
    ) -> ConnectorResult<Snapshot> {
        let query = ReadQuery::Equal { property, value };

        self.send(ctx, "equality_query", Method::GET, collection, query, None)
            .await
            .map(snapshot_from)
    }

    async fn write_child(
        &self,
        ctx: &CallContext,
        collection: &str,
        id: &str,
        value: Option<Value>,
    ) -> ConnectorResult<()> {
        let path = format!("{collection}/{id}");

        match value {
            Some(value) => {
                self.send(ctx, "write_child", Method::PUT, &path, ReadQuery::All, Some(&value))
                    .await?
            }
            None => {
                self.send(ctx, "write_child", Method::DELETE, &path, ReadQuery::All, None)
                    .await?
            }
        };

        Ok(())
    }

    async fn clear_collection(&self, ctx: &CallContext, collection: &str) -> ConnectorResult<()> {
        self.send(ctx, "clear_collection", Method::DELETE, collection, ReadQuery::All, None)
            .await?;

        Ok(())
    }

    async fn patch_multi(
        &self,
        ctx: &CallContext,
        collection: &str,
        patch: PatchSet,
    ) -> ConnectorResult<()> {
        let body = Value::Object(patch.into_iter().collect::<Map<_, _>>());

        self.send(ctx, "patch_multi", Method::PATCH, collection, ReadQuery::All, Some(&body))
            .await?;

        Ok(())
    }
}

/// Builder for [`RestStore`].
///
/// # Example
///
/// ```ignore
/// use firelayer_rest::{RestConfig, RestStore};
/// use firelayer_core::client::StoreClientBuilder;
///
/// let store = RestStore::from_config(RestConfig::from_env()?).build().await?;
/// ```
#[derive(Debug)]
pub struct RestStoreBuilder {
    config: RestConfig,
    credential: Option<Arc<dyn CredentialProvider>>,
    http: Option<Client>,
}

impl RestStoreBuilder {
    pub fn new(config: RestConfig) -> Self {
        Self {
            config,
            credential: None,
            http: None,
        }
    }

    /// Uses `provider` for credentials instead of the tokens in the configuration.
    pub fn credential_provider(mut self, provider: impl CredentialProvider + 'static) -> Self {
        self.credential = Some(Arc::new(provider));
        self
    }

    /// Reuses an existing HTTP client.
    pub fn http_client(mut self, http: Client) -> Self {
        self.http = Some(http);
        self
    }

    /// Sets the timeout for requests whose call context carries none.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.with_timeout(timeout);
        self
    }
}

#[async_trait]
impl StoreClientBuilder for RestStoreBuilder {
    type Client = RestStore;

    async fn build(self) -> ConnectorResult<Self::Client> {
        let base_url = self.config.database_url.trim_end_matches('/').to_string();
        Url::parse(&base_url)
            .map_err(|e| ConfigError::InvalidUrl(base_url.clone(), e.to_string()))?;

        let http = match self.http {
            Some(http) => http,
            None => Client::builder()
                .build()
                .map_err(|e| ConnectorError::Initialization(e.to_string()))?,
        };

        let credential = self.credential.or_else(|| {
            self.config
                .credential()
                .map(|credential| Arc::new(credential) as Arc<dyn CredentialProvider>)
        });

        debug!(base_url = %base_url, authenticated = credential.is_some(), "rest store opened");

        Ok(RestStore {
            http,
            base_url,
            credential,
            timeout: self.config.timeout(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::{Credential, StaticCredential};
    use serde_json::json;

    #[test]
    fn collection_reads_accept_objects_arrays_and_null() {
        let snapshot = snapshot_from(json!({ "b": { "n": 2 }, "a": { "n": 1 } }));
        assert_eq!(snapshot.keys().collect::<Vec<_>>(), ["a", "b"]);

        let snapshot = snapshot_from(json!([{ "n": 0 }, null, { "n": 2 }]));
        assert_eq!(snapshot.keys().collect::<Vec<_>>(), ["0", "2"]);

        assert!(snapshot_from(Value::Null).is_empty());
    }

    #[tokio::test]
    async fn builds_with_trimmed_url_and_configured_credential() {
        let config = RestConfig::new("http://localhost:9000/")
            .with_auth_token("secret")
            .with_timeout(Duration::from_secs(2));
        let store = RestStore::from_config(config).build().await.unwrap();

        assert_eq!(store.base_url(), "http://localhost:9000");
        assert_eq!(store.timeout, Some(Duration::from_secs(2)));
        assert_eq!(
            store.credential.unwrap().credential().await.unwrap(),
            Some(Credential::IdToken("secret".into()))
        );
    }

    #[tokio::test]
    async fn explicit_providers_override_config_tokens() {
        let store = RestStore::builder("http://localhost:9000")
            .credential_provider(StaticCredential::new(Credential::AccessToken("t".into())))
            .build()
            .await
            .unwrap();

        assert_eq!(
            store.credential.unwrap().credential().await.unwrap(),
            Some(Credential::AccessToken("t".into()))
        );
    }

    #[tokio::test]
    async fn invalid_urls_fail_initialization() {
        let result = RestStore::builder("not a url").build().await;
        assert!(matches!(result, Err(ConnectorError::Initialization(_))));
    }
}
