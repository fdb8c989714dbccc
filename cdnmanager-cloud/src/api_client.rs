//! HTTP client for the Workers KV REST API.
//!
//! Every request is scoped to one namespace:
//! `{api_base_url}/accounts/{account_id}/storage/kv/namespaces/{namespace_id}`.
//! Values are fetched raw; metadata, listings and writes go through the
//! standard `{success, errors, result}` envelope.

use crate::config::KvConfig;
use crate::error::{CloudError, CloudResult};
use crate::remote_store::RemoteStore;
use crate::types::*;
use async_trait::async_trait;
use cdnmanager_types::{Entry, EntryId, Metadata};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

/// HTTP client for one KV namespace.
pub struct KvApiClient {
    client: Client,
    config: KvConfig,
}

impl KvApiClient {
    pub fn new(config: KvConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
            .build()
            .expect("failed to build HTTP client");

        Self { client, config }
    }

    // ── Keys and values ──

    /// Raw value stored under `key`, `None` if the key does not exist.
    pub async fn get_value(&self, key: &str) -> CloudResult<Option<String>> {
        let resp = self.auth_get(&format!("/values/{}", encode(key))).await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let resp = resp
            .error_for_status()
            .map_err(|e| CloudError::Api(e.to_string()))?;
        Ok(Some(resp.text().await?))
    }

    /// Metadata attached to `key`, `None` if the key does not exist or carries none.
    pub async fn get_metadata(&self, key: &str) -> CloudResult<Option<serde_json::Value>> {
        let resp = self.auth_get(&format!("/metadata/{}", encode(key))).await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let envelope: ApiEnvelope<serde_json::Value> = read_envelope(resp).await?;
        if !envelope.success {
            return Err(CloudError::Api(envelope.error_messages().join("; ")));
        }
        Ok(envelope.result.filter(|v| !v.is_null()))
    }

    /// One page of keys with their metadata.
    pub async fn list_keys(
        &self,
        cursor: Option<&str>,
    ) -> CloudResult<(Vec<KeyListing>, Option<String>)> {
        let mut path = format!("/keys?limit={}", self.config.page_size);
        if let Some(cursor) = cursor {
            path.push_str("&cursor=");
            path.push_str(&encode(cursor));
        }

        let resp = self.auth_get(&path).await?;
        let envelope: ApiEnvelope<Vec<KeyListing>> = read_envelope(resp).await?;
        if !envelope.success {
            return Err(CloudError::Api(envelope.error_messages().join("; ")));
        }

        let next = envelope
            .result_info
            .and_then(|info| info.cursor)
            .filter(|c| !c.is_empty());
        Ok((envelope.result.unwrap_or_default(), next))
    }

    /// Writes key/value/metadata triples in one request.
    pub async fn write_pairs(&self, pairs: &[KvPair<'_>]) -> CloudResult<WriteOutcome> {
        let resp = self.auth_put("/bulk", &pairs).await?;
        let status = resp.status();
        let envelope: ApiEnvelope<BulkWriteResult> = read_envelope(resp).await?;

        if !status.is_success() || !envelope.success {
            debug!("bulk write rejected with {status}");
            return Ok(WriteOutcome::rejected(envelope.error_messages()));
        }

        let result = envelope.result.unwrap_or_default();
        if !result.unsuccessful_keys.is_empty() {
            warn!(
                "bulk write stored {} of {} keys",
                result.successful_key_count,
                pairs.len()
            );
            return Ok(WriteOutcome::rejected(vec![format!(
                "keys not written: {}",
                result.unsuccessful_keys.join(", ")
            )]));
        }
        Ok(WriteOutcome::ok())
    }

    pub async fn delete_key(&self, key: &str) -> CloudResult<()> {
        let resp = self.auth_delete(&format!("/values/{}", encode(key))).await?;
        if resp.status() == StatusCode::NOT_FOUND {
            debug!("delete of absent key {key}");
            return Ok(());
        }
        let envelope: ApiEnvelope<serde_json::Value> = read_envelope(resp).await?;
        if !envelope.success {
            return Err(CloudError::Api(envelope.error_messages().join("; ")));
        }
        Ok(())
    }

    /// Resolves one listed key. Foreign key names and keys deleted since
    /// the listing are dropped; id-named keys with unusable metadata are
    /// reported as unreadable.
    async fn resolve_listing(&self, listing: KeyListing) -> CloudResult<Listed> {
        let id = match EntryId::parse(&listing.name) {
            Ok(id) => id,
            Err(e) => {
                debug!("ignoring key {:?}: {e}", listing.name);
                return Ok(Listed::Foreign);
            }
        };
        let metadata = match listing.metadata.map(serde_json::from_value::<Metadata>) {
            Some(Ok(metadata)) => metadata,
            Some(Err(e)) => {
                warn!("key {id} has unreadable metadata: {e}");
                return Ok(Listed::Unreadable(id));
            }
            None => {
                warn!("key {id} has no metadata");
                return Ok(Listed::Unreadable(id));
            }
        };
        let Some(value) = self.get_value(id.as_str()).await? else {
            debug!("key {id} disappeared between listing and fetch");
            return Ok(Listed::Gone);
        };
        Ok(Listed::Entry(Entry {
            id,
            value,
            metadata,
        }))
    }

    // ── Helpers ──

    fn namespace_url(&self, path: &str) -> String {
        format!(
            "{}/accounts/{}/storage/kv/namespaces/{}{}",
            self.config.api_base_url.trim_end_matches('/'),
            self.config.account_id,
            self.config.namespace_id,
            path
        )
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.config.account_email {
            Some(email) => req
                .header("X-Auth-Email", email)
                .header("X-Auth-Key", &self.config.api_token),
            None => req.bearer_auth(&self.config.api_token),
        }
    }

    async fn auth_get(&self, path: &str) -> CloudResult<Response> {
        debug!("GET {path}");
        let req = self.client.get(self.namespace_url(path));
        Ok(self.authorize(req).send().await?)
    }

    async fn auth_put(&self, path: &str, body: &impl Serialize) -> CloudResult<Response> {
        debug!("PUT {path}");
        let req = self.client.put(self.namespace_url(path)).json(body);
        Ok(self.authorize(req).send().await?)
    }

    async fn auth_delete(&self, path: &str) -> CloudResult<Response> {
        debug!("DELETE {path}");
        let req = self.client.delete(self.namespace_url(path));
        Ok(self.authorize(req).send().await?)
    }
}

#[async_trait]
impl RemoteStore for KvApiClient {
    async fn get(&self, id: &EntryId) -> CloudResult<Option<Entry>> {
        let Some(value) = self.get_value(id.as_str()).await? else {
            return Ok(None);
        };
        let raw = self
            .get_metadata(id.as_str())
            .await?
            .ok_or_else(|| CloudError::Metadata {
                key: id.to_string(),
                reason: "no metadata stored".into(),
            })?;
        let metadata: Metadata =
            serde_json::from_value(raw).map_err(|e| CloudError::Metadata {
                key: id.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Some(Entry {
            id: id.clone(),
            value,
            metadata,
        }))
    }

    async fn put(
        &self,
        id: &EntryId,
        value: &str,
        metadata_json: &str,
    ) -> CloudResult<WriteOutcome> {
        let metadata: serde_json::Value = serde_json::from_str(metadata_json)?;
        let pair = KvPair {
            key: id.as_str(),
            value,
            metadata,
        };
        self.write_pairs(std::slice::from_ref(&pair)).await
    }

    async fn delete(&self, id: &EntryId) -> CloudResult<()> {
        self.delete_key(id.as_str()).await
    }

    async fn list(&self, cursor: Option<&str>) -> CloudResult<RemotePage> {
        let (keys, next_cursor) = self.list_keys(cursor).await?;
        let mut page = RemotePage {
            entries: Vec::with_capacity(keys.len()),
            next_cursor,
            ..Default::default()
        };
        for listing in keys {
            match self.resolve_listing(listing).await? {
                Listed::Entry(entry) => page.entries.push(entry),
                Listed::Unreadable(id) => page.unreadable.push(id),
                Listed::Foreign | Listed::Gone => {}
            }
        }
        Ok(page)
    }
}

/// What one listed key turned out to be.
enum Listed {
    Entry(Entry),
    Unreadable(EntryId),
    Foreign,
    Gone,
}

fn encode(key: &str) -> String {
    urlencoding::encode(key).into_owned()
}

/// Decodes an API envelope, reporting the status code when the body is not one.
async fn read_envelope<T: DeserializeOwned>(resp: Response) -> CloudResult<ApiEnvelope<T>> {
    let status = resp.status();
    let body = resp.text().await?;
    serde_json::from_str(&body).map_err(|e| {
        CloudError::Api(format!("unexpected response ({status}): {e}"))
    })
}
