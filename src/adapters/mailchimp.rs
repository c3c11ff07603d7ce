//! REST client for the Mailchimp Marketing API (v3).
//!
//! Members are addressed by [`subscriber_hash`]; every non-2xx answer is turned
//! into `SyncError::ApiError` carrying the status and the problem detail.

use crate::domain::model::{Audience, MemberRecord, MemberUpsert, MergeFields, SyncConfig, TagAssignment};
use crate::domain::ports::{MarketingApi, MarketingApiConnector};
use crate::utils::error::{Result, SyncError};
use crate::utils::validation::{validate_api_key, validate_range, validate_url};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// `https://<dc>.api.mailchimp.com/3.0` for the datacenter suffix of `api_key`.
pub fn datacenter_url(api_key: &str) -> Result<String> {
    let dc = validate_api_key("api_key", api_key)?;
    Ok(format!("https://{}.api.mailchimp.com/3.0", dc))
}

/// Lowercase hex MD5 of the lower-cased email.
pub fn subscriber_hash(email: &str) -> String {
    format!("{:x}", md5::compute(email.to_lowercase().as_bytes()))
}

#[derive(Debug, Deserialize)]
struct ProblemDetail {
    title: Option<String>,
    detail: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListsResponse {
    #[serde(default)]
    lists: Vec<Audience>,
}

#[derive(Serialize)]
struct MergeFieldsPatch<'a> {
    merge_fields: &'a MergeFields,
}

#[derive(Serialize)]
struct TagsPayload<'a> {
    tags: &'a [TagAssignment],
}

#[derive(Debug, Clone)]
pub struct MailchimpClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl MailchimpClient {
    /// Client against the datacenter encoded in the key (`<secret>-us6`).
    pub fn new(api_key: &str) -> Result<Self> {
        MailchimpConnector::new().connect_with_key(api_key)
    }

    pub fn with_base_url(api_key: &str, base_url: &str, timeout: Duration) -> Result<Self> {
        validate_url("api_base_url", base_url)?;
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn member_path(audience_id: &str, hash: &str) -> String {
        format!("lists/{}/members/{}", audience_id, hash)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request
            .basic_auth("apikey", Some(&self.api_key))
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        tracing::debug!("Mailchimp response status: {}", status);

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<ProblemDetail>(&body)
            .ok()
            .and_then(|p| p.detail.filter(|d| !d.is_empty()).or(p.title))
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("Unknown error")
                    .to_string()
            });

        Err(SyncError::api(status.as_u16(), detail))
    }
}

#[async_trait]
impl MarketingApi for MailchimpClient {
    fn subscriber_hash(&self, email: &str) -> String {
        subscriber_hash(email)
    }

    async fn ping(&self) -> Result<()> {
        tracing::debug!("GET ping");
        self.send(self.client.get(self.url("ping"))).await?;
        Ok(())
    }

    async fn list_audiences(&self) -> Result<Vec<Audience>> {
        tracing::debug!("GET lists");
        let response = self
            .send(
                self.client
                    .get(self.url("lists"))
                    .query(&[("fields", "lists.id,lists.name"), ("count", "1000")]),
            )
            .await?;
        let lists: ListsResponse = response.json().await?;
        Ok(lists.lists)
    }

    async fn get_member(&self, audience_id: &str, hash: &str) -> Result<MemberRecord> {
        let path = Self::member_path(audience_id, hash);
        tracing::debug!("GET {}", path);
        let response = self.send(self.client.get(self.url(&path))).await?;
        Ok(response.json().await?)
    }

    async fn patch_merge_fields(
        &self,
        audience_id: &str,
        hash: &str,
        merge_fields: &MergeFields,
    ) -> Result<()> {
        let path = Self::member_path(audience_id, hash);
        tracing::debug!("PATCH {}", path);
        self.send(
            self.client
                .patch(self.url(&path))
                .json(&MergeFieldsPatch { merge_fields }),
        )
        .await?;
        Ok(())
    }

    async fn upsert_member(
        &self,
        audience_id: &str,
        hash: &str,
        member: &MemberUpsert,
    ) -> Result<()> {
        let path = Self::member_path(audience_id, hash);
        tracing::debug!("PUT {}", path);
        self.send(self.client.put(self.url(&path)).json(member))
            .await?;
        Ok(())
    }

    async fn assign_tags(
        &self,
        audience_id: &str,
        hash: &str,
        tags: &[TagAssignment],
    ) -> Result<()> {
        let path = format!("{}/tags", Self::member_path(audience_id, hash));
        tracing::debug!("POST {} ({} tags)", path, tags.len());
        self.send(self.client.post(self.url(&path)).json(&TagsPayload { tags }))
            .await?;
        Ok(())
    }
}

/// Creates a [`MailchimpClient`] per invocation.
#[derive(Debug, Clone)]
pub struct MailchimpConnector {
    base_url: Option<String>,
    timeout: Duration,
}

impl Default for MailchimpConnector {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl MailchimpConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the datacenter URL derived from the API key.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Result<Self> {
        validate_range("timeout_seconds", secs, 1, 300)?;
        self.timeout = Duration::from_secs(secs);
        Ok(self)
    }

    pub fn connect_with_key(&self, api_key: &str) -> Result<MailchimpClient> {
        let base_url = match &self.base_url {
            Some(base_url) => base_url.clone(),
            None => datacenter_url(api_key)?,
        };
        MailchimpClient::with_base_url(api_key, &base_url, self.timeout)
    }
}

/// Pings the service, then lists the audiences the key can see.
/// An account without audiences cannot be synced to and is reported as an error.
pub async fn verify_credentials<A: MarketingApi + ?Sized>(api: &A) -> Result<Vec<Audience>> {
    api.ping().await?;
    tracing::info!("API key verified");

    let audiences = api.list_audiences().await?;
    if audiences.is_empty() {
        return Err(SyncError::ConfigError {
            message: "No audiences found in your Mailchimp account.".to_string(),
        });
    }

    tracing::debug!("Found {} audiences", audiences.len());
    Ok(audiences)
}

impl MarketingApiConnector for MailchimpConnector {
    type Client = MailchimpClient;

    fn connect(&self, config: &SyncConfig) -> Result<MailchimpClient> {
        self.connect_with_key(&config.api_key)
    }
}
