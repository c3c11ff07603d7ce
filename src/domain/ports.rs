use crate::domain::model::{
    Audience, MemberRecord, MemberUpsert, MergeFields, Order, SyncConfig, TagAssignment,
};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;

/// Read-only key-value settings.
pub trait SettingsStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
}

impl SettingsStore for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

pub trait OrderSource: Send + Sync {
    fn find_order(&self, order_id: u64) -> Option<Order>;
}

impl OrderSource for Order {
    fn find_order(&self, order_id: u64) -> Option<Order> {
        (self.id == order_id).then(|| self.clone())
    }
}

impl OrderSource for HashMap<u64, Order> {
    fn find_order(&self, order_id: u64) -> Option<Order> {
        self.get(&order_id).cloned()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagScope {
    Product,
    Variation,
}

impl TagScope {
    /// Post-meta key the host stores the tag under.
    pub fn meta_key(self) -> &'static str {
        match self {
            Self::Product => "_mctwc_mailchimp_product_tag",
            Self::Variation => "_mctwc_mailchimp_tag",
        }
    }
}

pub trait TagMetadataStore: Send + Sync {
    /// `None` (or an empty string) means no tag is configured for the entity.
    fn tag(&self, scope: TagScope, entity_id: u64) -> Option<String>;
}

/// Strategy for the first/last name written to the member's merge fields.
///
/// `billing` holds the trimmed billing names; implementations may return them
/// unchanged or substitute their own.
pub trait NameResolver: Send + Sync {
    fn resolve(&self, order: &Order, billing: MergeFields) -> MergeFields;
}

impl<F> NameResolver for F
where
    F: Fn(&Order, MergeFields) -> MergeFields + Send + Sync,
{
    fn resolve(&self, order: &Order, billing: MergeFields) -> MergeFields {
        self(order, billing)
    }
}

/// Operations against the remote audience service.
///
/// A non-2xx answer surfaces as `SyncError::ApiError`.
#[async_trait]
pub trait MarketingApi: Send + Sync {
    /// Stable member key derived from the normalized email.
    fn subscriber_hash(&self, email: &str) -> String;

    async fn ping(&self) -> Result<()>;

    async fn list_audiences(&self) -> Result<Vec<Audience>>;

    async fn get_member(&self, audience_id: &str, hash: &str) -> Result<MemberRecord>;

    async fn patch_merge_fields(
        &self,
        audience_id: &str,
        hash: &str,
        merge_fields: &MergeFields,
    ) -> Result<()>;

    async fn upsert_member(&self, audience_id: &str, hash: &str, member: &MemberUpsert)
        -> Result<()>;

    async fn assign_tags(&self, audience_id: &str, hash: &str, tags: &[TagAssignment])
        -> Result<()>;
}

/// Builds a client for one invocation from validated settings.
pub trait MarketingApiConnector: Send + Sync {
    type Client: MarketingApi;

    fn connect(&self, config: &SyncConfig) -> Result<Self::Client>;
}
