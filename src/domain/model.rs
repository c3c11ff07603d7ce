use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Host order status. Stored without the `wc-` prefix some hosts add.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OrderStatus {
    Pending,
    Processing,
    OnHold,
    Completed,
    Cancelled,
    Refunded,
    Failed,
    Other(String),
}

impl OrderStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::OnHold => "on-hold",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Refunded => "refunded",
            Self::Failed => "failed",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for OrderStatus {
    fn from(raw: String) -> Self {
        let s = raw.trim();
        let s = s.strip_prefix("wc-").unwrap_or(s);
        match s {
            "pending" => Self::Pending,
            "processing" => Self::Processing,
            "on-hold" => Self::OnHold,
            "completed" => Self::Completed,
            "cancelled" => Self::Cancelled,
            "refunded" => Self::Refunded,
            "failed" => Self::Failed,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<&str> for OrderStatus {
    fn from(raw: &str) -> Self {
        Self::from(raw.to_string())
    }
}

impl From<OrderStatus> for String {
    fn from(status: OrderStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: u64,
    #[serde(default)]
    pub variation_id: Option<u64>,
    #[serde(default, alias = "display_name")]
    pub name: String,
}

impl LineItem {
    /// Variation id, treating `0` as "no variation".
    pub fn variation(&self) -> Option<u64> {
        self.variation_id.filter(|id| *id != 0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: u64,
    pub status: OrderStatus,
    #[serde(default)]
    pub previous_status: Option<OrderStatus>,
    #[serde(default)]
    pub billing_email: String,
    #[serde(default)]
    pub billing_first_name: String,
    #[serde(default)]
    pub billing_last_name: String,
    #[serde(default)]
    pub items: Vec<LineItem>,
    /// Free-form order meta, e.g. enrollee details captured at checkout.
    #[serde(default)]
    pub meta: HashMap<String, String>,
}

impl Order {
    pub fn meta(&self, key: &str) -> Option<&str> {
        self.meta.get(key).map(String::as_str)
    }
}

/// A status-change event as dispatched by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStatusChange {
    pub order_id: u64,
    pub old_status: OrderStatus,
    pub new_status: OrderStatus,
}

impl OrderStatusChange {
    pub fn new(
        order_id: u64,
        old_status: impl Into<OrderStatus>,
        new_status: impl Into<OrderStatus>,
    ) -> Self {
        Self {
            order_id,
            old_status: old_status.into(),
            new_status: new_status.into(),
        }
    }

    /// An order without a recorded previous status is treated as newly created.
    pub fn from_order(order: &Order) -> Self {
        Self {
            order_id: order.id,
            old_status: order
                .previous_status
                .clone()
                .unwrap_or_else(|| OrderStatus::Other("new".to_string())),
            new_status: order.status.clone(),
        }
    }

    /// Only a transition *into* processing triggers a sync.
    pub fn triggers_sync(&self) -> bool {
        self.new_status == OrderStatus::Processing && self.old_status != OrderStatus::Processing
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagStatus {
    Active,
    Inactive,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagAssignment {
    pub name: String,
    pub status: TagStatus,
}

impl TagAssignment {
    pub fn active(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: TagStatus::Active,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeFields {
    #[serde(rename = "FNAME", default)]
    pub first_name: String,
    #[serde(rename = "LNAME", default)]
    pub last_name: String,
}

impl MergeFields {
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
        }
    }
}

/// Member as returned by the remote audience service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRecord {
    #[serde(default)]
    pub email_address: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub merge_fields: Option<MergeFields>,
}

impl MemberRecord {
    /// Strict comparison; a record without merge fields always differs.
    pub fn merge_fields_differ(&self, resolved: &MergeFields) -> bool {
        match &self.merge_fields {
            Some(existing) => {
                existing.first_name != resolved.first_name
                    || existing.last_name != resolved.last_name
            }
            None => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberStatus {
    Subscribed,
    Unsubscribed,
    Cleaned,
    Pending,
    Transactional,
}

/// Body of the create-or-update call. `status_if_new` leaves existing members' status alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberUpsert {
    pub email_address: String,
    pub status_if_new: MemberStatus,
    pub merge_fields: MergeFields,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Audience {
    pub id: String,
    pub name: String,
}

/// Validated settings for one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncConfig {
    #[serde(skip_serializing)]
    pub api_key: String,
    pub audience_id: String,
    pub global_tag: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    StatusTransition { from: String, to: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AbortReason {
    MissingConfig { field: String },
    InvalidConfig { message: String },
    ClientUnavailable { message: String },
    OrderNotFound,
    MissingEmail,
    UpsertFailed { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum SyncOutcome {
    Skipped(SkipReason),
    Aborted(AbortReason),
    NothingToTag {
        member_exists: bool,
    },
    Tagged {
        tags: Vec<String>,
        member_created: bool,
    },
    TaggingFailed {
        tags: Vec<String>,
        member_created: bool,
        error: String,
    },
}

impl SyncOutcome {
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::Skipped(_))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub order_id: u64,
    pub result: SyncOutcome,
    pub finished_at: DateTime<Utc>,
}

impl SyncReport {
    pub fn new(order_id: u64, result: SyncOutcome) -> Self {
        Self {
            order_id,
            result,
            finished_at: Utc::now(),
        }
    }
}
