pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::cli::CliConfig;

pub use crate::adapters::mailchimp::{subscriber_hash, MailchimpClient, MailchimpConnector};
pub use crate::adapters::metadata::InMemoryTagMetadata;
pub use crate::config::TomlSettings;
pub use crate::core::names::{BillingNameResolver, OrderMetaNameResolver};
pub use crate::core::reconciler::OrderTagSync;
pub use crate::domain::model::{
    LineItem, MergeFields, Order, OrderStatus, OrderStatusChange, SyncConfig, SyncOutcome,
    SyncReport, TagAssignment,
};
pub use crate::utils::error::{Result, SyncError};
