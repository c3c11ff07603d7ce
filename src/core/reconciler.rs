//! Order-to-tag reconciliation.
//!
//! One call to [`OrderTagSync::handle`] per order status change. Every failure
//! ends in a logged [`SyncOutcome`]; nothing is propagated to the caller.

use crate::core::names::{billing_names, BillingNameResolver};
use crate::core::tags::{collect_tags, tag_names};
use crate::domain::model::{
    AbortReason, MemberStatus, MemberUpsert, MergeFields, Order, OrderStatusChange, SkipReason,
    SyncConfig, SyncOutcome,
};
use crate::domain::ports::{
    MarketingApi, MarketingApiConnector, NameResolver, OrderSource, SettingsStore,
    TagMetadataStore,
};
use crate::utils::error::SyncError;

pub struct OrderTagSync<'a, C: MarketingApiConnector> {
    connector: &'a C,
    settings: &'a dyn SettingsStore,
    orders: &'a dyn OrderSource,
    tags: &'a dyn TagMetadataStore,
    names: Box<dyn NameResolver + 'a>,
}

impl<'a, C: MarketingApiConnector> OrderTagSync<'a, C> {
    pub fn new(
        connector: &'a C,
        settings: &'a dyn SettingsStore,
        orders: &'a dyn OrderSource,
        tags: &'a dyn TagMetadataStore,
    ) -> Self {
        Self {
            connector,
            settings,
            orders,
            tags,
            names: Box::new(BillingNameResolver),
        }
    }

    pub fn with_name_resolver(mut self, resolver: impl NameResolver + 'a) -> Self {
        self.names = Box::new(resolver);
        self
    }

    pub async fn handle(&self, event: &OrderStatusChange) -> SyncOutcome {
        let order_id = event.order_id;

        if !event.triggers_sync() {
            tracing::info!(
                "Order {} status change ({} -> {}) doesn't trigger processing",
                order_id,
                event.old_status,
                event.new_status
            );
            return SyncOutcome::Skipped(SkipReason::StatusTransition {
                from: event.old_status.to_string(),
                to: event.new_status.to_string(),
            });
        }

        tracing::info!(
            "Processing order {}: status changed from {} to {}",
            order_id,
            event.old_status,
            event.new_status
        );

        let config = match SyncConfig::from_store(self.settings) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Missing API key or audience ID - aborting order processing: {}", e);
                return SyncOutcome::Aborted(match e {
                    SyncError::MissingConfigError { field } => AbortReason::MissingConfig { field },
                    other => AbortReason::InvalidConfig {
                        message: other.to_string(),
                    },
                });
            }
        };

        let client = match self.connector.connect(&config) {
            Ok(client) => client,
            Err(e) => {
                tracing::error!("Failed to initialize Mailchimp client: {}", e);
                return SyncOutcome::Aborted(AbortReason::ClientUnavailable {
                    message: e.to_string(),
                });
            }
        };

        let Some(order) = self.orders.find_order(order_id) else {
            tracing::warn!("Could not retrieve order {}", order_id);
            return SyncOutcome::Aborted(AbortReason::OrderNotFound);
        };

        let email = order.billing_email.trim();
        if email.is_empty() {
            tracing::warn!("No email address found for order {}", order_id);
            return SyncOutcome::Aborted(AbortReason::MissingEmail);
        }

        self.reconcile(&client, &config, &order, email).await
    }

    async fn reconcile(
        &self,
        client: &C::Client,
        config: &SyncConfig,
        order: &Order,
        email: &str,
    ) -> SyncOutcome {
        let names = self.names.resolve(order, billing_names(order));
        tracing::info!(
            "Processing tags for: {} ({} {})",
            email,
            names.first_name,
            names.last_name
        );

        let hash = client.subscriber_hash(email);
        let member_exists = self.sync_existing_member(client, config, &hash, email, &names).await;

        tracing::info!("Processing {} items for order {}", order.items.len(), order.id);
        let tags = collect_tags(&order.items, self.tags, config.global_tag.as_deref());

        if tags.is_empty() {
            tracing::info!("No tags to apply for order {}", order.id);
            return SyncOutcome::NothingToTag { member_exists };
        }

        let names_applied = tag_names(&tags);

        if !member_exists {
            tracing::info!("Creating transactional contact to apply tags");
            let upsert = MemberUpsert {
                email_address: email.to_string(),
                status_if_new: MemberStatus::Transactional,
                merge_fields: names,
            };
            if let Err(e) = client.upsert_member(&config.audience_id, &hash, &upsert).await {
                tracing::error!("Failed to create contact: {}", e);
                return SyncOutcome::Aborted(AbortReason::UpsertFailed {
                    message: e.to_string(),
                });
            }
            tracing::info!("Created new transactional contact for {}", email);
        }

        match client.assign_tags(&config.audience_id, &hash, &tags).await {
            Ok(()) => {
                tracing::info!(
                    "Successfully added tags to {}: {}",
                    email,
                    names_applied.join(", ")
                );
                SyncOutcome::Tagged {
                    tags: names_applied,
                    member_created: !member_exists,
                }
            }
            Err(e) => {
                tracing::error!("Mailchimp API Error (Adding Tags): {}", e);
                SyncOutcome::TaggingFailed {
                    tags: names_applied,
                    member_created: !member_exists,
                    error: e.to_string(),
                }
            }
        }
    }

    /// Looks the member up and refreshes its merge fields when they differ.
    /// Returns whether the member exists; lookup failures count as absent.
    async fn sync_existing_member(
        &self,
        client: &C::Client,
        config: &SyncConfig,
        hash: &str,
        email: &str,
        names: &MergeFields,
    ) -> bool {
        let member = match client.get_member(&config.audience_id, hash).await {
            Ok(member) => member,
            Err(e) if e.is_not_found() => {
                tracing::info!("Member {} not found in Mailchimp list", email);
                return false;
            }
            Err(e) => {
                tracing::warn!("Member lookup for {} failed, treating as new: {}", email, e);
                return false;
            }
        };

        tracing::info!(
            "Found existing member {} with status: {}",
            email,
            member.status.as_deref().unwrap_or("unknown")
        );

        if member.merge_fields_differ(names) {
            match client
                .patch_merge_fields(&config.audience_id, hash, names)
                .await
            {
                Ok(()) => tracing::info!("Successfully updated merge fields for {}", email),
                Err(e) => tracing::warn!("Warning: Could not update merge fields - {}", e),
            }
        }

        true
    }
}
