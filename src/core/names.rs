use crate::domain::model::{MergeFields, Order};
use crate::domain::ports::NameResolver;

/// Trimmed billing first/last name.
pub fn billing_names(order: &Order) -> MergeFields {
    MergeFields::new(
        order.billing_first_name.trim(),
        order.billing_last_name.trim(),
    )
}

/// Default strategy: keep the billing names.
#[derive(Debug, Clone, Copy, Default)]
pub struct BillingNameResolver;

impl NameResolver for BillingNameResolver {
    fn resolve(&self, _order: &Order, billing: MergeFields) -> MergeFields {
        billing
    }
}

/// Reads names from order meta (e.g. an enrollee who is not the payer).
/// Each part falls back to the billing name when its meta value is missing or blank.
#[derive(Debug, Clone)]
pub struct OrderMetaNameResolver {
    first_name_key: Option<String>,
    last_name_key: Option<String>,
}

impl OrderMetaNameResolver {
    pub fn new(first_name_key: Option<String>, last_name_key: Option<String>) -> Self {
        Self {
            first_name_key,
            last_name_key,
        }
    }

    fn lookup(order: &Order, key: Option<&str>) -> Option<String> {
        key.and_then(|k| order.meta(k))
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }
}

impl NameResolver for OrderMetaNameResolver {
    fn resolve(&self, order: &Order, billing: MergeFields) -> MergeFields {
        MergeFields {
            first_name: Self::lookup(order, self.first_name_key.as_deref())
                .unwrap_or(billing.first_name),
            last_name: Self::lookup(order, self.last_name_key.as_deref())
                .unwrap_or(billing.last_name),
        }
    }
}
