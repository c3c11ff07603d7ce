use crate::domain::model::{LineItem, TagAssignment};
use crate::domain::ports::{TagMetadataStore, TagScope};
use std::collections::HashSet;

fn lookup(store: &dyn TagMetadataStore, scope: TagScope, entity_id: u64) -> Option<String> {
    store
        .tag(scope, entity_id)
        .filter(|tag| !tag.trim().is_empty())
}

/// Walks the line items in order, collecting the product tag and (independently)
/// the variation tag of each, then the global tag. The result is deduplicated.
pub fn collect_tags(
    items: &[LineItem],
    store: &dyn TagMetadataStore,
    global_tag: Option<&str>,
) -> Vec<TagAssignment> {
    let mut tags = Vec::new();

    for item in items {
        tracing::info!(
            "Processing item: {} (Product ID: {}, Variation ID: {})",
            item.name,
            item.product_id,
            item.variation().unwrap_or(0)
        );

        let product_tag = lookup(store, TagScope::Product, item.product_id);
        if let Some(tag) = &product_tag {
            tracing::info!("Found product tag '{}' for product ID {}", tag, item.product_id);
            tags.push(TagAssignment::active(tag.as_str()));
        }

        let variation_tag = item
            .variation()
            .and_then(|id| lookup(store, TagScope::Variation, id).map(|tag| (id, tag)));
        if let Some((id, tag)) = &variation_tag {
            tracing::info!("Found variation tag '{}' for variation ID {}", tag, id);
            tags.push(TagAssignment::active(tag.as_str()));
        }

        if product_tag.is_none() && variation_tag.is_none() {
            tracing::debug!("No tags found for product ID {}", item.product_id);
        }
    }

    if let Some(global) = global_tag.map(str::trim).filter(|g| !g.is_empty()) {
        tracing::info!("Adding global tag '{}'", global);
        tags.push(TagAssignment::active(global));
    }

    dedup_tags(tags)
}

/// Drops repeated names (exact, case-sensitive), keeping the first occurrence.
pub fn dedup_tags(tags: Vec<TagAssignment>) -> Vec<TagAssignment> {
    let mut seen = HashSet::new();
    tags.into_iter()
        .filter(|tag| seen.insert(tag.name.clone()))
        .collect()
}

pub fn tag_names(tags: &[TagAssignment]) -> Vec<String> {
    tags.iter().map(|t| t.name.clone()).collect()
}
