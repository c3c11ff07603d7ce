pub mod names;
pub mod reconciler;
pub mod tags;

pub use crate::domain::model::{OrderStatusChange, SyncOutcome, TagAssignment};
pub use crate::domain::ports::{MarketingApi, MarketingApiConnector, NameResolver};
pub use crate::utils::error::Result;
