//! Persisted rewrite plan: the only artifact shared by planning and applying

mod model;
mod store;

pub use model::{Plan, PlanItem};
pub use store::{StoreError, load, save};
