mod interval_store;
pub mod memory;
pub mod postgres;

pub use interval_store::{IntervalStore, ListingStore};
