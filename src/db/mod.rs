pub mod interval_queries;
pub mod listing_queries;
pub mod product_queries;
