pub mod listing_service;
pub mod product_service;
pub mod versioning_service;
