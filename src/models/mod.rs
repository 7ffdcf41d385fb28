mod price_interval;
mod product;
mod store_listing;

pub use price_interval::{PriceInterval, PriceObservation};
pub use product::{CreateProduct, Product, UpdateProduct};
pub use store_listing::{CreateStoreListing, StoreListing};
