pub(crate) mod health;
pub(crate) mod listings;
pub(crate) mod prices;
pub(crate) mod products;
