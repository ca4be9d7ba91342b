// Order lifecycle
pub mod orders;
pub mod returns;
pub mod stock;

// Payments
pub mod gateway_settings;
pub mod payments;

// Storefront
pub mod cart;
pub mod products;
pub mod reviews;
pub mod shipping;
