//! Database entities.
//!
//! Identifiers are 24-character hex strings generated by [`crate::common::new_object_id`].
//! Money columns are `DECIMAL(16,4)`.

pub mod cart;
pub mod cart_item;
pub mod gateway_setting;
pub mod order;
pub mod order_item;
pub mod payment;
pub mod product;
pub mod return_item;
pub mod return_request;
pub mod review;
pub mod shipping_setting;
