pub mod order;
pub mod order_item;
pub mod product;
pub mod return_request;
pub mod shipment;
pub mod tracking_event;
