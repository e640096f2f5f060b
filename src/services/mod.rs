pub mod inventory;
pub mod notifications;
pub mod orders;
pub mod payments;
pub mod returns;
pub mod shipments;
pub mod webhooks;
