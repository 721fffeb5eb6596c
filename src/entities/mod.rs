pub mod prelude;

pub mod auth_tokens;
pub mod categories;
pub mod item_images;
pub mod items;
pub mod order_items;
pub mod orders;
pub mod otp_requests;
pub mod users;
pub mod webhook_events;
