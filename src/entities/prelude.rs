pub use super::auth_tokens::Entity as AuthTokens;
pub use super::categories::Entity as Categories;
pub use super::item_images::Entity as ItemImages;
pub use super::items::Entity as Items;
pub use super::order_items::Entity as OrderItems;
pub use super::orders::Entity as Orders;
pub use super::otp_requests::Entity as OtpRequests;
pub use super::users::Entity as Users;
pub use super::webhook_events::Entity as WebhookEvents;
