pub mod google;
pub mod mailer;
pub mod razorpay;
pub mod shiprocket;
