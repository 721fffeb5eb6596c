pub mod catalog;
pub mod order;
pub mod otp;
pub mod token;
pub mod user;
pub mod webhook;
