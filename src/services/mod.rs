pub mod booking_service;
pub use booking_service::{
    BookingError, BookingService, DraftLine, OrderDraft, PlacedOrder, Quote, QuoteLine,
};

pub mod booking_service_impl;
pub use booking_service_impl::SeaOrmBookingService;

pub mod lifecycle_service;
pub use lifecycle_service::{
    ActivationReport, LifecycleError, LifecycleService, PaymentContact, PaymentIntent,
    ShipmentInfo, TrackingReport,
};

pub mod lifecycle_service_impl;
pub use lifecycle_service_impl::SeaOrmLifecycleService;

pub mod identity_service;
pub use identity_service::{AuthenticatedUser, IdentityError, IdentityService, TokenPair};

pub mod identity_service_impl;
pub use identity_service_impl::SeaOrmIdentityService;
