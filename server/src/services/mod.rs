// server/src/services/mod.rs

pub mod payment_gateway;
pub mod session;

pub use payment_gateway::{CheckoutSession, CheckoutSessionRequest, PaymentGateway, StripeGateway};
pub use session::{Claims, SessionVerifier};
