pub mod api;
pub mod checkout;
pub mod config;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod gateway;

pub use checkout::{CheckoutService, PayoutEngine, Reconciler, ReversalEngine};
pub use config::Config;
pub use db::{init_db, Repository};
pub use domain::{
    Address, Cart, CartId, CartItem, Country, Minor, Order, OrderId, OrderStatus, Payout,
    PayoutStatus, ProviderEvent, TimeMs,
};
pub use error::AppError;
