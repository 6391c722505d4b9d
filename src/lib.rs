//! Storefront checkout library
//!
//! Turns a shopping cart and a shipping form into a merchant order and a
//! signed card transaction, then hands the shopper off to the processor.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod errors;
pub mod logging;
pub mod models;
pub mod services;

pub use config::{load_config, CheckoutConfig};
pub use errors::{CheckoutError, CheckoutResult, ValidationFailure};
pub use services::{CheckoutOrchestrator, CheckoutOutcome, Navigator, TokenProvider};
