//! Rental Common - Shared types for the rental billing engine
//!
//! This crate provides what every billing component and the API layer
//! around it agree on:
//! - Error codes with HTTP status and translation key mapping
//! - The typed `RentalError` carried across component boundaries
//! - The `{success, data|error, message}` response envelope

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod response;

pub use error::*;
pub use response::ApiResponse;
