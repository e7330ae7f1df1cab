//! Turns diagram source into an image through the public rendering services.

mod client;
mod convert;
mod error;
mod theme;

pub use client::*;
pub use convert::*;
pub use error::*;
pub use theme::*;
