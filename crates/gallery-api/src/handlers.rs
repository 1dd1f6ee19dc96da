//! Request handlers.

pub mod config;
pub mod health;
pub mod images;
pub mod uploads;

pub use config::*;
pub use health::*;
pub use images::*;
pub use uploads::*;
