//! Data models for Trafficwatch

mod alert;
mod traffic;
mod window;

pub use alert::*;
pub use traffic::*;
pub use window::*;
