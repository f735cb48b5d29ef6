//! Conditional style module
//!
//! Styles, overlays and the resolver that picks the active style for a
//! button from live tag values.

mod conditional;
mod manager;
mod properties;


pub use conditional::*;
pub use manager::*;
pub use properties::*;
