//! Trigger/condition module
//!
//! This module defines the Ordinary/On/Off/Range trigger model shared by
//! conditional styles and button actions, plus validation and evaluation.

mod evaluate;
mod model;
mod operand;
mod validate;


pub use evaluate::*;
pub use model::*;
pub use operand::*;
pub use validate::*;
