//! Infrastructure Adapters
//!
//! 六边形架构的适配器实现

pub mod probe;
pub mod webhook;

pub use probe::*;
pub use webhook::*;
