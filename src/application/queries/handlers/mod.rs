//! Query Handlers 实现
//!
//! 所有 QueryHandler 的具体实现

mod audio_handlers;
mod flow_handlers;
mod playback_handlers;

pub use audio_handlers::*;
pub use flow_handlers::*;
pub use playback_handlers::*;
