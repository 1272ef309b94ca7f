//! Command Handlers 实现
//!
//! 所有 CommandHandler 的具体实现

mod audio_handlers;
mod flow_handlers;
mod playback_handlers;
mod submit_handler;

pub use audio_handlers::*;
pub use flow_handlers::*;
pub use playback_handlers::*;
pub use submit_handler::*;
