//! 应用层 - 查询（读操作）
//!
//! CQRS 查询侧：处理所有读操作

mod audio_queries;
mod flow_queries;
mod playback_queries;

pub mod handlers;

pub use audio_queries::*;
pub use flow_queries::*;
pub use playback_queries::*;
