//! Playback Context - 同步播放限界上下文
//!
//! 职责:
//! - 文本分句与播放进度同步高亮
//! - 音频句柄的独占所有权与一次性释放

mod aggregate;
mod errors;
mod value_objects;

pub use aggregate::PlaybackSession;
pub use errors::PlaybackError;
pub use value_objects::{format_time, AudioHandleId, AudioSource, PlaybackId};
