//! Domain Layer - 领域层
//!
//! 包含两个限界上下文:
//! - Flow Context: 分支引导表单
//! - Playback Context: 文本与音频同步播放

pub mod flow;
pub mod playback;

// 冥想文本分句
mod text_segmenter;

pub use text_segmenter::split_into_segments;
