//! Memory Layer - In-Memory State Management
//!
//! 表单会话、播放会话、本地音频句柄与自动前进任务都只存在于进程内存

mod audio_store;
mod auto_advance;
mod session_store;

pub use audio_store::InMemoryAudioStore;
pub use auto_advance::TokioAutoAdvanceScheduler;
pub use session_store::InMemorySessionStore;
