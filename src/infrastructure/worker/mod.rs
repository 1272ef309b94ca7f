//! Worker Layer - Background Tasks
//!
//! 空闲表单与播放会话的定期回收

mod session_reaper;

pub use session_reaper::{SessionReaper, SessionReaperConfig, SweepReport};
