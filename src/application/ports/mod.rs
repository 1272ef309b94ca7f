//! Application Ports - 出站端口定义
//!
//! 定义应用层与基础设施层的抽象接口

mod audio_probe;
mod audio_store;
mod auto_advance;
mod session_store;
mod workflow;

pub use audio_probe::{AudioInfo, AudioProbePort, ProbeError};
pub use audio_store::{AudioStoreError, AudioStorePort, StoredAudio};
pub use auto_advance::AutoAdvancePort;
pub use session_store::{
    modify_session, FlowSession, PlaybackEntry, SessionError, SessionStorePort, StoredSession,
};
pub use workflow::{
    AudioDescriptor, AudioFetchError, FetchedAudio, GeneratedTool, SubmissionError, ToolMetadata,
    WorkflowItem, WorkflowPort,
};
