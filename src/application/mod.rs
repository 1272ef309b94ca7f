//! 应用层 - 用例编排
//!
//! 包含：
//! - ports: 六边形架构端口定义（WorkflowPort、SessionStore、AudioStore、AudioProbe、AutoAdvance）
//! - commands: CQRS 命令及处理器
//! - queries: CQRS 查询及处理器
//! - error: 应用层错误定义

pub mod commands;
pub mod error;
pub mod ports;
pub mod queries;

// Re-exports
pub use commands::{
    // Flow commands
    CloseFlowCommand,
    CloseFlowResponse,
    FlowView,
    NavigateCommand,
    Navigation,
    ResetFlowCommand,
    SelectAnswerCommand,
    StartFlowCommand,
    SubmitFlowCommand,
    SubmitFlowResponse,
    ToggleMultiSelectCommand,
    // Playback commands
    PlaybackAction,
    PlaybackControlCommand,
    PlaybackView,
    ReleasePlaybackCommand,
    ReleasePlaybackResponse,
    // Handlers
    handlers::{
        AcquireAudioHandler, AcquireOutcome, ApplyAutoAdvanceHandler, CloseFlowHandler,
        NavigateHandler, PlaybackControlHandler, ReleasePlaybackHandler, ResetFlowHandler,
        SelectAnswerHandler, StartFlowHandler, SubmitFlowHandler, ToggleMultiSelectHandler,
    },
};

pub use error::ApplicationError;

pub use ports::{
    // Audio probe
    AudioInfo,
    AudioProbePort,
    ProbeError,
    // Audio store
    AudioStoreError,
    AudioStorePort,
    StoredAudio,
    // Auto advance
    AutoAdvancePort,
    // Session store
    FlowSession,
    PlaybackEntry,
    SessionError,
    SessionStorePort,
    StoredSession,
    // Workflow
    AudioDescriptor,
    AudioFetchError,
    FetchedAudio,
    GeneratedTool,
    SubmissionError,
    ToolMetadata,
    WorkflowItem,
    WorkflowPort,
};

pub use queries::{
    // Audio queries
    GetAudioQuery,
    GetAudioResponse,
    // Flow queries
    GetCatalogQuery,
    GetFlowQuery,
    // Playback queries
    GetPlaybackQuery,
    // Handlers
    handlers::{GetAudioHandler, GetCatalogHandler, GetFlowHandler, GetPlaybackHandler},
};
