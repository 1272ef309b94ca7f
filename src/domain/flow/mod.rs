//! Flow Context - 引导表单限界上下文
//!
//! 职责:
//! - 静态步骤目录与分支可见性
//! - 表单状态机（回答、导航、自动前进票据）
//! - 提交 payload 组装

mod aggregate;
mod catalog;
mod entities;
mod errors;
mod submission;
mod value_objects;

pub use aggregate::{AdvanceTicket, AnswerSet, FlowState};
pub use catalog::StepCatalog;
pub use entities::StepDefinition;
pub use errors::{CatalogError, FlowError};
pub use submission::{SubmissionContext, SubmissionPayload};
pub use value_objects::{AnswerValue, StepId, StepKind, StepOption, Visibility};
