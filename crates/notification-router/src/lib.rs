//! 通知路由服务
//!
//! 按用户偏好将通知请求路由到邮件、短信等渠道：规划渠道、按首选语言解析模板
//! （缺失时回退到默认语言）、渲染动态数据并交给渠道发送器。
//! 单个渠道失败不影响其他渠道的投递，所有结果以结构化数据返回。

pub mod batch;
pub mod cli;
pub mod dispatcher;
pub mod error;
pub mod planner;
pub mod preference;
pub mod sender;
pub mod template;
pub mod types;
pub mod validation;

pub use batch::{BatchMode, BatchOrchestrator};
pub use dispatcher::DispatchExecutor;
pub use error::{NotificationError, Result};
pub use planner::{ChannelPlan, ChannelPlanner, PlanDecision};
pub use preference::{InMemoryPreferenceStore, PreferenceProvider};
pub use sender::{
    ChannelSender, ChannelSenders, SendMetadata, SendReceipt, SenderIdentity, SimulatedSender,
};
pub use template::{
    InMemoryTemplateStore, RenderedContent, ResolutionMode, Template, TemplateProvider,
    TemplateRenderer, TemplateResolver,
};
pub use types::{
    BatchResult, ChannelResult, DispatchOptions, DispatchOutcome, DispatchResult,
    NotificationRequest, RecipientStatus, StatusCounts,
};
