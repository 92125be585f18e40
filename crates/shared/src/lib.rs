//! 共享库
//!
//! 包含通知路由服务共用的配置、错误处理、渠道与用户偏好模型、可观测性初始化以及测试工具。

pub mod config;
pub mod error;
pub mod models;
pub mod observability;
pub mod test_utils;
