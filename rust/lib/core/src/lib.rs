pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod module;
pub mod types;
pub mod validate;

pub use auth::{CurrentUser, Role};
pub use config::ServiceConfig;
pub use error::{FieldError, ServiceError};
pub use extract::{ApiJson, ApiPath, ApiQuery};
pub use module::Module;
pub use types::{
    like_pattern, new_id, now_rfc3339, round_money, today, ListResult, Page, PageParams, DEFAULT_LIMIT,
    MAX_AMOUNT, MAX_LIMIT,
};
pub use validate::Validator;
