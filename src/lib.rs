// I don't really care, and it's not important for this project
#![allow(clippy::result_large_err)]

pub mod cache;
pub mod context;
mod engine;
mod error;
pub mod rate_limit;
pub mod server;

pub use engine::assist::{suggestions, validate, Validation};
pub use engine::query;
pub use engine::{Position, Source, Sourced};
pub use engine::{parse, parse_with_reference, render, render_preview, to_preview_sql, to_sql};
pub use engine::{
    Dialect, InvalidTenantColumnError, MissingTenantError, RenderOptions, SqlQuery, SqlValue,
    TenantColumn, TenantContext, ValueTyping,
};

pub use error::{ConditionError, Error, ErrorKind, InternalError, UnsupportedReason};
