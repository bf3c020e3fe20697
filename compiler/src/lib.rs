//! The compiler facade (spec.md §6): the public surface everything else
//! in this workspace exists to serve. `compile`, `compile_script`, and
//! `analyze` are pure functions of `(Snapshot, source text,
//! CompileOptions)` (spec.md §5) built on top of phases L through G in
//! the sibling crates.

mod backend_error;
mod cache;
mod cancellation;
mod describe;
mod options;
mod plan;
mod pipeline;
mod snapshot;

pub use backend_error::{interpret_backend_error, BackendErrorFields};
pub use cache::CacheKey;
pub use cancellation::CancellationToken;
pub use describe::{describe, is_singleton_shaped, DescribeResult, TypeDescriptor};
pub use options::{CompileOptions, OutputFormat};
pub use pipeline::{analyze, compile, compile_script, CompiledStatement};
pub use plan::{Plan, QueryPlanInfo};
pub use snapshot::Snapshot;

pub use diagnostics::{
    CollectingWarningSink, CompileWarning, Error, LanguageError, LanguageErrorCategory, NullWarningSink, WarningSink,
};
