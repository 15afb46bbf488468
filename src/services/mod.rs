// 服务模块
// 提供核心业务逻辑服务

pub mod admin_flow;
pub mod auth;
pub mod catalog;
pub mod companies;
pub mod database;
pub mod problem_store;
pub mod problems;
pub mod progress;
pub mod runner;
pub mod sandbox;
pub mod store_client;
pub mod submission;

pub use admin_flow::{AdminFlow, FlowError, FlowState};

pub use auth::{authorize_admin, AccessPolicy, AdminGrant, AuthError, Identity, Role};

pub use catalog::{
    entry_point, render_markdown, render_statement, Catalog, CatalogError, Example, Handler,
    Problem, RenderedStatement, TestVector,
};

pub use companies::{CompanyDirectory, DanglingReference, DeleteReport, DirectoryError, DriftReport};

pub use database::{DocumentStore, Filter, MemoryStore, SqliteStore, Write};

pub use problem_store::{ProblemStore, ProblemStoreError};

pub use progress::{Dashboard, ProgressStore, Reaction};

pub use runner::{
    Candidate, CandidateError, CancelHandle, CancelToken, FailureReason, FnCandidate,
    RunnerConfig, ValidationFailure, ValidationRunner, Verdict,
};

pub use sandbox::{Sandbox, SandboxCandidate, SandboxConfig, SandboxError};

pub use store_client::{RetryPolicy, StoreClient};

pub use submission::{SubmissionError, SubmissionOutcome, Submissions};
