pub mod provider;
pub mod query;
pub mod session;

pub use provider::{Provider, ProviderConfig, ResolvedProvider, UnknownProvider};
pub use query::{
    ErrorKind, Failure, ForbiddenReason, NetworkReason, QueryRequest, QueryResult,
    RateLimitReason,
};
pub use session::AuthSession;
