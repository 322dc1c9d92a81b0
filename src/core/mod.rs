// Core domain logic
pub mod account;
pub mod decode;
pub mod feed;
pub mod filters;
pub mod matcher;

pub use account::{AccountError, AccountService};
pub use decode::DecodeError;
pub use feed::{CandidateBatch, CandidateFeed, FeedError};
pub use filters::{is_browsable, seeking_window};
pub use matcher::{EngineError, MatchEngine};
