pub mod id;
pub mod record;
pub mod result;
pub mod status;

pub use id::{JobIdGenerator, MintedId};
pub use record::{BatchParseStats, Job, JobMetadata, JobStats, RegenerationStats};
pub use result::{ItemResult, ParseResult, RegenerationResult};
pub use status::{ItemOutcome, JobKind, JobStatus};
