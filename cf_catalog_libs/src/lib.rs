pub mod codeforces;

pub use codeforces::client::{CodeforcesClient, FetchError, MetadataSource};
pub use codeforces::problem_id::ProblemId;
