pub mod codeforces;

pub use codeforces::client::{CodeforcesClient, CodeforcesError, RatingClient};
pub use codeforces::model::{CodeforcesUser, RatingChange, Submission, SubmissionProblem};
