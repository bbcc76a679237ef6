//! Type definitions for the claim worker

pub mod claim;
pub mod dead_letter;
pub mod verdict;

pub use claim::{ClaimRecord, ClaimSubmission, ClaimValue};
pub use dead_letter::{ClaimStage, DeadLetter};
pub use verdict::{Verdict, VerdictRecord};
