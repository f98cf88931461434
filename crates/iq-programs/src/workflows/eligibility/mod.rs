//! Pure eligibility computation over a catalog snapshot.

mod evaluator;

#[cfg(test)]
mod tests;

pub use evaluator::{eligible_program_ids, eligible_programs, is_eligible, lowest_ami_threshold};
