//! Shared helpers for the `create-lbs` behavioural scenarios.

pub mod test_doubles;
