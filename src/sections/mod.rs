//! Section controllers. Each owns one bucket, keyed by its slide key, and is
//! only reachable while its slide is mounted.

pub mod analyze;
pub mod apply_design;
pub mod explore;
pub mod m2m;
pub mod propose;
pub mod welcome;
