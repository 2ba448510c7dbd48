// Consolidated integration test suite.
//
// Compiled by `tests/tessel_infer.rs` so `cargo test -p tessel-infer --test tessel_infer`
// builds a single integration test binary for the crate.
mod env_merge;
mod expressions;
mod linking;
mod members;
