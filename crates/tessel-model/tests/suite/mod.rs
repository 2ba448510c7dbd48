// Consolidated integration test suite.
//
// Compiled by `tests/tessel_model.rs` so `cargo test -p tessel-model --test tessel_model`
// builds a single integration test binary for the crate.
mod builders;
mod jdk_members;
