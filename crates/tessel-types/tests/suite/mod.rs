// Consolidated integration test suite.
//
// Compiled by `tests/tessel_types.rs` so `cargo test -p tessel-types --test tessel_types`
// builds a single integration test binary for the crate.
mod common_super_type;
mod minimal_jdk;
