//! Workspace root crate. Exists to anchor shared tooling (git hooks via
//! cargo-husky); all functionality lives in the member crates under
//! `crates/`.
