pub mod config;
pub mod yaml_include;

/// Common utilities shared across the ride cancellation workspace
///
/// This crate provides shared functionality used by the core `processing`
/// library and the `rides` executables:
///
/// - Configuration types and loading
/// - YAML `!include` resolution used by build scripts and config loading
pub mod docs {
    //! Documentation for the shared configuration layer
}
