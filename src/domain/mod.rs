// Race, feature row and prediction records
pub mod prediction;

// Feature matrices and rank/confidence derivation
pub mod ml;

// Port interfaces
pub mod ports;

// Domain-specific error types
pub mod errors;
