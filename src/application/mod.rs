// Model training and inference
pub mod ml;

// Scope resolution, training-set assembly and publishing
pub mod pipeline;

// Job entry point
pub mod handler;
