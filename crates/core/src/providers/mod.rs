pub mod traits;

// API provider implementations
pub mod gemini;
pub mod nodit;
