pub mod chain;
pub mod chart;
pub mod chat;
pub mod envelope;
pub mod intent;
pub mod settings;
