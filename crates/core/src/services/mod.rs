pub mod chart_service;
pub mod chat_service;
pub mod data_service;
pub mod dispatch_service;
pub mod intent_service;
pub mod normalizer;
