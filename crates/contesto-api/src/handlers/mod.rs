pub mod document_url;
pub mod health;
pub mod trigger_processing;
