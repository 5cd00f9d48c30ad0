// Library interface for newsdigest modules
// This allows tests and the binary to import modules

pub mod chunking;
pub mod llm;
pub mod pacing;
pub mod processing;
pub mod scraping;
pub mod server;
