pub mod llm_service;
pub mod result_writer;
pub mod score_parser;

pub use llm_service::LlmService;
pub use result_writer::ResultWriter;
pub use score_parser::extract_score;
