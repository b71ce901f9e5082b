pub mod prompt_builder;
pub mod response_parser;

pub use prompt_builder::PromptBuilder;
pub use response_parser::parse_enrichment;
