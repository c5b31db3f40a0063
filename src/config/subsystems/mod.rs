pub mod filter;
pub mod matcher;
pub mod embedding;
pub mod output;

pub use filter::FilterConfig;
pub use matcher::MatcherConfig;
pub use embedding::{EmbeddingConfig, EmbeddingProviderKind};
pub use output::OutputConfig;
