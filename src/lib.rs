//! voicemap aligns the voice lines of a game remake with the voice clips of
//! the original release. It matches remake lines to legacy lines through a
//! sequence of passes (blockwise anchors, exact and normalized text, context
//! verification, context triplets, semantic similarity) and writes the
//! remapped voice table along with review artifacts.

// Module declarations
pub mod error;
pub mod parser;
pub mod corpus;
pub mod embedding;
pub mod matcher;
pub mod output;
pub mod config;
pub mod types;

// Re-exports
pub use error::{Error, Result};
pub use matcher::{Alignment, AlignmentPipeline};
pub use output::{AlignmentReport, ArtifactWriter};

// Re-export the config from config module
pub use config::VoicemapConfig;
