pub mod audit;
pub mod blockwise;
pub mod exact;
pub mod index;
pub mod pipeline;
pub mod reservation;
pub mod semantic;
pub mod state;
pub mod triplet;
pub mod verifier;
#[cfg(test)]
pub(crate) mod test_support;

// Re-export the main types
pub use self::audit::{AuditEntry, AuditEvent, AuditLog, Pass};
pub use self::index::CandidateIndex;
pub use self::pipeline::{Alignment, AlignmentPipeline, PassStats};
pub use self::reservation::ReservationSet;
pub use self::semantic::{contextual_text, SemanticIndex};
pub use self::state::{AlignmentState, LineState};
