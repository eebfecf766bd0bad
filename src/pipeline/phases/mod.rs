pub mod analysis;
pub mod check;
pub mod compose;
pub mod generate;
pub mod generation;
pub mod recovery;
pub mod revise;

pub use analysis::AnalysisPhase;
pub use compose::ComposePhase;
pub use generation::GenerationPhase;
