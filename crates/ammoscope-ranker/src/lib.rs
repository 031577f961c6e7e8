//! ammoscope-ranker: Composite scoring and batch normalisation.

pub mod scorer;
pub mod normalise;
pub mod weights;

pub use normalise::{normalise_batch, Ceiling, NormaliseOutcome, NormaliseSkip};
pub use scorer::{score_batch, score_record, ScoreOutcome, ScoringSummary};
pub use weights::ScoreWeights;
