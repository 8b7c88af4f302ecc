pub mod narrator;
pub mod rebalance;
pub mod recommender;
pub mod scorer;
pub mod spreads;

pub use narrator::{NarrationFacts, Narrator, SharedNarrator};
pub use rebalance::analyze;
pub use recommender::{diversification, recommend, water_fill};
pub use scorer::{score, score_candidates, ScoreBreakdown, ScoredPool};
pub use spreads::detect_spreads;
