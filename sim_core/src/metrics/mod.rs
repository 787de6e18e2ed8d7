//! Streaming statistics
//!
//! Per-iteration totals are folded into running sums, sums of squares,
//! maxima and bucketed histograms, so no per-iteration history is kept.
//! Every aggregate has a `merge` that is commutative and associative.

mod action;
mod aura;
mod character;
mod distribution;
mod target;

pub use action::ActionMetrics;
pub use aura::{AuraMetrics, AuraSummary};
pub use character::{CharacterMetrics, IterationMetrics};
pub use distribution::{mean_and_stdev, DistributionMetrics, DistributionSummary, HISTOGRAM_BUCKET};
pub use target::TargetMetrics;
