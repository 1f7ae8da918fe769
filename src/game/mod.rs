//! Deterministic game rules
//!
//! All combat and round logic lives here. This module must stay pure:
//! - Seeded RNG only
//! - No scene, animation or platform dependencies
//! - Every mutation driven by the single in-flight game sequence

pub mod rules;
pub mod state;

pub use rules::{ShotOutcome, classify_target, dealer_target, fire, roll_round_kinds};
pub use state::{Actor, GameError, RoundKind, RoundState};
