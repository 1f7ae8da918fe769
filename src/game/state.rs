//! Round and combat state

use std::collections::VecDeque;

use thiserror::Error;

use crate::consts::{CARTRIDGE_CAPACITY, HP_MAX};

/// Gameplay invariant violations. These indicate a programming error in the
/// calling sequence, not recoverable user input.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GameError {
    #[error("cannot fire with nothing chambered")]
    NothingChambered,
    #[error("tray preview of {requested} shells exceeds capacity {capacity}")]
    TrayOverflow { requested: usize, capacity: usize },
}

/// The two duel parties
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Player,
    Dealer,
}

impl Actor {
    pub fn other(self) -> Actor {
        match self {
            Actor::Player => Actor::Dealer,
            Actor::Dealer => Actor::Player,
        }
    }
}

/// A cartridge is either live or blank
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundKind {
    Live,
    Blank,
}

/// Complete combat state for one game
#[derive(Debug, Clone)]
pub struct RoundState {
    /// Whose decision point is next
    pub turn: Actor,
    /// Bonus damage accumulated from consecutive self-shot blanks, applied
    /// to the next live shot then reset
    pub damage_stack: u8,
    pub player_hp: u8,
    pub dealer_hp: u8,
    /// Unconsumed shuffled sequence, mirroring the tray minus the chambered
    /// round; consumed strictly front-to-back
    pub remaining: VecDeque<RoundKind>,
    /// The round loaded and about to be fired
    pub chambered: Option<RoundKind>,
    /// Advisory mutual exclusion over the animation sequencer. Callers
    /// check-and-skip; nothing queues behind it.
    pub busy: bool,
    /// Previously fired round and its shooter, ejected with a one-step
    /// delay on the next reload
    pub previous: Option<(RoundKind, Actor)>,
    pub game_over: bool,
}

impl Default for RoundState {
    fn default() -> Self {
        Self::new()
    }
}

impl RoundState {
    pub fn new() -> Self {
        Self {
            turn: Actor::Player,
            damage_stack: 0,
            player_hp: HP_MAX,
            dealer_hp: HP_MAX,
            remaining: VecDeque::with_capacity(CARTRIDGE_CAPACITY),
            chambered: None,
            busy: false,
            previous: None,
            game_over: false,
        }
    }

    pub fn hp(&self, actor: Actor) -> u8 {
        match actor {
            Actor::Player => self.player_hp,
            Actor::Dealer => self.dealer_hp,
        }
    }

    pub fn hp_mut(&mut self, actor: Actor) -> &mut u8 {
        match actor {
            Actor::Player => &mut self.player_hp,
            Actor::Dealer => &mut self.dealer_hp,
        }
    }

    pub fn both_alive(&self) -> bool {
        self.player_hp > 0 && self.dealer_hp > 0
    }

    /// Load a fresh shuffled sequence for a new round
    pub fn begin_round(&mut self, kinds: &[RoundKind]) {
        self.remaining.clear();
        self.remaining.extend(kinds.iter().copied());
        self.chambered = None;
    }

    /// Move the next round from the tray mirror into the chamber
    pub fn chamber_next(&mut self) -> Option<RoundKind> {
        let kind = self.remaining.pop_front()?;
        self.chambered = Some(kind);
        Some(kind)
    }
}
