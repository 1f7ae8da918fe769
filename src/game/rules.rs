//! Pure combat resolution, cartridge draw and the dealer's policy

use glam::Vec2;
use rand::Rng;
use rand::seq::SliceRandom;

use super::state::{Actor, GameError, RoundKind, RoundState};
use crate::consts::{AVATAR_HIT_RADIUS, CARTRIDGE_CAPACITY, DAMAGE_STACK_MAX};
use crate::inside_circle;

/// Draw a round's worth of cartridges: six independent rolls of a 7-sided
/// die, low values live, high values blank. The gap in the middle produces
/// no cartridge at all — preserved from the original rules as observed, not
/// smoothed into a 50/50 split.
pub fn roll_round_kinds<R: Rng>(rng: &mut R) -> Vec<RoundKind> {
    let mut live = 0usize;
    let mut blank = 0usize;
    for _ in 0..CARTRIDGE_CAPACITY {
        match rng.random_range(0..7u8) {
            0 | 1 => live += 1,
            4..=6 => blank += 1,
            _ => {}
        }
    }
    let mut kinds = Vec::with_capacity(live + blank);
    kinds.extend(std::iter::repeat_n(RoundKind::Live, live));
    kinds.extend(std::iter::repeat_n(RoundKind::Blank, blank));
    kinds
}

/// Uniformly shuffle the firing order in place
pub fn shuffle_round<R: Rng>(kinds: &mut [RoundKind], rng: &mut R) {
    kinds.shuffle(rng);
}

/// Result of firing the chambered round, for the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShotOutcome {
    /// Live round hit `target` for `damage`; `winner` is set when the hit
    /// ended the game
    Live {
        target: Actor,
        damage: u8,
        winner: Option<Actor>,
    },
    /// Blank fired at the shooter's own head; turn stays, stack grows
    BlankSelf { stack: u8 },
    /// Blank fired at the other party; turn transfers
    BlankOther,
}

/// Fire the chambered round from `shooter` at `target` and apply every
/// consequence: damage, stack, turn transfer, game over.
pub fn fire(
    state: &mut RoundState,
    shooter: Actor,
    target: Actor,
) -> Result<ShotOutcome, GameError> {
    let kind = state.chambered.take().ok_or(GameError::NothingChambered)?;
    state.previous = Some((kind, shooter));

    match kind {
        RoundKind::Live => {
            let damage = 1 + state.damage_stack.min(DAMAGE_STACK_MAX);
            let hp = state.hp_mut(target);
            *hp = hp.saturating_sub(damage);
            if *hp == 0 {
                state.game_over = true;
                return Ok(ShotOutcome::Live {
                    target,
                    damage,
                    winner: Some(target.other()),
                });
            }
            state.damage_stack = 0;
            state.turn = shooter.other();
            Ok(ShotOutcome::Live {
                target,
                damage,
                winner: None,
            })
        }
        RoundKind::Blank => {
            if shooter == target {
                state.damage_stack = (state.damage_stack + 1).min(DAMAGE_STACK_MAX);
                Ok(ShotOutcome::BlankSelf {
                    stack: state.damage_stack,
                })
            } else {
                state.turn = shooter.other();
                Ok(ShotOutcome::BlankOther)
            }
        }
    }
}

/// The dealer's targeting heuristic: count live vs blank among everything
/// not yet fired, including the chambered round. The chambered count gives
/// the dealer information a human opponent would not have; preserved as
/// observed rather than rebalanced.
pub fn dealer_target(state: &RoundState) -> Actor {
    let mut live = 0usize;
    let mut blank = 0usize;
    for kind in state
        .remaining
        .iter()
        .copied()
        .chain(state.chambered)
    {
        match kind {
            RoundKind::Live => live += 1,
            RoundKind::Blank => blank += 1,
        }
    }
    if live > blank {
        Actor::Player
    } else {
        Actor::Dealer
    }
}

/// Classify a node-space click position as a shot at one of the avatars,
/// or `None` when it misses both hit circles (the turn does not advance).
pub fn classify_target(click: Vec2, player_center: Vec2, dealer_center: Vec2) -> Option<Actor> {
    if inside_circle(click, player_center, AVATAR_HIT_RADIUS) {
        Some(Actor::Player)
    } else if inside_circle(click, dealer_center, AVATAR_HIT_RADIUS) {
        Some(Actor::Dealer)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn state_with(chambered: RoundKind) -> RoundState {
        let mut state = RoundState::new();
        state.chambered = Some(chambered);
        state
    }

    #[test]
    fn test_roll_frequencies_approach_die_odds() {
        let mut rng = Pcg32::seed_from_u64(0xBADC0FFE);
        let mut live = 0usize;
        let mut blank = 0usize;
        let rounds = 10_000;
        for _ in 0..rounds {
            for kind in roll_round_kinds(&mut rng) {
                match kind {
                    RoundKind::Live => live += 1,
                    RoundKind::Blank => blank += 1,
                }
            }
        }
        let slots = (rounds * CARTRIDGE_CAPACITY) as f64;
        let live_frac = live as f64 / slots;
        let blank_frac = blank as f64 / slots;
        assert!((live_frac - 2.0 / 7.0).abs() < 0.01, "live {live_frac}");
        assert!((blank_frac - 3.0 / 7.0).abs() < 0.01, "blank {blank_frac}");
    }

    #[test]
    fn test_consumption_is_fifo_in_shuffled_order() {
        let mut rng = Pcg32::seed_from_u64(7);
        let mut kinds = roll_round_kinds(&mut rng);
        while kinds.len() < 3 {
            kinds = roll_round_kinds(&mut rng);
        }
        shuffle_round(&mut kinds, &mut rng);

        let mut state = RoundState::new();
        state.begin_round(&kinds);
        let mut consumed = Vec::new();
        while let Some(kind) = state.chamber_next() {
            consumed.push(kind);
            state.chambered = None;
        }
        assert_eq!(consumed, kinds);
    }

    #[test]
    fn test_live_damage_is_one_plus_stack() {
        let mut state = state_with(RoundKind::Live);
        state.damage_stack = 3;
        let outcome = fire(&mut state, Actor::Player, Actor::Dealer).unwrap();
        assert_eq!(
            outcome,
            ShotOutcome::Live {
                target: Actor::Dealer,
                damage: 4,
                winner: None,
            }
        );
        assert_eq!(state.dealer_hp, 6);
        assert_eq!(state.damage_stack, 0);
        assert_eq!(state.turn, Actor::Dealer);
    }

    #[test]
    fn test_stack_resets_regardless_of_prior_value() {
        for stack in [0u8, 1, 5, 10] {
            let mut state = state_with(RoundKind::Live);
            state.damage_stack = stack;
            fire(&mut state, Actor::Dealer, Actor::Player).unwrap();
            assert_eq!(state.damage_stack, 0);
        }
    }

    #[test]
    fn test_blank_self_shot_keeps_turn_and_grows_stack() {
        let mut state = state_with(RoundKind::Blank);
        state.turn = Actor::Player;
        let outcome = fire(&mut state, Actor::Player, Actor::Player).unwrap();
        assert_eq!(outcome, ShotOutcome::BlankSelf { stack: 1 });
        assert_eq!(state.turn, Actor::Player);

        // the stack caps at 10
        state.damage_stack = 10;
        state.chambered = Some(RoundKind::Blank);
        fire(&mut state, Actor::Player, Actor::Player).unwrap();
        assert_eq!(state.damage_stack, 10);
    }

    #[test]
    fn test_blank_at_other_transfers_turn() {
        let mut state = state_with(RoundKind::Blank);
        state.turn = Actor::Dealer;
        let outcome = fire(&mut state, Actor::Dealer, Actor::Player).unwrap();
        assert_eq!(outcome, ShotOutcome::BlankOther);
        assert_eq!(state.turn, Actor::Player);
        assert_eq!(state.damage_stack, 0);
    }

    #[test]
    fn test_live_transfers_turn_to_other_party() {
        let mut state = state_with(RoundKind::Live);
        state.turn = Actor::Player;
        fire(&mut state, Actor::Player, Actor::Player).unwrap();
        assert_eq!(state.turn, Actor::Dealer);
    }

    #[test]
    fn test_game_over_when_hp_reaches_zero() {
        let mut state = state_with(RoundKind::Live);
        state.player_hp = 1;
        let outcome = fire(&mut state, Actor::Dealer, Actor::Player).unwrap();
        assert_eq!(
            outcome,
            ShotOutcome::Live {
                target: Actor::Player,
                damage: 1,
                winner: Some(Actor::Dealer),
            }
        );
        assert!(state.game_over);
        assert_eq!(state.player_hp, 0);
    }

    #[test]
    fn test_hp_never_goes_negative() {
        let mut state = state_with(RoundKind::Live);
        state.dealer_hp = 2;
        state.damage_stack = 10;
        fire(&mut state, Actor::Player, Actor::Dealer).unwrap();
        assert_eq!(state.dealer_hp, 0);
        assert!(state.game_over);
    }

    #[test]
    fn test_fire_without_chamber_is_invariant_violation() {
        let mut state = RoundState::new();
        assert_eq!(
            fire(&mut state, Actor::Player, Actor::Dealer),
            Err(GameError::NothingChambered)
        );
    }

    #[test]
    fn test_dealer_counts_chambered_round() {
        let mut state = RoundState::new();
        state.remaining.extend([RoundKind::Blank, RoundKind::Blank]);
        state.chambered = Some(RoundKind::Live);
        // 1 live vs 2 blank: shoot self
        assert_eq!(dealer_target(&state), Actor::Dealer);

        state.remaining.clear();
        state.remaining.extend([RoundKind::Live, RoundKind::Live]);
        state.chambered = Some(RoundKind::Live);
        // 3 live vs 0 blank: shoot the player
        assert_eq!(dealer_target(&state), Actor::Player);

        state.remaining.clear();
        state.remaining.extend([RoundKind::Live, RoundKind::Blank]);
        state.chambered = None;
        // tie goes to self
        assert_eq!(dealer_target(&state), Actor::Dealer);
    }

    #[test]
    fn test_classify_target_circles() {
        let player = Vec2::new(0.0, -200.0);
        let dealer = Vec2::new(0.0, 200.0);
        assert_eq!(
            classify_target(Vec2::new(10.0, -150.0), player, dealer),
            Some(Actor::Player)
        );
        assert_eq!(
            classify_target(Vec2::new(-30.0, 230.0), player, dealer),
            Some(Actor::Dealer)
        );
        assert_eq!(classify_target(Vec2::new(500.0, 0.0), player, dealer), None);
    }

    #[test]
    fn test_previous_round_recorded_for_eject() {
        let mut state = state_with(RoundKind::Blank);
        fire(&mut state, Actor::Dealer, Actor::Player).unwrap();
        assert_eq!(state.previous, Some((RoundKind::Blank, Actor::Dealer)));
        assert_eq!(state.chambered, None);
    }
}
