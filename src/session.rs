//! The game session
//!
//! One async sequence drives an entire duel: round draw, tray preview,
//! loading, aiming, firing and the end-of-game banner. A single advisory
//! `busy` flag serializes the gameplay animations; player clicks arriving
//! while it is set are drained and ignored. Decorative particle bursts run
//! outside the flag.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use glam::Vec2;
use rand_pcg::Pcg32;

use crate::anim::{Animator, Direction, Easing, TweenTarget, sleep_ms};
use crate::assets::{self, AssetStore};
use crate::consts::{DEPTH_BANNER, DEPTH_FLASH, DEPTH_SHELL};
use crate::game::{
    Actor, RoundKind, RoundState, ShotOutcome, classify_target, dealer_target, fire,
    roll_round_kinds,
};
use crate::particles::{BurstConfig, ParticleBurst};
use crate::scene::{
    Drawable, MosaicSprite, NodeConfig, NodeId, RectShape, Rgb, Scene, TextLabel,
};
use crate::settings::Settings;
use crate::stage::{ActorRig, DamageCounter, GunRig, HpBar, build_background, build_table};
use crate::tray::CartridgeTray;

/// Tray preview hold before concealment
const PREVIEW_MS: f32 = 1500.0;
/// Shell flight from tray slot into the chamber
const LOAD_MS: f32 = 350.0;
const LOAD_STEPS: u32 = 20;
/// Dealer "thinking" pause before it picks a target
const DEALER_THINK_MS: f32 = 500.0;
/// Degrees per aim rotation step
const AIM_STEP_DEG: f32 = 12.0;
/// Gun rotation when aiming at each party
const AIM_AT_PLAYER_DEG: f32 = 180.0;
const AIM_AT_DEALER_DEG: f32 = 0.0;
/// Input poll interval while awaiting a click
const POLL_MS: f64 = 16.0;

/// Replay prompt button geometry, in world coordinates
const REPLAY_BUTTON_SIZE: Vec2 = Vec2::new(220.0, 70.0);
const REPLAY_YES_AT: Vec2 = Vec2::new(-160.0, -200.0);
const REPLAY_NO_AT: Vec2 = Vec2::new(160.0, -200.0);

/// The player's answer to the post-game prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayChoice {
    Again,
    Quit,
}

fn inside_button(click: Vec2, center: Vec2) -> bool {
    (click.x - center.x).abs() <= REPLAY_BUTTON_SIZE.x / 2.0
        && (click.y - center.y).abs() <= REPLAY_BUTTON_SIZE.y / 2.0
}

/// Classify a world-space click against the replay prompt buttons. Clicks
/// outside both are ignored; the prompt stays up.
pub fn classify_replay(click: Vec2) -> Option<ReplayChoice> {
    if inside_button(click, REPLAY_YES_AT) {
        Some(ReplayChoice::Again)
    } else if inside_button(click, REPLAY_NO_AT) {
        Some(ReplayChoice::Quit)
    } else {
        None
    }
}

/// World-space click positions pushed by the platform layer and drained by
/// the session. Clone shares the underlying queue.
#[derive(Clone, Default)]
pub struct ClickQueue(Rc<RefCell<VecDeque<Vec2>>>);

impl ClickQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, at: Vec2) {
        self.0.borrow_mut().push_back(at);
    }

    pub fn take(&self) -> Option<Vec2> {
        self.0.borrow_mut().pop_front()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

/// Everything spawned into the scene for one duel
struct StageRig {
    player: ActorRig,
    dealer: ActorRig,
    gun: GunRig,
    player_hp: HpBar,
    dealer_hp: HpBar,
    damage: DamageCounter,
    tray: CartridgeTray,
}

impl StageRig {
    fn build(scene: &mut Scene, assets: &mut AssetStore) -> Self {
        build_background(scene, assets);
        build_table(scene);
        let player = ActorRig::build(scene, assets, Actor::Player);
        let dealer = ActorRig::build(scene, assets, Actor::Dealer);
        let gun = GunRig::build(scene, assets);
        let player_hp = HpBar::build(scene, Actor::Player);
        let dealer_hp = HpBar::build(scene, Actor::Dealer);
        let damage = DamageCounter::build(scene);
        let root = scene.root();
        let tray = CartridgeTray::build(scene, root);
        Self {
            player,
            dealer,
            gun,
            player_hp,
            dealer_hp,
            damage,
            tray,
        }
    }

    fn rig(&self, actor: Actor) -> &ActorRig {
        match actor {
            Actor::Player => &self.player,
            Actor::Dealer => &self.dealer,
        }
    }
}

/// Drives one full duel over a shared scene
pub struct GameSession {
    scene: Rc<RefCell<Scene>>,
    assets: Rc<RefCell<AssetStore>>,
    animator: Animator,
    clicks: ClickQueue,
    rng: Pcg32,
    state: RoundState,
    rig: StageRig,
    particles_enabled: bool,
    reduced_motion: bool,
}

impl GameSession {
    pub fn new(
        scene: Rc<RefCell<Scene>>,
        assets: Rc<RefCell<AssetStore>>,
        clicks: ClickQueue,
        settings: &Settings,
        rng: Pcg32,
    ) -> Self {
        let rig = StageRig::build(&mut scene.borrow_mut(), &mut assets.borrow_mut());
        let animator = Animator::new(scene.clone());
        animator.set_speed(settings.speed);
        Self {
            scene,
            assets,
            animator,
            clicks,
            rng,
            state: RoundState::new(),
            rig,
            particles_enabled: settings.particles,
            reduced_motion: settings.reduced_motion,
        }
    }

    pub fn state(&self) -> &RoundState {
        &self.state
    }

    pub fn animator(&self) -> &Animator {
        &self.animator
    }

    /// Tear the stage down and rebuild it for a fresh duel
    pub fn reset(&mut self) {
        {
            let mut scene = self.scene.borrow_mut();
            let root = scene.root();
            scene.clear_children(root);
            self.rig = StageRig::build(&mut scene, &mut self.assets.borrow_mut());
        }
        self.state = RoundState::new();
        self.clicks.clear();
    }

    /// Draw, preview, conceal and shuffle a fresh tray of cartridges. A draw
    /// can come up entirely empty; redraw until it does not.
    async fn start_new_round(&mut self) {
        let kinds = loop {
            let kinds = roll_round_kinds(&mut self.rng);
            if !kinds.is_empty() {
                break kinds;
            }
        };
        {
            let mut scene = self.scene.borrow_mut();
            let mut assets = self.assets.borrow_mut();
            // capacity bounds the roll, so the preview cannot overflow
            if let Err(err) = self.rig.tray.show_preview(&mut scene, &mut assets, &kinds) {
                log::error!("tray preview rejected: {err}");
                return;
            }
        }
        self.animator.pause_ms(PREVIEW_MS).await;
        {
            let mut scene = self.scene.borrow_mut();
            let mut assets = self.assets.borrow_mut();
            self.rig
                .tray
                .conceal_and_shuffle(&mut scene, &mut assets, &mut self.rng);
            let order = self.rig.tray.remaining_kinds();
            self.state.begin_round(&order);
        }
        log::info!("new round: {} cartridges", self.state.remaining.len());
    }

    /// Eject the previously fired shell, then fly the leftmost tray shell
    /// into the chamber.
    async fn preload_next_shell(&mut self) {
        if let Some((kind, _shooter)) = self.state.previous.take() {
            self.eject_shell(kind).await;
        }
        let taken = {
            let mut scene = self.scene.borrow_mut();
            self.rig.tray.take_leftmost(&mut scene)
        };
        let Some((tray_kind, from)) = taken else {
            return;
        };
        let chambered = self.state.chamber_next();
        debug_assert_eq!(chambered, Some(tray_kind));

        let (shell, to) = {
            let mut scene = self.scene.borrow_mut();
            let blocks = self
                .assets
                .borrow_mut()
                .mosaic(assets::SHELL_CONCEALED, assets::params::shell_icon());
            let root = scene.root();
            let shell = scene.spawn_child(
                root,
                NodeConfig::new()
                    .at(from.x, from.y)
                    .depth(DEPTH_SHELL)
                    .drawable(Drawable::Mosaic(MosaicSprite { blocks })),
            );
            let to = self.rig.gun.muzzle_world(&scene);
            (shell, to)
        };
        self.animator
            .move_to(shell, to, LOAD_MS, LOAD_STEPS, Easing::OutQuad)
            .await;
        self.scene.borrow_mut().despawn(shell);
    }

    /// Tumble the spent shell off the table
    async fn eject_shell(&mut self, kind: RoundKind) {
        let asset = match kind {
            RoundKind::Live => assets::SHELL_LIVE_FIRED,
            RoundKind::Blank => assets::SHELL_BLANK,
        };
        let shell = {
            let mut scene = self.scene.borrow_mut();
            let at = self.rig.gun.muzzle_world(&scene);
            let blocks = self
                .assets
                .borrow_mut()
                .mosaic(asset, assets::params::ejected_shell());
            let root = scene.root();
            scene.spawn_child(
                root,
                NodeConfig::new()
                    .at(at.x, at.y)
                    .depth(DEPTH_SHELL)
                    .drawable(Drawable::Mosaic(MosaicSprite { blocks })),
            )
        };
        self.animator
            .tween(
                shell,
                TweenTarget {
                    x: Some(260.0),
                    y: Some(-40.0),
                    rotation: Some(160.0),
                    scale: None,
                },
                300.0,
                Easing::OutQuad,
            )
            .await;
        self.scene.borrow_mut().despawn(shell);
    }

    fn aim_angle(target: Actor) -> f32 {
        match target {
            Actor::Player => AIM_AT_PLAYER_DEG,
            Actor::Dealer => AIM_AT_DEALER_DEG,
        }
    }

    /// Two-frame muzzle flash in the gun's local space, past the barrel
    async fn muzzle_flash(&mut self) {
        let frames = [
            (assets::FIRE_NEAR, 24.0f32, 240.0f32),
            (assets::FIRE_FAR, 8.0, 250.0),
        ];
        let mut spawned: Option<NodeId> = None;
        for (asset, size, reach) in frames {
            {
                let mut scene = self.scene.borrow_mut();
                if let Some(old) = spawned.take() {
                    scene.despawn(old);
                }
                let blocks = self
                    .assets
                    .borrow_mut()
                    .mosaic(asset, assets::params::muzzle_flash(size));
                let flash = scene.spawn_child(
                    self.rig.gun.layer,
                    NodeConfig::new()
                        .at(0.0, reach)
                        .depth(DEPTH_FLASH)
                        .drawable(Drawable::Mosaic(MosaicSprite { blocks })),
                );
                spawned = Some(flash);
            }
            self.animator.pause_ms(50.0).await;
        }
        if let Some(flash) = spawned {
            self.scene.borrow_mut().despawn(flash);
        }
    }

    /// Shake, knockback and HP drain on the struck party
    async fn hit_reaction(&mut self, target: Actor, hp_after: u8) {
        let layer = self.rig.rig(target).layer;
        let away = match target {
            Actor::Player => Direction::Down,
            Actor::Dealer => Direction::Up,
        };
        if !self.reduced_motion {
            self.animator.shake(layer, 10.0, 250.0, 40.0).await;
            self.animator.knockback(layer, away, 40.0, 250.0, 18).await;
        }
        let bar = match target {
            Actor::Player => &mut self.rig.player_hp,
            Actor::Dealer => &mut self.rig.dealer_hp,
        };
        bar.set(&self.animator, hp_after).await;
    }

    /// The full firing sequence for one shot. Sets the busy flag for the
    /// duration; the caller has already validated the target.
    async fn resolve_shot(&mut self, shooter: Actor, target: Actor) {
        self.state.busy = true;
        {
            let mut scene = self.scene.borrow_mut();
            self.rig.rig(shooter).set_hand_visible(&mut scene, false);
            self.rig.gun.set_held(&mut scene, true);
        }
        self.animator
            .rotate_to(self.rig.gun.layer, Self::aim_angle(target), 220.0, AIM_STEP_DEG)
            .await;

        let outcome = match fire(&mut self.state, shooter, target) {
            Ok(outcome) => outcome,
            Err(err) => {
                log::error!("fire rejected: {err}");
                self.state.busy = false;
                return;
            }
        };

        // recoil nudge opposite the muzzle
        let recoil = match target {
            Actor::Player => Direction::Up,
            Actor::Dealer => Direction::Down,
        };
        match outcome {
            ShotOutcome::Live { target, winner, .. } => {
                self.muzzle_flash().await;
                self.animator
                    .knockback(self.rig.gun.layer, recoil, 18.0, 100.0, 6)
                    .await;
                let hp_after = self.state.hp(target);
                self.hit_reaction(target, hp_after).await;
                self.rig
                    .damage
                    .set_stack(&mut self.scene.borrow_mut(), self.state.damage_stack);
                if winner.is_some() {
                    // leave the gun aimed; the death motion follows
                    self.state.busy = false;
                    return;
                }
            }
            ShotOutcome::BlankSelf { stack } => {
                self.animator
                    .knockback(self.rig.gun.layer, recoil, 8.0, 100.0, 6)
                    .await;
                self.rig
                    .damage
                    .set_stack(&mut self.scene.borrow_mut(), stack);
                self.rig.damage.pulse(&self.animator, stack).await;
            }
            ShotOutcome::BlankOther => {
                self.animator
                    .knockback(self.rig.gun.layer, recoil, 8.0, 100.0, 6)
                    .await;
            }
        }

        self.animator
            .rotate_to(self.rig.gun.layer, AIM_AT_DEALER_DEG, 220.0, AIM_STEP_DEG)
            .await;
        {
            let mut scene = self.scene.borrow_mut();
            self.rig.gun.set_held(&mut scene, false);
            self.rig.rig(shooter).set_hand_visible(&mut scene, true);
        }
        self.state.busy = false;
    }

    /// Await a qualifying click on either avatar. Clicks landing outside
    /// both hit circles, or while busy, are discarded without advancing the
    /// turn.
    async fn player_turn(&mut self) {
        self.clicks.clear();
        let target = 'found: loop {
            while let Some(click) = self.clicks.take() {
                if self.state.busy {
                    continue;
                }
                let (player_c, dealer_c) = {
                    let scene = self.scene.borrow();
                    (
                        self.rig.player.face_center(&scene),
                        self.rig.dealer.face_center(&scene),
                    )
                };
                if let Some(target) = classify_target(click, player_c, dealer_c) {
                    if self.particles_enabled {
                        let burst = ParticleBurst::spawn(
                            &mut self.scene.borrow_mut(),
                            &BurstConfig::pick_flash(click),
                            &mut self.rng,
                        );
                        spawn_detached(burst.run(self.scene.clone()));
                    }
                    break 'found target;
                }
            }
            sleep_ms(POLL_MS).await;

            // native builds have no input source; fall back to the policy
            #[cfg(not(target_arch = "wasm32"))]
            break 'found dealer_target(&self.state);
        };
        self.resolve_shot(Actor::Player, target).await;
    }

    async fn dealer_turn(&mut self) {
        self.animator.pause_ms(DEALER_THINK_MS).await;
        let target = dealer_target(&self.state);
        self.resolve_shot(Actor::Dealer, target).await;
    }

    /// Loser keels over
    async fn death_motion(&mut self, loser: Actor) {
        let layer = self.rig.rig(loser).layer;
        self.animator.rotate_to(layer, 90.0, 800.0, 3.0).await;
    }

    fn show_banner(&mut self, winner: Actor) {
        let asset = match winner {
            Actor::Player => assets::BANNER_WIN,
            Actor::Dealer => assets::BANNER_LOSE,
        };
        let mut scene = self.scene.borrow_mut();
        let blocks = self
            .assets
            .borrow_mut()
            .mosaic(asset, assets::params::banner());
        let root = scene.root();
        scene.spawn_child(
            root,
            NodeConfig::new()
                .depth(DEPTH_BANNER)
                .drawable(Drawable::Mosaic(MosaicSprite { blocks })),
        );
    }

    /// Play one duel to completion and return the winner
    pub async fn run(&mut self) -> Actor {
        while !self.state.game_over {
            if self.state.chambered.is_none() {
                if self.state.remaining.is_empty() && self.rig.tray.is_empty() {
                    self.start_new_round().await;
                }
                self.preload_next_shell().await;
                if self.state.chambered.is_none() {
                    // an all-void draw slipped through; draw again
                    continue;
                }
            }
            match self.state.turn {
                Actor::Player => self.player_turn().await,
                Actor::Dealer => self.dealer_turn().await,
            }
        }
        let winner = match (self.state.player_hp, self.state.dealer_hp) {
            (0, _) => Actor::Dealer,
            _ => Actor::Player,
        };
        self.death_motion(winner.other()).await;
        self.show_banner(winner);
        log::info!("duel over, winner: {winner:?}");
        winner
    }

    fn replay_button(
        scene: &mut Scene,
        at: Vec2,
        label: &str,
        fill: Rgb,
        stroke: Rgb,
    ) -> NodeId {
        let root = scene.root();
        let button = scene.spawn_child(
            root,
            NodeConfig::new()
                .at(at.x, at.y)
                .depth(DEPTH_BANNER)
                .drawable(Drawable::Rect(
                    RectShape::filled(REPLAY_BUTTON_SIZE.x, REPLAY_BUTTON_SIZE.y, fill)
                        .bordered(stroke, 4.0),
                )),
        );
        scene.spawn_child(
            button,
            NodeConfig::new()
                .at(0.0, -10.0)
                .depth(DEPTH_BANNER)
                .drawable(Drawable::Text(TextLabel::new(
                    label,
                    30.0,
                    Rgb(235, 235, 235),
                ))),
        );
        button
    }

    fn show_replay_prompt(&mut self) {
        let mut scene = self.scene.borrow_mut();
        Self::replay_button(
            &mut scene,
            REPLAY_YES_AT,
            "AGAIN",
            Rgb(30, 80, 45),
            Rgb(80, 200, 120),
        );
        Self::replay_button(
            &mut scene,
            REPLAY_NO_AT,
            "QUIT",
            Rgb(80, 35, 35),
            Rgb(200, 90, 90),
        );
    }

    /// Post-game yes/no prompt: "again" hands control back for a reset,
    /// "quit" ends the session. Clicks outside both buttons are ignored.
    pub async fn offer_replay(&mut self) -> ReplayChoice {
        self.show_replay_prompt();
        self.clicks.clear();
        loop {
            while let Some(click) = self.clicks.take() {
                if let Some(choice) = classify_replay(click) {
                    return choice;
                }
            }
            sleep_ms(POLL_MS).await;
            // headless builds have no input source; decline and finish
            #[cfg(not(target_arch = "wasm32"))]
            return ReplayChoice::Quit;
        }
    }
}

/// Fire-and-forget a decorative future. Real concurrency on wasm; on native
/// the future completes inline, which the tests rely on.
fn spawn_detached(fut: impl std::future::Future<Output = ()> + 'static) {
    #[cfg(target_arch = "wasm32")]
    wasm_bindgen_futures::spawn_local(fut);
    #[cfg(not(target_arch = "wasm32"))]
    pollster::block_on(fut);
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn session(seed: u64) -> GameSession {
        let scene = Rc::new(RefCell::new(Scene::new()));
        let assets = Rc::new(RefCell::new(AssetStore::new()));
        GameSession::new(
            scene,
            assets,
            ClickQueue::new(),
            &Settings::default(),
            Pcg32::seed_from_u64(seed),
        )
    }

    #[test]
    fn test_full_duel_terminates_with_a_winner() {
        // native turns resolve instantly, so a whole duel runs synchronously
        for seed in [1u64, 2, 3, 42, 0xDEAD] {
            let mut s = session(seed);
            let winner = pollster::block_on(s.run());
            assert!(s.state().game_over);
            assert_eq!(s.state().hp(winner.other()), 0);
            assert!(s.state().hp(winner) > 0);
        }
    }

    #[test]
    fn test_reset_restores_fresh_state() {
        let mut s = session(7);
        pollster::block_on(s.run());
        s.reset();
        assert!(!s.state().game_over);
        assert_eq!(s.state().player_hp, crate::consts::HP_MAX);
        assert_eq!(s.state().dealer_hp, crate::consts::HP_MAX);
        assert_eq!(s.state().turn, Actor::Player);
        assert!(s.state().remaining.is_empty());
    }

    #[test]
    fn test_busy_cleared_after_each_shot() {
        let mut s = session(11);
        pollster::block_on(s.run());
        assert!(!s.state().busy);
    }

    #[test]
    fn test_replay_click_classification() {
        assert_eq!(classify_replay(REPLAY_YES_AT), Some(ReplayChoice::Again));
        assert_eq!(classify_replay(REPLAY_NO_AT), Some(ReplayChoice::Quit));
        // just inside the yes button's corner
        let corner = REPLAY_YES_AT + REPLAY_BUTTON_SIZE / 2.0 - Vec2::splat(1.0);
        assert_eq!(classify_replay(corner), Some(ReplayChoice::Again));
        // between the buttons and far away: no decision, prompt stays up
        assert_eq!(classify_replay(Vec2::new(0.0, -200.0)), None);
        assert_eq!(classify_replay(Vec2::ZERO), None);
    }

    #[test]
    fn test_offer_replay_declines_without_input() {
        let mut s = session(5);
        pollster::block_on(s.run());
        let before = s.scene.borrow().get(s.scene.borrow().root()).unwrap().children().len();
        let choice = pollster::block_on(s.offer_replay());
        assert_eq!(choice, ReplayChoice::Quit);
        // the prompt buttons were added to the stage
        let after = s.scene.borrow().get(s.scene.borrow().root()).unwrap().children().len();
        assert_eq!(after, before + 2);
    }

    #[test]
    fn test_click_queue_is_fifo_and_shared() {
        let q = ClickQueue::new();
        let q2 = q.clone();
        q.push(Vec2::new(1.0, 2.0));
        q2.push(Vec2::new(3.0, 4.0));
        assert_eq!(q2.take(), Some(Vec2::new(1.0, 2.0)));
        assert_eq!(q.take(), Some(Vec2::new(3.0, 4.0)));
        assert_eq!(q.take(), None);
    }
}
