use crate::character::Character;
use crate::collision::{check_collision, entity_aabb};
use crate::config::GameConfig;
use crate::particles::ParticleBurst;
use crate::popup::Popup;
use crate::props::PropManager;
use crate::score::{ScoreEvent, Scoreboard};
use crate::stack::CubeStack;
use crate::GameError;
use cubestack_assets::AssetStore;
use cubestack_common::EntityId;
use cubestack_ecs::{ComponentEvent, ComponentStore, MeshHandle};
use cubestack_input::Action;
use cubestack_kernel::{Scene, SceneEvent};
use glam::{Quat, Vec3};

/// Something that happened during a tick, for logs and UI.
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    Collected { cube: EntityId, stack: usize },
    Scored { score: u32 },
    ThresholdCrossed { score: u32 },
    Celebration,
    PopupShown,
}

/// Summary of one fixed step.
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    /// Scene tick after the step.
    pub tick: u64,
    pub collected: u32,
    pub dropped: u32,
    pub score: u32,
    pub events: Vec<GameEvent>,
    /// Scene mutations recorded during the step.
    pub scene_events: usize,
}

/// Every scene and component mutation since the game was built. Replaying
/// it must land on the live game's state.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    seed: u64,
    scene: Vec<SceneEvent>,
    components: Vec<ComponentEvent>,
}

impl Journal {
    pub fn scene_events(&self) -> &[SceneEvent] {
        &self.scene
    }

    pub fn component_events(&self) -> &[ComponentEvent] {
        &self.components
    }

    pub fn len(&self) -> usize {
        self.scene.len() + self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scene.is_empty() && self.components.is_empty()
    }

    /// Rebuild the scene and components from the recorded events alone.
    pub fn replay(&self) -> (Scene, ComponentStore) {
        let scene = Scene::replay_seeded(self.seed, &self.scene);
        let mut components = ComponentStore::new();
        for event in &self.components {
            components.apply_event(event);
        }
        (scene, components)
    }
}

/// The whole game: scene, components, props and rules, advanced one fixed
/// tick at a time.
pub struct Game {
    config: GameConfig,
    scene: Scene,
    components: ComponentStore,
    assets: AssetStore,
    character: Character,
    stack: CubeStack,
    props: PropManager,
    score: Scoreboard,
    paused: bool,
    journal: Option<Journal>,
}

impl Game {
    pub fn new(config: GameConfig) -> Result<Self, GameError> {
        Self::build(config, false)
    }

    /// Like [`Game::new`], but keeps a [`Journal`] of every mutation so the
    /// run can be replayed. The journal grows with every tick.
    pub fn recording(config: GameConfig) -> Result<Self, GameError> {
        Self::build(config, true)
    }

    fn build(config: GameConfig, record: bool) -> Result<Self, GameError> {
        config.validate()?;
        let mut scene = Scene::with_seed(config.seed);
        let mut components = ComponentStore::new();
        let mut assets = AssetStore::new();
        let mesh = MeshHandle(assets.register_default_cube().0);

        let character = Character::spawn(
            &mut scene,
            &mut components,
            &mut assets,
            mesh,
            &config.character,
        )?;

        let mut props = PropManager::new(&config, mesh);
        let g = &config.grid;
        props.create_cubes_in_grid(
            &mut scene,
            &mut components,
            &mut assets,
            g.rows,
            g.columns,
            g.start_x,
            g.start_z,
            g.spacing,
        );
        props.create_drop_zone(&mut scene, &mut components, &mut assets);
        props.load_house_model(&mut scene, &mut components, &mut assets)?;

        let scene_events = scene.drain_events();
        let component_events = components.drain_events();
        let journal = record.then(|| Journal {
            seed: config.seed,
            scene: scene_events,
            components: component_events,
        });

        let stack = CubeStack::new(config.stack.clone(), config.character.start);
        let score = Scoreboard::new(config.score.house_threshold);
        tracing::info!(
            seed = config.seed,
            collectibles = props.collectible_count(),
            entities = scene.entity_count(),
            "game ready"
        );
        Ok(Self {
            config,
            scene,
            components,
            assets,
            character,
            stack,
            props,
            score,
            paused: false,
            journal,
        })
    }

    /// Throw the current round away and build a fresh one from the same config.
    pub fn restart(&mut self) -> Result<(), GameError> {
        *self = Self::build(self.config.clone(), self.journal.is_some())?;
        tracing::info!("game restarted");
        Ok(())
    }

    pub fn dismiss_popup(&mut self) {
        self.props.dismiss_popup();
    }

    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
        tracing::info!(paused = self.paused, "pause toggled");
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Apply a discrete action. Movement is not an action here; it is the
    /// intent passed to [`Game::tick`].
    pub fn apply_action(&mut self, action: &Action) -> Result<(), GameError> {
        match action {
            Action::Restart => self.restart()?,
            Action::TogglePause => self.toggle_pause(),
            Action::DismissPopup => self.dismiss_popup(),
            Action::Move(_) | Action::ToggleInspector | Action::Noop => {}
        }
        Ok(())
    }

    /// Advance one fixed step with the given walking intent. A paused game
    /// returns an empty report and does not move.
    pub fn tick(&mut self, intent: Vec3) -> Result<TickReport, GameError> {
        let span = tracing::info_span!("tick", tick = self.scene.tick());
        let _guard = span.enter();

        let mut report = TickReport {
            tick: self.scene.tick(),
            score: self.score.score(),
            ..TickReport::default()
        };
        if self.paused {
            return Ok(report);
        }
        let dt = self.config.tick_seconds();
        let intent = Vec3::new(intent.x, 0.0, intent.z).normalize_or_zero();
        let is_idle = intent == Vec3::ZERO;

        let position = self.character.advance(&mut self.scene, intent, dt)?;
        self.stack.update_velocity(position);
        let rotation = self.character.rotation(&self.scene);
        self.stack.update(&mut self.scene, rotation, is_idle)?;

        self.collect_touching(&mut report)?;
        self.deliver(dt, &mut report);

        self.props.update_cubes_rotation(&mut self.scene);
        if self.props.update_house_scale(&mut self.scene, dt) {
            self.props.play_particle_effect();
            self.props.show_popup();
            report.events.push(GameEvent::Celebration);
        }
        if self.props.advance_effects(dt) {
            report.events.push(GameEvent::PopupShown);
        }

        self.scene.step();
        report.tick = self.scene.tick();
        report.score = self.score.score();
        let scene_events = self.scene.drain_events();
        let component_events = self.components.drain_events();
        report.scene_events = scene_events.len();
        if let Some(journal) = &mut self.journal {
            journal.scene.extend(scene_events);
            journal.components.extend(component_events);
        }
        Ok(report)
    }

    fn collect_touching(&mut self, report: &mut TickReport) -> Result<(), GameError> {
        let body = self.character.body();
        let body_aabb = entity_aabb(&self.scene, &self.components, body)
            .ok_or(GameError::MissingEntity(body))?;
        for id in self.props.candidates(&body_aabb) {
            let touching = entity_aabb(&self.scene, &self.components, id)
                .is_some_and(|aabb| aabb.intersects(&body_aabb));
            if !touching {
                continue;
            }
            self.props.remove_collectible(id);
            let cube = self.stack.collect(
                &mut self.scene,
                &mut self.components,
                self.character.root(),
                id,
            )?;
            report.collected += 1;
            report.events.push(GameEvent::Collected {
                cube,
                stack: self.stack.len(),
            });
        }
        Ok(())
    }

    fn deliver(&mut self, dt: f32, report: &mut TickReport) {
        let in_zone = self.props.drop_zone().is_some_and(|zone| {
            check_collision(&self.scene, &self.components, self.character.body(), zone)
        });
        self.stack.update_drop_zone_status(in_zone);
        let dropped = self
            .stack
            .advance_drops(&mut self.scene, &mut self.components, dt);
        for _ in 0..dropped {
            let crossed = self.score.increment();
            report.events.push(GameEvent::Scored {
                score: self.score.score(),
            });
            if let Some(ScoreEvent::ThresholdCrossed { score }) = crossed {
                if self.props.house_target() == 0.0 {
                    self.props.set_house_target(1.0);
                }
                report.events.push(GameEvent::ThresholdCrossed { score });
            }
        }
        report.dropped = dropped;
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn components(&self) -> &ComponentStore {
        &self.components
    }

    pub fn assets(&self) -> &AssetStore {
        &self.assets
    }

    pub fn score(&self) -> u32 {
        self.score.score()
    }

    /// HUD text for the score readout.
    pub fn score_label(&self) -> String {
        self.score.label()
    }

    pub fn stack_len(&self) -> usize {
        self.stack.len()
    }

    pub fn stack(&self) -> &CubeStack {
        &self.stack
    }

    pub fn house_scale(&self) -> f32 {
        self.props.house_scale()
    }

    pub fn has_celebrated(&self) -> bool {
        self.props.has_celebrated()
    }

    pub fn particles(&self) -> Option<&ParticleBurst> {
        self.props.particles()
    }

    pub fn popup(&self) -> &Popup {
        self.props.popup()
    }

    pub fn character_position(&self) -> Vec3 {
        self.character.position(&self.scene)
    }

    pub fn character_facing(&self) -> Quat {
        self.character.rotation(&self.scene)
    }

    pub fn in_drop_zone(&self) -> bool {
        self.stack.in_drop_zone()
    }

    pub fn drop_zone_center(&self) -> Vec3 {
        self.props.drop_zone_center()
    }

    /// Remaining collectibles in creation order.
    pub fn collectibles(&self) -> Vec<EntityId> {
        self.props.collectibles()
    }

    pub fn collectibles_remaining(&self) -> usize {
        self.props.collectible_count()
    }

    pub fn journal(&self) -> Option<&Journal> {
        self.journal.as_ref()
    }

    /// Replay the journal and compare against the live scene and components.
    /// `None` when the game is not recording.
    pub fn replay_matches(&self) -> Option<bool> {
        let (scene, components) = self.journal.as_ref()?.replay();
        Some(
            scene.state_hash() == self.scene.state_hash()
                && components.content_eq(&self.components),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autopilot::Autopilot;

    fn small_config() -> GameConfig {
        let mut config = GameConfig::default();
        config.grid.rows = 3;
        config.grid.columns = 3;
        config.grid.start_x = -3.0;
        config.grid.start_z = 0.0;
        config.score.house_threshold = 5;
        config
    }

    #[test]
    fn new_game_builds_the_scene() {
        let game = Game::new(GameConfig::default()).unwrap();
        assert_eq!(game.collectibles_remaining(), 144);
        assert_eq!(game.score(), 0);
        assert_eq!(game.score_label(), "Score: 0");
        assert_eq!(game.house_scale(), 0.0);
        assert_eq!(game.character_position(), Vec3::new(0.0, 0.0, 24.0));
        assert_eq!(game.components().named("dropZone").len(), 1);
        assert_eq!(game.components().named("collectible").len(), 144);
        assert!(game.scene().events().is_empty());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = GameConfig::default();
        config.grid.columns = 0;
        assert!(matches!(Game::new(config), Err(GameError::Config(_))));
    }

    #[test]
    fn walking_into_a_cube_collects_it() {
        let mut config = small_config();
        config.character.start = Vec3::new(0.0, 0.0, 10.0);
        let mut game = Game::new(config).unwrap();

        let mut collected = 0;
        for _ in 0..60 {
            collected += game.tick(Vec3::NEG_Z).unwrap().collected;
        }
        assert!(collected >= 1);
        assert_eq!(game.stack_len() as u32, collected);
        assert_eq!(game.collectibles_remaining(), 9 - collected as usize);
        assert_eq!(
            game.components().named("stackCube").len(),
            game.stack_len()
        );
    }

    #[test]
    fn idle_tick_only_spins_and_steps() {
        let mut game = Game::new(small_config()).unwrap();
        let before = game.character_position();
        let report = game.tick(Vec3::ZERO).unwrap();
        assert_eq!(report.tick, 1);
        assert_eq!(report.collected, 0);
        assert_eq!(report.dropped, 0);
        assert_eq!(game.character_position(), before);
        assert!(report.scene_events >= 9);
    }

    #[test]
    fn paused_game_does_not_advance() {
        let mut game = Game::new(small_config()).unwrap();
        game.apply_action(&Action::TogglePause).unwrap();
        let report = game.tick(Vec3::NEG_Z).unwrap();
        assert_eq!(report.tick, 0);
        assert_eq!(game.character_position(), Vec3::new(0.0, 0.0, 24.0));
        game.apply_action(&Action::TogglePause).unwrap();
        assert_eq!(game.tick(Vec3::NEG_Z).unwrap().tick, 1);
    }

    #[test]
    fn restart_resets_progress() {
        let mut game = Game::new(small_config()).unwrap();
        for _ in 0..120 {
            game.tick(Vec3::NEG_Z).unwrap();
        }
        game.apply_action(&Action::Restart).unwrap();
        assert_eq!(game.scene().tick(), 0);
        assert_eq!(game.stack_len(), 0);
        assert_eq!(game.collectibles_remaining(), 9);
        assert_eq!(game.character_position(), Vec3::new(0.0, 0.0, 24.0));
    }

    #[test]
    fn plain_game_keeps_no_journal() {
        let mut game = Game::new(small_config()).unwrap();
        game.tick(Vec3::NEG_Z).unwrap();
        assert!(game.journal().is_none());
        assert_eq!(game.replay_matches(), None);
    }

    #[test]
    fn journal_replays_to_the_live_state() {
        let mut game = Game::recording(small_config()).unwrap();
        assert_eq!(game.replay_matches(), Some(true));

        let mut pilot = Autopilot::new(3);
        for _ in 0..900 {
            let intent = pilot.steer(&game);
            game.tick(intent).unwrap();
        }
        let journal = game.journal().unwrap();
        assert!(journal.scene_events().len() > 900);
        let (scene, components) = journal.replay();
        assert_eq!(scene.entity_count(), game.scene().entity_count());
        assert_eq!(scene.tick(), 900);
        assert_eq!(scene.state_hash(), game.scene().state_hash());
        assert!(components.content_eq(game.components()));
        assert_eq!(game.replay_matches(), Some(true));
    }

    #[test]
    fn restart_keeps_recording_with_a_fresh_journal() {
        let mut game = Game::recording(small_config()).unwrap();
        for _ in 0..30 {
            game.tick(Vec3::NEG_Z).unwrap();
        }
        game.restart().unwrap();
        let journal = game.journal().unwrap();
        assert!(journal
            .scene_events()
            .iter()
            .all(|e| !matches!(e, SceneEvent::Stepped { .. })));
        assert_eq!(game.replay_matches(), Some(true));
    }

    #[test]
    fn autopilot_builds_the_house() {
        let mut game = Game::new(small_config()).unwrap();
        let mut pilot = Autopilot::new(3);

        let mut events = Vec::new();
        for _ in 0..20_000 {
            let intent = pilot.steer(&game);
            let report = game.tick(intent).unwrap();
            events.extend(report.events);
            if game.popup().is_visible() {
                break;
            }
        }

        assert!(game.popup().is_visible(), "popup never appeared");
        assert!(game.score() > 5);
        assert!(game.house_scale() >= 0.8);
        let crossings = events
            .iter()
            .filter(|e| matches!(e, GameEvent::ThresholdCrossed { .. }))
            .count();
        let celebrations = events
            .iter()
            .filter(|e| matches!(e, GameEvent::Celebration))
            .count();
        assert_eq!(crossings, 1);
        assert_eq!(celebrations, 1);
        let scored = events
            .iter()
            .filter(|e| matches!(e, GameEvent::Scored { .. }))
            .count() as u32;
        assert_eq!(scored, game.score());
    }

    #[test]
    fn same_seed_same_layout() {
        let run = || {
            let mut game = Game::new(small_config()).unwrap();
            let mut pilot = Autopilot::new(2);
            for _ in 0..900 {
                let intent = pilot.steer(&game);
                game.tick(intent).unwrap();
            }
            (game.scene().layout_hash(), game.score(), game.stack_len())
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn dismissing_popup_hides_it() {
        let mut game = Game::new(small_config()).unwrap();
        game.props.play_particle_effect();
        game.props.show_popup();
        for _ in 0..90 {
            game.tick(Vec3::ZERO).unwrap();
        }
        assert!(game.popup().is_visible());
        game.apply_action(&Action::DismissPopup).unwrap();
        assert!(!game.popup().is_visible());
    }
}
