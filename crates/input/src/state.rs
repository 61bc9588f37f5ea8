use crate::Action;
use glam::Vec3;

/// A held movement direction. Forward walks toward -Z, away from the default camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Forward,
    Back,
    Left,
    Right,
}

impl Direction {
    fn vector(self) -> Vec3 {
        match self {
            Self::Forward => Vec3::NEG_Z,
            Self::Back => Vec3::Z,
            Self::Left => Vec3::NEG_X,
            Self::Right => Vec3::X,
        }
    }

    fn bit(self) -> u8 {
        match self {
            Self::Forward => 1,
            Self::Back => 2,
            Self::Left => 4,
            Self::Right => 8,
        }
    }
}

/// Tracks held directions and queues discrete actions between ticks.
#[derive(Debug, Default)]
pub struct InputState {
    held: u8,
    pending: Vec<Action>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_direction(&mut self, direction: Direction, pressed: bool) {
        if pressed {
            self.held |= direction.bit();
        } else {
            self.held &= !direction.bit();
        }
    }

    pub fn is_held(&self, direction: Direction) -> bool {
        self.held & direction.bit() != 0
    }

    /// Release every held direction (window focus lost, game restarted).
    pub fn clear(&mut self) {
        self.held = 0;
    }

    /// Unit-length walking direction, or zero when nothing (or only opposing
    /// keys) is held.
    pub fn move_intent(&self) -> Vec3 {
        let sum: Vec3 = [
            Direction::Forward,
            Direction::Back,
            Direction::Left,
            Direction::Right,
        ]
        .into_iter()
        .filter(|d| self.is_held(*d))
        .map(Direction::vector)
        .sum();
        sum.normalize_or_zero()
    }

    pub fn is_idle(&self) -> bool {
        self.move_intent() == Vec3::ZERO
    }

    pub fn push_action(&mut self, action: Action) {
        tracing::debug!(?action, "queued action");
        self.pending.push(action);
    }

    /// Drain the discrete actions queued since the last call, oldest first.
    pub fn take_actions(&mut self) -> Vec<Action> {
        std::mem::take(&mut self.pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_when_nothing_held() {
        let input = InputState::new();
        assert!(input.is_idle());
        assert_eq!(input.move_intent(), Vec3::ZERO);
    }

    #[test]
    fn single_direction() {
        let mut input = InputState::new();
        input.set_direction(Direction::Forward, true);
        assert_eq!(input.move_intent(), Vec3::NEG_Z);
        input.set_direction(Direction::Forward, false);
        assert!(input.is_idle());
    }

    #[test]
    fn diagonal_is_normalized() {
        let mut input = InputState::new();
        input.set_direction(Direction::Forward, true);
        input.set_direction(Direction::Right, true);
        let intent = input.move_intent();
        assert!((intent.length() - 1.0).abs() < 1e-6);
        assert!(intent.x > 0.0 && intent.z < 0.0);
    }

    #[test]
    fn opposing_keys_cancel() {
        let mut input = InputState::new();
        input.set_direction(Direction::Left, true);
        input.set_direction(Direction::Right, true);
        assert!(input.is_idle());
    }

    #[test]
    fn clear_releases_everything() {
        let mut input = InputState::new();
        input.set_direction(Direction::Back, true);
        input.clear();
        assert!(!input.is_held(Direction::Back));
    }

    #[test]
    fn actions_drain_in_order() {
        let mut input = InputState::new();
        input.push_action(Action::TogglePause);
        input.push_action(Action::Restart);
        assert_eq!(
            input.take_actions(),
            vec![Action::TogglePause, Action::Restart]
        );
        assert!(input.take_actions().is_empty());
    }
}
