use glam::Vec3;

/// A high-level action produced by any input source (keyboard, autopilot, script).
///
/// The game consumes actions, never raw input events, so the headless runner
/// and the desktop window drive the same logic.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Walk along a direction on the ground plane.
    Move(Vec3),
    /// Reset score, stack and props to a fresh game.
    Restart,
    /// Freeze or resume the simulation.
    TogglePause,
    /// Show or hide the developer inspector.
    ToggleInspector,
    /// Close the house-complete popup.
    DismissPopup,
    /// No-op (used for input mapping that hasn't been bound yet).
    Noop,
}

impl Action {
    /// True for actions that only affect presentation, not the simulation.
    pub fn is_ui_only(&self) -> bool {
        matches!(self, Self::ToggleInspector | Self::Noop)
    }
}
