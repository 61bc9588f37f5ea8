use crate::config::PopupConfig;

/// The "house built" popup. Scheduling starts a countdown in game time; the
/// popup becomes visible when it runs out and stays until dismissed.
#[derive(Debug, Clone)]
pub struct Popup {
    title: String,
    message: String,
    image: String,
    delay: f32,
    countdown: Option<f32>,
    visible: bool,
}

impl Popup {
    pub fn new(config: &PopupConfig) -> Self {
        Self {
            title: config.title.clone(),
            message: config.message.clone(),
            image: config.image.clone(),
            delay: config.delay_secs,
            countdown: None,
            visible: false,
        }
    }

    /// Start the delay. Ignored while already pending or showing.
    pub fn schedule(&mut self) {
        if self.countdown.is_none() && !self.visible {
            self.countdown = Some(self.delay);
        }
    }

    /// Returns true on the tick the popup appears.
    pub fn advance(&mut self, dt: f32) -> bool {
        let Some(remaining) = self.countdown.as_mut() else {
            return false;
        };
        *remaining -= dt;
        if *remaining > 0.0 {
            return false;
        }
        self.countdown = None;
        self.visible = true;
        tracing::info!(title = %self.title, "popup shown");
        true
    }

    pub fn dismiss(&mut self) {
        self.countdown = None;
        self.visible = false;
    }

    pub fn is_pending(&self) -> bool {
        self.countdown.is_some()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Path of the background image, relative to the working directory.
    pub fn image(&self) -> &str {
        &self.image
    }
}
