/// Raised by [`Scoreboard::increment`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreEvent {
    /// The score passed the house threshold. Raised once per game.
    ThresholdCrossed { score: u32 },
}

/// Delivered-cube counter.
#[derive(Debug, Clone)]
pub struct Scoreboard {
    score: u32,
    threshold: u32,
    crossed: bool,
}

impl Scoreboard {
    pub fn new(threshold: u32) -> Self {
        Self {
            score: 0,
            threshold,
            crossed: false,
        }
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn has_crossed(&self) -> bool {
        self.crossed
    }

    pub fn increment(&mut self) -> Option<ScoreEvent> {
        self.score = self.score.saturating_add(1);
        if self.score > self.threshold && !self.crossed {
            self.crossed = true;
            tracing::info!(score = self.score, threshold = self.threshold, "score threshold crossed");
            return Some(ScoreEvent::ThresholdCrossed { score: self.score });
        }
        None
    }

    /// HUD text.
    pub fn label(&self) -> String {
        format!("Score: {}", self.score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_zero() {
        let board = Scoreboard::new(100);
        assert_eq!(board.score(), 0);
        assert_eq!(board.label(), "Score: 0");
    }

    #[test]
    fn threshold_fires_once_strictly_above() {
        let mut board = Scoreboard::new(3);
        assert_eq!(board.increment(), None);
        assert_eq!(board.increment(), None);
        assert_eq!(board.increment(), None);
        assert_eq!(
            board.increment(),
            Some(ScoreEvent::ThresholdCrossed { score: 4 })
        );
        assert_eq!(board.increment(), None);
        assert_eq!(board.label(), "Score: 5");
    }

    #[test]
    fn zero_threshold_fires_on_first_point() {
        let mut board = Scoreboard::new(0);
        assert!(board.increment().is_some());
    }
}
