//! Elapsed presentation time.

use crate::schedule::Millis;

/// Wall time since the presenter first interacted with the deck.
#[derive(Debug, Clone, Copy, Default)]
pub struct ElapsedClock {
    started_at: Option<Millis>,
}

impl ElapsedClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the clock at `now`. Returns false if it was already running.
    pub fn start(&mut self, now: Millis) -> bool {
        if self.started_at.is_some() {
            return false;
        }
        self.started_at = Some(now);
        true
    }

    /// Milliseconds since start, zero before the clock starts.
    pub fn elapsed(&self, now: Millis) -> Millis {
        self.started_at
            .map(|start| now.saturating_sub(start))
            .unwrap_or(0)
    }

    /// `HH:MM:SS` display text.
    pub fn display(&self, now: Millis) -> String {
        format_elapsed(self.elapsed(now))
    }
}

/// Format milliseconds as zero-padded `HH:MM:SS`.
pub fn format_elapsed(ms: Millis) -> String {
    let hours = ms / 3_600_000;
    let minutes = (ms % 3_600_000) / 60_000;
    let seconds = (ms % 60_000) / 1_000;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(0), "00:00:00");
        assert_eq!(format_elapsed(999), "00:00:00");
        assert_eq!(format_elapsed(61_000), "00:01:01");
        assert_eq!(format_elapsed(3_723_000), "01:02:03");
        assert_eq!(format_elapsed(100 * 3_600_000), "100:00:00");
    }

    #[test]
    fn test_clock_starts_once() {
        let mut clock = ElapsedClock::new();
        assert_eq!(clock.display(5_000), "00:00:00");

        assert!(clock.start(1_000));
        assert!(!clock.start(2_000));
        assert_eq!(clock.elapsed(4_000), 3_000);
        assert_eq!(clock.display(62_000), "00:01:01");
    }
}
