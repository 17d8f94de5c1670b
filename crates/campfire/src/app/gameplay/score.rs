use tracing::info;

use super::fire::Fire;

pub(crate) const DEFAULT_THRESHOLD_PERCENT: f32 = 50.0;
pub(crate) const DEFAULT_BASE_SCORE_PER_SECOND: f32 = 1.0;
pub(crate) const DEFAULT_DAY_MULTIPLIER_GROWTH: f32 = 1.1;
pub(crate) const DEFAULT_DAY_LENGTH_SECONDS: f32 = 120.0;

/// The only way gameplay reports score.
pub(crate) trait ScoreSink {
    fn add_score(&mut self, amount: f32);
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ScoreConfig {
    pub(crate) threshold_percent: f32,
    pub(crate) base_score_per_second: f32,
    pub(crate) day_multiplier_growth: f32,
    pub(crate) day_length_seconds: f32,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            threshold_percent: DEFAULT_THRESHOLD_PERCENT,
            base_score_per_second: DEFAULT_BASE_SCORE_PER_SECOND,
            day_multiplier_growth: DEFAULT_DAY_MULTIPLIER_GROWTH,
            day_length_seconds: DEFAULT_DAY_LENGTH_SECONDS,
        }
    }
}

/// Running score. Amounts are scaled by the day and happiness multipliers
/// when they arrive.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ScoreBoard {
    score: f32,
    day_count: u32,
    day_multiplier: f32,
    happiness_multiplier: f32,
    day_multiplier_growth: f32,
}

impl ScoreBoard {
    pub(crate) fn new(day_multiplier_growth: f32) -> Self {
        Self {
            score: 0.0,
            day_count: 1,
            day_multiplier: 1.0,
            happiness_multiplier: 1.0,
            day_multiplier_growth,
        }
    }

    pub(crate) fn score(&self) -> f32 {
        self.score
    }

    pub(crate) fn day_count(&self) -> u32 {
        self.day_count
    }

    #[cfg(test)]
    pub(crate) fn day_multiplier(&self) -> f32 {
        self.day_multiplier
    }

    #[cfg(test)]
    pub(crate) fn set_happiness_multiplier(&mut self, multiplier: f32) {
        self.happiness_multiplier = multiplier.max(0.0);
    }

    pub(crate) fn next_day(&mut self) {
        self.day_count = self.day_count.saturating_add(1);
        if self.day_count > 1 {
            self.day_multiplier *= self.day_multiplier_growth;
        }
        info!(
            day_count = self.day_count,
            day_multiplier = self.day_multiplier,
            "day_advanced"
        );
    }
}

impl Default for ScoreBoard {
    fn default() -> Self {
        Self::new(DEFAULT_DAY_MULTIPLIER_GROWTH)
    }
}

impl ScoreSink for ScoreBoard {
    fn add_score(&mut self, amount: f32) {
        self.score += amount * self.day_multiplier * self.happiness_multiplier;
    }
}

/// Passive score for keeping a fire well fed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct CampfireScoring {
    threshold_percent: f32,
    base_score_per_second: f32,
}

impl CampfireScoring {
    pub(crate) fn new(config: &ScoreConfig) -> Self {
        Self {
            threshold_percent: config.threshold_percent,
            base_score_per_second: config.base_score_per_second,
        }
    }

    /// Adds score only while the fire is strictly above the threshold.
    pub(crate) fn accrue(&self, fire: &Fire, fixed_dt_seconds: f32, sink: &mut dyn ScoreSink) {
        if fire.fuel_percent() > self.threshold_percent {
            sink.add_score(self.base_score_per_second * fixed_dt_seconds);
        }
    }
}

#[cfg(test)]
mod tests {
    use engine::EntityId;

    use super::*;

    #[test]
    fn multipliers_scale_added_score() {
        let mut board = ScoreBoard::new(1.5);
        board.add_score(2.0);
        board.next_day();
        board.set_happiness_multiplier(2.0);
        board.add_score(2.0);

        assert_eq!(board.day_count(), 2);
        assert!((board.day_multiplier() - 1.5).abs() < 1e-6);
        assert!((board.score() - 8.0).abs() < 1e-5);
    }

    #[test]
    fn campfire_scores_only_above_threshold() {
        let scoring = CampfireScoring::new(&ScoreConfig::default());
        let mut board = ScoreBoard::default();
        let mut fire = Fire::new(EntityId(1), 100.0, 1.0);

        scoring.accrue(&fire, 2.0, &mut board);
        assert!((board.score() - 2.0).abs() < 1e-6);

        fire.set_current_fuel(50.0);
        scoring.accrue(&fire, 2.0, &mut board);
        assert!((board.score() - 2.0).abs() < 1e-6);
    }
}
