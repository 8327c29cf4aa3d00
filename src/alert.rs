/// A percentage drop level that can be switched off without removing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Threshold {
    pub percent: u32,
    pub enabled: bool,
}

/// Configured thresholds, kept in ascending order with no duplicates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThresholdSet {
    levels: Vec<Threshold>,
}

impl ThresholdSet {
    pub fn new(mut levels: Vec<Threshold>) -> Self {
        levels.sort_by_key(|t| t.percent);
        levels.dedup_by_key(|t| t.percent);
        Self { levels }
    }

    pub fn all(&self) -> &[Threshold] {
        &self.levels
    }

    pub fn percents(&self) -> Vec<u32> {
        self.levels.iter().map(|t| t.percent).collect()
    }

    pub fn enabled(&self) -> impl Iterator<Item = u32> + '_ {
        self.levels.iter().filter(|t| t.enabled).map(|t| t.percent)
    }
}

impl Default for ThresholdSet {
    fn default() -> Self {
        Self::new(vec![
            Threshold {
                percent: 10,
                enabled: true,
            },
            Threshold {
                percent: 20,
                enabled: true,
            },
        ])
    }
}

#[derive(Debug, Clone, Default)]
pub struct DropEvaluator {
    thresholds: ThresholdSet,
}

impl DropEvaluator {
    pub fn new(thresholds: ThresholdSet) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &ThresholdSet {
        &self.thresholds
    }

    /// Percentage fall from `baseline` to `current`. Negative when the price rose.
    /// Undefined without a positive baseline.
    pub fn drop_percent(baseline: Option<f64>, current: f64) -> Option<f64> {
        match baseline {
            Some(baseline) if baseline > 0.0 => Some((baseline - current) / baseline * 100.0),
            _ => None,
        }
    }

    /// Every enabled threshold the drop has reached, lowest first.
    pub fn crossed_thresholds(&self, drop_percent: f64) -> Vec<u32> {
        self.thresholds
            .enabled()
            .filter(|&percent| drop_percent >= f64::from(percent))
            .collect()
    }
}
