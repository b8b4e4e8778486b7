/// Tracks completion of a fixed amount of work and says when another
/// `interval` percent has been crossed.
#[derive(Debug, Clone)]
pub struct PercentProgress {
    total: usize,
    interval: usize,
    done: usize,
    last_reported: usize,
}

impl PercentProgress {
    pub fn new(total: usize, interval: usize) -> Self {
        Self {
            total,
            interval: interval.max(1),
            done: 0,
            last_reported: 0,
        }
    }

    /// Record `n` more units of work. Returns the new percentage when it is
    /// at least `interval` points past the last reported one.
    pub fn advance(&mut self, n: usize) -> Option<usize> {
        self.done = (self.done + n).min(self.total);
        let percent = self.percent();
        if percent >= self.last_reported + self.interval {
            self.last_reported = percent;
            Some(percent)
        } else {
            None
        }
    }

    pub fn percent(&self) -> usize {
        if self.total == 0 {
            return 100;
        }
        self.done * 100 / self.total
    }

    pub fn done(&self) -> usize {
        self.done
    }

    pub fn total(&self) -> usize {
        self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reports_each_interval_once() {
        let mut progress = PercentProgress::new(40, 10);
        let reported: Vec<usize> = (0..40).filter_map(|_| progress.advance(1)).collect();
        assert_eq!(reported, vec![10, 20, 30, 40, 50, 60, 70, 80, 90, 100]);
    }

    #[test]
    fn test_large_steps_skip_intermediate_reports() {
        let mut progress = PercentProgress::new(10, 5);
        assert_eq!(progress.advance(7), Some(70));
        assert_eq!(progress.advance(0), None);
        assert_eq!(progress.advance(3), Some(100));
    }

    #[test]
    fn test_overshoot_is_clamped() {
        let mut progress = PercentProgress::new(3, 50);
        progress.advance(10);
        assert_eq!(progress.done(), 3);
        assert_eq!(progress.percent(), 100);
    }
}
