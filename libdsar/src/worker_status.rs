use time::Date;

use super::config::Metric;

#[derive(Debug, Clone, Copy, Default)]
pub enum BarColor {
    #[default]
    CYAN,
    MAGENTA,
}

impl BarColor {
    pub fn for_metric(metric: Metric) -> Self {
        match metric {
            Metric::Dsar => Self::CYAN,
            Metric::Rsam => Self::MAGENTA,
        }
    }
}

/// Progress report sent by a worker after each date it finishes
#[derive(Debug, Clone)]
pub struct WorkerStatus {
    pub progress: f32,
    pub date: Date,
    pub worker_id: usize,
    pub metric: Metric,
    pub color: BarColor,
}

impl WorkerStatus {
    pub fn new(progress: f32, date: Date, worker_id: usize, metric: Metric) -> Self {
        Self {
            progress,
            date,
            worker_id,
            metric,
            color: BarColor::for_metric(metric),
        }
    }
}
