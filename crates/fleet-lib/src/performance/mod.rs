//! Simulator self-monitoring
//!
//! This module provides:
//! - Job counters (tick latency, errors, analysis and scaling runs)
//! - A scored performance report with recommendations
//! - Fleet efficiency scoring with bottleneck detection

mod counters;
mod efficiency;
mod monitor;

pub use counters::PerformanceCounters;
pub use efficiency::{
    Bottleneck, EfficiencyCalculator, EfficiencyReport, OPTIMAL_CPU_PERCENT,
    OPTIMAL_MEMORY_PERCENT,
};
pub use monitor::{
    PerformanceMonitor, PerformanceReport, GOOD_PERFORMANCE_MESSAGE, RESIDENT_MEMORY_LIMIT_BYTES,
};
