//! Fleet autoscaling
//!
//! Compares the fleet's average CPU against the configured target and moves
//! the fleet size by at most one server per decision. The interval of the
//! caller, not the step size, lets the fleet track load over several ticks.

use crate::config::AutoscalingConfig;
use crate::error::{FleetError, Result};
use crate::factory::FleetFactory;
use crate::models::{Environment, FleetState, ServerRole};
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, info};

/// Scale-in fires below this fraction of the target CPU
pub const SCALE_IN_RATIO: f64 = 0.5;

/// Default number of applied scaling events retained
pub const DEFAULT_HISTORY_SIZE: usize = 100;

/// Action chosen by the autoscaler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleAction {
    ScaleOut,
    ScaleIn,
    Maintain,
}

impl ScaleAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScaleAction::ScaleOut => "scale_out",
            ScaleAction::ScaleIn => "scale_in",
            ScaleAction::Maintain => "maintain",
        }
    }
}

impl std::fmt::Display for ScaleAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Single-step scaling decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalingDecision {
    pub action: ScaleAction,
    pub current_count: usize,
    pub target_count: usize,
    pub avg_cpu: f64,
}

/// Result of applying a decision to the fleet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScaleOutcome {
    Added(String),
    Removed(String),
    Unchanged,
}

/// Advisory multi-step target, never applied to the fleet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalingRecommendation {
    pub action: ScaleAction,
    pub current_count: usize,
    pub recommended_count: usize,
    pub avg_cpu: f64,
    pub reason: String,
}

/// Advisory forecast of future scaling needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalingPrediction {
    pub horizon_minutes: u32,
    pub current_cpu: f64,
    pub predicted_cpu: f64,
    /// CPU trend in percentage points per hour
    pub trend_per_hour: f64,
    pub predicted_action: ScaleAction,
    /// Confidence in the forecast (0-100)
    pub confidence: f64,
    /// Minutes until the predicted action becomes necessary, if ever
    pub minutes_to_action: Option<f64>,
}

/// Decide the next scaling step from the current average CPU
///
/// When `min_servers == max_servers` the decision is always `Maintain`, even
/// for a fleet that currently sits outside the bounds.
pub fn decide(fleet: &FleetState, config: &AutoscalingConfig) -> ScalingDecision {
    let current = fleet.len();
    let avg_cpu = fleet.average_cpu();
    let target_cpu = config.target_cpu_percent;

    let (action, target_count) = if config.min_servers == config.max_servers {
        (ScaleAction::Maintain, current)
    } else if avg_cpu > target_cpu && current < config.max_servers {
        (ScaleAction::ScaleOut, (current + 1).min(config.max_servers))
    } else if avg_cpu < target_cpu * SCALE_IN_RATIO && current > config.min_servers {
        (
            ScaleAction::ScaleIn,
            current.saturating_sub(1).max(config.min_servers),
        )
    } else {
        (ScaleAction::Maintain, current)
    };

    debug!(
        action = %action,
        current,
        target = target_count,
        avg_cpu,
        target_cpu,
        "Scaling decision evaluated"
    );

    ScalingDecision {
        action,
        current_count: current,
        target_count,
        avg_cpu,
    }
}

/// Apply a decision: add one production web server or remove the newest one
pub fn apply<R: Rng + ?Sized>(
    decision: &ScalingDecision,
    fleet: &mut FleetState,
    factory: &FleetFactory,
    rng: &mut R,
) -> Result<ScaleOutcome> {
    if fleet.len() != decision.current_count {
        return Err(FleetError::Scaling(format!(
            "fleet changed since decision (decided at {}, now {})",
            decision.current_count,
            fleet.len()
        )));
    }

    match decision.action {
        ScaleAction::Maintain => Ok(ScaleOutcome::Unchanged),
        ScaleAction::ScaleOut => {
            let id = factory.spawn_server(fleet, Environment::Production, ServerRole::Web, rng);
            info!(server_id = %id, fleet_size = fleet.len(), "Scaled out");
            Ok(ScaleOutcome::Added(id))
        }
        ScaleAction::ScaleIn => {
            let id = fleet
                .most_recent_id()
                .ok_or_else(|| FleetError::Scaling("cannot scale in an empty fleet".to_string()))?;
            fleet.remove(&id);
            info!(server_id = %id, fleet_size = fleet.len(), "Scaled in");
            Ok(ScaleOutcome::Removed(id))
        }
    }
}

/// Non-binding multi-step recommendation for display
pub fn calculate_scaling_recommendation(
    fleet: &FleetState,
    config: &AutoscalingConfig,
) -> ScalingRecommendation {
    let current = fleet.len();
    let avg_cpu = fleet.average_cpu();
    let target_cpu = config.target_cpu_percent;

    if avg_cpu > target_cpu && current < config.max_servers {
        let extra = (avg_cpu / 50.0).ceil() as usize;
        let recommended = (current + extra).min(config.max_servers);
        ScalingRecommendation {
            action: ScaleAction::ScaleOut,
            current_count: current,
            recommended_count: recommended,
            avg_cpu,
            reason: format!(
                "평균 CPU {:.1}%가 목표 {:.1}%를 초과했습니다. 서버 {}대 추가를 권장합니다.",
                avg_cpu,
                target_cpu,
                recommended - current
            ),
        }
    } else if avg_cpu < target_cpu * SCALE_IN_RATIO && current > config.min_servers {
        let recommended = current.saturating_sub(1).max(config.min_servers);
        ScalingRecommendation {
            action: ScaleAction::ScaleIn,
            current_count: current,
            recommended_count: recommended,
            avg_cpu,
            reason: format!(
                "평균 CPU {:.1}%가 낮습니다. 서버 1대 축소로 비용을 절감할 수 있습니다.",
                avg_cpu
            ),
        }
    } else {
        ScalingRecommendation {
            action: ScaleAction::Maintain,
            current_count: current,
            recommended_count: current,
            avg_cpu,
            reason: format!(
                "평균 CPU {:.1}%로 현재 서버 {}대 구성을 유지합니다.",
                avg_cpu, current
            ),
        }
    }
}

/// Linear CPU trend: rising under high load, falling under low load
fn cpu_trend_per_hour(avg_cpu: f64) -> f64 {
    if avg_cpu > 70.0 {
        2.0
    } else if avg_cpu < 30.0 {
        -1.0
    } else {
        0.0
    }
}

/// Extrapolate the CPU trend over a horizon and report the implied action
pub fn predict_scaling_needs(
    fleet: &FleetState,
    config: &AutoscalingConfig,
    horizon_minutes: u32,
) -> ScalingPrediction {
    let current_cpu = fleet.average_cpu();
    let trend = cpu_trend_per_hour(current_cpu);
    let hours = horizon_minutes as f64 / 60.0;
    let predicted_cpu = (current_cpu + trend * hours).clamp(0.0, 100.0);

    let scale_out_at = config.target_cpu_percent;
    let scale_in_at = config.target_cpu_percent * SCALE_IN_RATIO;

    let predicted_action = if predicted_cpu > scale_out_at {
        ScaleAction::ScaleOut
    } else if predicted_cpu < scale_in_at {
        ScaleAction::ScaleIn
    } else {
        ScaleAction::Maintain
    };

    let minutes_to_action = match predicted_action {
        ScaleAction::ScaleOut if current_cpu > scale_out_at => Some(0.0),
        ScaleAction::ScaleIn if current_cpu < scale_in_at => Some(0.0),
        ScaleAction::ScaleOut if trend > 0.0 => Some((scale_out_at - current_cpu) / trend * 60.0),
        ScaleAction::ScaleIn if trend < 0.0 => Some((current_cpu - scale_in_at) / -trend * 60.0),
        _ => None,
    };

    // Longer horizons are less certain; a flat trend is easier to call
    let confidence = if fleet.is_empty() {
        0.0
    } else {
        let flat_bonus = if trend == 0.0 { 5.0 } else { 0.0 };
        (95.0 - horizon_minutes as f64 * 0.5 + flat_bonus).clamp(20.0, 100.0)
    };

    ScalingPrediction {
        horizon_minutes,
        current_cpu,
        predicted_cpu,
        trend_per_hour: trend,
        predicted_action,
        confidence,
        minutes_to_action,
    }
}

/// One applied scaling event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalingEvent {
    pub timestamp: DateTime<Utc>,
    pub action: ScaleAction,
    pub from_count: usize,
    pub to_count: usize,
    pub server_id: Option<String>,
    pub success: bool,
}

/// Bounded log of scaling events, oldest evicted first
#[derive(Debug, Clone)]
pub struct ScalingHistory {
    events: VecDeque<ScalingEvent>,
    max_size: usize,
}

impl Default for ScalingHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_SIZE)
    }
}

impl ScalingHistory {
    pub fn new(max_size: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(max_size.min(DEFAULT_HISTORY_SIZE)),
            max_size: max_size.max(1),
        }
    }

    pub fn record(&mut self, event: ScalingEvent) {
        if self.events.len() >= self.max_size {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn last(&self) -> Option<&ScalingEvent> {
        self.events.back()
    }

    /// Most recent `limit` events, oldest first
    pub fn recent(&self, limit: usize) -> Vec<ScalingEvent> {
        let skip = self.events.len().saturating_sub(limit);
        self.events.iter().skip(skip).cloned().collect()
    }
}
