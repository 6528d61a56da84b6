//! Job identities and the registry of running job tasks

use crate::config::FleetConfig;
use crate::error::{FleetError, Result};
use crate::health::components;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

/// The four periodic jobs driven by the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobKind {
    Generation,
    AiAnalysis,
    Autoscaling,
    Performance,
}

impl JobKind {
    pub const ALL: [JobKind; 4] = [
        JobKind::Generation,
        JobKind::AiAnalysis,
        JobKind::Autoscaling,
        JobKind::Performance,
    ];

    /// Unique registry name
    pub fn name(&self) -> &'static str {
        match self {
            JobKind::Generation => "generation",
            JobKind::AiAnalysis => "ai-analysis",
            JobKind::Autoscaling => "autoscaling",
            JobKind::Performance => "performance",
        }
    }

    /// Position of this job in [`JobKind::ALL`]
    pub fn slot(&self) -> usize {
        match self {
            JobKind::Generation => 0,
            JobKind::AiAnalysis => 1,
            JobKind::Autoscaling => 2,
            JobKind::Performance => 3,
        }
    }

    /// Health component that reports this job's outcome
    pub fn component(&self) -> &'static str {
        match self {
            JobKind::Generation => components::GENERATION,
            JobKind::AiAnalysis => components::ANALYSIS,
            JobKind::Autoscaling => components::AUTOSCALER,
            JobKind::Performance => components::PERFORMANCE,
        }
    }

    /// The performance job has no enable flag and always runs
    pub fn enabled(&self, config: &FleetConfig) -> bool {
        match self {
            JobKind::Generation => config.generation.enabled,
            JobKind::AiAnalysis => config.ai_analysis.enabled,
            JobKind::Autoscaling => config.autoscaling.enabled,
            JobKind::Performance => true,
        }
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for JobKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        JobKind::ALL
            .into_iter()
            .find(|job| job.name() == s)
            .ok_or_else(|| format!("unknown job: {}", s))
    }
}

/// A running job task and its shutdown signal
pub(crate) struct JobSlot {
    pub handle: JoinHandle<()>,
    pub shutdown_tx: watch::Sender<bool>,
}

/// Running job tasks keyed by job name, at most one per name
#[derive(Default)]
pub(crate) struct JobRegistry {
    slots: BTreeMap<&'static str, JobSlot>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop slots whose task has already exited; returns how many were pruned
    pub fn prune(&mut self) -> usize {
        let before = self.slots.len();
        self.slots.retain(|name, slot| {
            let finished = slot.handle.is_finished();
            if finished {
                debug!(job = %name, "Pruned finished job");
            }
            !finished
        });
        before - self.slots.len()
    }

    /// Register a job, spawning it only when the name is free
    ///
    /// A live registration under the same name is rejected with
    /// `FleetError::DuplicateJob` and `spawn` is never called.
    pub fn register<F>(&mut self, name: &'static str, spawn: F) -> Result<()>
    where
        F: FnOnce() -> JobSlot,
    {
        if let Some(slot) = self.slots.get(name) {
            if !slot.handle.is_finished() {
                return Err(FleetError::DuplicateJob(name));
            }
        }
        self.slots.insert(name, spawn());
        Ok(())
    }

    /// Names of jobs whose task is still running
    pub fn live(&self) -> Vec<&'static str> {
        self.slots
            .iter()
            .filter(|(_, slot)| !slot.handle.is_finished())
            .map(|(name, _)| *name)
            .collect()
    }

    /// Remove every slot, leaving the registry empty
    pub fn drain(&mut self) -> Vec<(&'static str, JobSlot)> {
        std::mem::take(&mut self.slots).into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn idle_slot() -> (JobSlot, watch::Receiver<bool>) {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let rx = shutdown_rx.clone();
        let handle = tokio::spawn(async move {
            let _ = shutdown_rx.changed().await;
        });
        (
            JobSlot {
                handle,
                shutdown_tx,
            },
            rx,
        )
    }

    #[test]
    fn test_job_names_unique() {
        let mut names: Vec<&str> = JobKind::ALL.iter().map(|j| j.name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 4);
    }

    #[test]
    fn test_slots_follow_all_order() {
        for (position, job) in JobKind::ALL.iter().enumerate() {
            assert_eq!(job.slot(), position);
        }
    }

    #[test]
    fn test_job_from_str() {
        assert_eq!("ai-analysis".parse::<JobKind>(), Ok(JobKind::AiAnalysis));
        assert!("analysis".parse::<JobKind>().is_err());
    }

    #[test]
    fn test_disabled_jobs() {
        let mut config = FleetConfig::default();
        config.autoscaling.enabled = false;

        assert!(!JobKind::Autoscaling.enabled(&config));
        assert!(JobKind::Generation.enabled(&config));
        assert!(JobKind::Performance.enabled(&config));
    }

    #[tokio::test]
    async fn test_register_rejects_live_duplicate() {
        let mut registry = JobRegistry::new();
        let (slot, _rx) = idle_slot();
        registry.register("generation", || slot).unwrap();

        let mut spawned = false;
        let result = registry.register("generation", || {
            spawned = true;
            idle_slot().0
        });

        assert!(matches!(result, Err(FleetError::DuplicateJob("generation"))));
        assert!(!spawned);
        assert_eq!(registry.live(), vec!["generation"]);
    }

    #[tokio::test]
    async fn test_prune_finished_then_reregister() {
        let mut registry = JobRegistry::new();
        let (slot, _rx) = idle_slot();
        slot.shutdown_tx.send(true).unwrap();
        registry.register("performance", || slot).unwrap();

        // Give the task a chance to observe shutdown and exit
        for _ in 0..50 {
            if registry.live().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        assert_eq!(registry.prune(), 1);
        let (slot, _rx2) = idle_slot();
        assert!(registry.register("performance", || slot).is_ok());
    }
}
