//! Periodic job scheduler
//!
//! Owns the simulated fleet and drives four periodic jobs over it:
//! metric generation, health analysis, autoscaling and performance
//! monitoring. Each job runs in its own task with its own ticker. Every
//! invocation, ticker driven or manual, holds that job's run lock, so two
//! invocations of the same job never overlap. Job failures, panics
//! included, are counted and logged and never stop the job.

mod intervals;
mod jobs;

pub use intervals::{optimize, JobIntervals, ObservedLoad, MIN_INTERVAL};
pub use jobs::JobKind;

use jobs::{JobRegistry, JobSlot};

use crate::analysis::{self, SystemHealth};
use crate::autoscaler::{
    self, ScaleAction, ScaleOutcome, ScalingEvent, ScalingHistory, ScalingPrediction,
    ScalingRecommendation,
};
use crate::config::{FleetConfig, GenerationConfig};
use crate::error::{FleetError, Result};
use crate::evolver;
use crate::factory::FleetFactory;
use crate::health::HealthRegistry;
use crate::models::{FleetState, ServerRecord, ServerStatus, StatusCounts};
use crate::observability::{FleetMetrics, StructuredLogger};
use crate::performance::{
    EfficiencyCalculator, EfficiencyReport, PerformanceCounters, PerformanceMonitor,
    PerformanceReport,
};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex, RwLock};
use tokio::task::{JoinError, JoinSet};
use tokio::time::{interval, interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Default capacity of the scheduler event channel
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Page size assumed when converting `/proc/self/statm` pages to bytes
const PAGE_SIZE_BYTES: u64 = 4096;

/// Notifications published by the scheduler
///
/// Delivered with `try_send`; events are dropped when the receiver falls
/// behind.
#[derive(Debug, Clone)]
pub enum SchedulerEvent {
    TickCompleted { job: JobKind, elapsed_ms: u64 },
    StatusChanged {
        server_id: String,
        from: ServerStatus,
        to: ServerStatus,
    },
    Scaled(ScalingEvent),
    JobFailed { job: JobKind, error: String },
    IntervalsChanged(JobIntervals),
}

#[derive(Debug, Clone, Default)]
struct LatestReports {
    performance: Option<PerformanceReport>,
    efficiency: Option<EfficiencyReport>,
    recommendation: Option<ScalingRecommendation>,
    system_health: Option<SystemHealth>,
}

/// State shared between the scheduler handle and its job tasks
///
/// Lock order: a job's run lock, then `config`, `rng`, `fleet`, then the
/// remaining locks.
struct Shared {
    /// One per job, indexed by [`JobKind::slot`]; held for a whole tick
    run_locks: [Mutex<()>; 4],
    config: RwLock<FleetConfig>,
    rng: Mutex<StdRng>,
    fleet: RwLock<FleetState>,
    counters: RwLock<PerformanceCounters>,
    history: RwLock<ScalingHistory>,
    reports: RwLock<LatestReports>,
    factory: FleetFactory,
    monitor: PerformanceMonitor,
    efficiency: EfficiencyCalculator,
    health: HealthRegistry,
    metrics: FleetMetrics,
    logger: StructuredLogger,
    events_tx: mpsc::Sender<SchedulerEvent>,
    intervals_tx: watch::Sender<JobIntervals>,
}

/// Builder for [`Scheduler`]
pub struct SchedulerBuilder {
    config: FleetConfig,
    fleet: Option<FleetState>,
    node_name: String,
    event_capacity: usize,
}

impl SchedulerBuilder {
    /// Start from an existing fleet instead of generating one
    pub fn fleet(mut self, fleet: FleetState) -> Self {
        self.fleet = Some(fleet);
        self
    }

    /// Node name attached to structured log events
    pub fn node_name(mut self, node_name: impl Into<String>) -> Self {
        self.node_name = node_name.into();
        self
    }

    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }

    /// Validate the configuration and build the scheduler
    ///
    /// # Returns
    /// * The scheduler and the receiving end of its event channel
    pub fn build(self) -> Result<(Scheduler, mpsc::Receiver<SchedulerEvent>)> {
        self.config.validate()?;

        let mut rng = match self.config.fleet.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let factory = FleetFactory::from_settings(&self.config.fleet);
        let fleet = match self.fleet {
            Some(fleet) => fleet,
            None => factory.initialize_fleet(
                self.config.fleet.initial_servers,
                self.config.fleet.profile,
                &mut rng,
            ),
        };

        let metrics = FleetMetrics::new();
        metrics.set_fleet(&fleet.status_counts());

        let (events_tx, events_rx) = mpsc::channel(self.event_capacity);
        let (intervals_tx, _) = watch::channel(JobIntervals::from_config(&self.config));

        let shared = Shared {
            run_locks: [(); 4].map(|_| Mutex::new(())),
            config: RwLock::new(self.config),
            rng: Mutex::new(rng),
            fleet: RwLock::new(fleet),
            counters: RwLock::new(PerformanceCounters::new()),
            history: RwLock::new(ScalingHistory::default()),
            reports: RwLock::new(LatestReports::default()),
            factory,
            monitor: PerformanceMonitor::new(),
            efficiency: EfficiencyCalculator::new(),
            health: HealthRegistry::new(),
            metrics,
            logger: StructuredLogger::new(self.node_name),
            events_tx,
            intervals_tx,
        };

        let scheduler = Scheduler {
            shared: Arc::new(shared),
            jobs: Mutex::new(JobRegistry::new()),
        };
        Ok((scheduler, events_rx))
    }
}

/// Drives the periodic simulator jobs over one fleet
pub struct Scheduler {
    shared: Arc<Shared>,
    jobs: Mutex<JobRegistry>,
}

impl Scheduler {
    /// Create a scheduler with a freshly generated fleet
    pub fn new(config: FleetConfig) -> Result<(Self, mpsc::Receiver<SchedulerEvent>)> {
        Self::builder(config).build()
    }

    /// Create a scheduler over an existing fleet
    pub fn with_fleet(
        config: FleetConfig,
        fleet: FleetState,
    ) -> Result<(Self, mpsc::Receiver<SchedulerEvent>)> {
        Self::builder(config).fleet(fleet).build()
    }

    pub fn builder(config: FleetConfig) -> SchedulerBuilder {
        SchedulerBuilder {
            config,
            fleet: None,
            node_name: "fleet-simulator".to_string(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }

    /// Start every enabled job that is not already running
    ///
    /// Calling `start` again while jobs run leaves exactly one task per job.
    /// Returns the number of jobs started by this call.
    pub async fn start(&self) -> usize {
        let config = self.shared.config.read().await.clone();
        let mut jobs = self.jobs.lock().await;

        let pruned = jobs.prune();
        if pruned > 0 {
            debug!(pruned, "Pruned finished job registrations");
        }
        if jobs.live().is_empty() {
            self.shared.health.register_all().await;
        }

        let mut started = 0;
        for job in JobKind::ALL {
            if !job.enabled(&config) {
                debug!(job = %job, "Job disabled");
                continue;
            }

            let shared = Arc::clone(&self.shared);
            let intervals = self.shared.intervals_tx.subscribe();
            match jobs.register(job.name(), || spawn_job(shared, job, intervals)) {
                Ok(()) => started += 1,
                Err(e) => warn!(job = %job, error = %e, "Job not started"),
            }
        }

        if started > 0 {
            let fleet_size = self.shared.fleet.read().await.len();
            self.shared.logger.log_startup(
                env!("CARGO_PKG_VERSION"),
                fleet_size,
                &config.fleet.profile.to_string(),
            );
        }
        started
    }

    /// Stop every registered job and wait for its task to finish
    ///
    /// A job in the middle of a tick finishes that tick first. Returns the
    /// number of jobs stopped.
    pub async fn stop(&self) -> usize {
        let slots = self.jobs.lock().await.drain();
        let count = slots.len();

        for (_, slot) in &slots {
            let _ = slot.shutdown_tx.send(true);
        }
        for (name, slot) in slots {
            if let Err(e) = slot.handle.await {
                warn!(job = %name, error = %e, "Job task ended abnormally");
            }
        }

        if count > 0 {
            self.shared.logger.log_shutdown("stop requested");
        }
        count
    }

    /// Names of jobs whose task is currently running
    pub async fn live_jobs(&self) -> Vec<String> {
        self.jobs
            .lock()
            .await
            .live()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// Run one invocation of a job outside its ticker
    ///
    /// Returns `false` when the invocation failed; the failure has already
    /// been counted and logged.
    pub async fn run_job_once(&self, job: JobKind) -> bool {
        run_tick(&self.shared, job).await
    }

    /// Current load on the fleet
    pub async fn observed_load(&self) -> ObservedLoad {
        ObservedLoad::from_fleet(&*self.shared.fleet.read().await)
    }

    /// Retune job intervals to the observed load
    ///
    /// Running jobs adopt the new interval after their current tick.
    pub async fn optimize_intervals(&self, load: ObservedLoad) -> JobIntervals {
        let base = JobIntervals::from_config(&*self.shared.config.read().await);
        let tuned = intervals::optimize(&base, &load);
        let previous = self.shared.intervals_tx.send_replace(tuned);

        if previous != tuned {
            self.shared.logger.log_intervals_retuned(
                tuned.generation.as_secs(),
                tuned.analysis.as_secs(),
                tuned.autoscaling.as_secs(),
                tuned.performance.as_secs(),
            );
            self.shared.emit(SchedulerEvent::IntervalsChanged(tuned));
        }
        tuned
    }

    /// Intervals currently in effect
    pub fn intervals(&self) -> JobIntervals {
        *self.shared.intervals_tx.borrow()
    }

    /// Records ordered by creation
    pub async fn fleet_snapshot(&self) -> Vec<ServerRecord> {
        self.shared.fleet.read().await.snapshot()
    }

    pub async fn status_counts(&self) -> StatusCounts {
        self.shared.fleet.read().await.status_counts()
    }

    /// Run a closure against the fleet under the write lock
    pub async fn modify_fleet<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&mut FleetState) -> T,
    {
        let mut fleet = self.shared.fleet.write().await;
        let result = f(&mut fleet);
        self.shared.metrics.set_fleet(&fleet.status_counts());
        result
    }

    /// Fresh performance report, including resident memory where available
    pub async fn performance_report(&self) -> PerformanceReport {
        let resident = resident_memory_bytes().await;
        self.shared.build_reports(resident).await.0
    }

    pub async fn efficiency_report(&self) -> EfficiencyReport {
        self.shared
            .efficiency
            .calculate(&*self.shared.fleet.read().await)
    }

    pub async fn system_health(&self) -> SystemHealth {
        analysis::analyze_system_health(&*self.shared.fleet.read().await)
    }

    /// Advisory recommendation refreshed by the generation job
    pub async fn scaling_recommendation(&self) -> Option<ScalingRecommendation> {
        self.shared.reports.read().await.recommendation.clone()
    }

    /// Reports stored by the last successful performance and analysis ticks
    pub async fn latest_reports(
        &self,
    ) -> (
        Option<PerformanceReport>,
        Option<EfficiencyReport>,
        Option<SystemHealth>,
    ) {
        let reports = self.shared.reports.read().await;
        (
            reports.performance.clone(),
            reports.efficiency.clone(),
            reports.system_health.clone(),
        )
    }

    pub async fn scaling_prediction(&self, horizon_minutes: u32) -> ScalingPrediction {
        let scaling = self.shared.config.read().await.autoscaling.clone();
        let fleet = self.shared.fleet.read().await;
        autoscaler::predict_scaling_needs(&fleet, &scaling, horizon_minutes)
    }

    /// Most recent applied scaling events, oldest first
    pub async fn scaling_history(&self, limit: usize) -> Vec<ScalingEvent> {
        self.shared.history.read().await.recent(limit)
    }

    pub async fn counters(&self) -> PerformanceCounters {
        self.shared.counters.read().await.clone()
    }

    pub async fn config(&self) -> FleetConfig {
        self.shared.config.read().await.clone()
    }

    /// Swap in a new configuration
    ///
    /// Intervals reset to the new configured values. Enable flags take
    /// effect on the next `start`.
    pub async fn replace_config(&self, config: FleetConfig) -> Result<()> {
        config.validate()?;
        let intervals = JobIntervals::from_config(&config);
        *self.shared.config.write().await = config;
        self.shared.intervals_tx.send_replace(intervals);
        info!("Simulator configuration replaced");
        Ok(())
    }

    /// Health registry updated by the jobs
    pub fn health(&self) -> HealthRegistry {
        self.shared.health.clone()
    }
}

fn spawn_job(
    shared: Arc<Shared>,
    job: JobKind,
    intervals: watch::Receiver<JobIntervals>,
) -> JobSlot {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(run_job_loop(shared, job, intervals, shutdown_rx));
    JobSlot {
        handle,
        shutdown_tx,
    }
}

async fn run_job_loop(
    shared: Arc<Shared>,
    job: JobKind,
    mut intervals: watch::Receiver<JobIntervals>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut period = intervals.borrow_and_update().for_job(job);
    info!(job = %job, interval_secs = period.as_secs(), "Starting job");

    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                run_tick(&shared, job).await;

                // Adopt a retuned interval only between ticks
                let next = intervals.borrow_and_update().for_job(job);
                if next != period {
                    debug!(
                        job = %job,
                        old_secs = period.as_secs(),
                        new_secs = next.as_secs(),
                        "Job interval changed"
                    );
                    period = next;
                    ticker = interval_at(Instant::now() + period, period);
                    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                }
            }
            _ = shutdown.changed() => {
                info!(job = %job, "Stopping job");
                break;
            }
        }
    }
}

/// One job invocation; the body runs in its own task so a panic is contained
async fn run_tick(shared: &Arc<Shared>, job: JobKind) -> bool {
    let _running = shared.run_locks[job.slot()].lock().await;
    let start = Instant::now();
    let task_shared = Arc::clone(shared);
    let outcome = tokio::spawn(async move { task_shared.execute(job).await }).await;
    let elapsed = start.elapsed();
    shared
        .metrics
        .observe_job_duration(job.name(), elapsed.as_secs_f64());

    let failure = match outcome {
        Ok(Ok(())) => None,
        Ok(Err(e)) => Some(e),
        Err(join_error) => Some(FleetError::JobPanicked {
            job: job.name(),
            message: panic_message(join_error),
        }),
    };

    // A partly failed generation tick still did its work
    if job == JobKind::Generation {
        shared.counters.write().await.record_tick(elapsed);
    }

    match failure {
        None => {
            shared.health.report_success(job.component()).await;
            shared.emit(SchedulerEvent::TickCompleted {
                job,
                elapsed_ms: elapsed.as_millis() as u64,
            });
            true
        }
        Some(error) => {
            shared.record_failure(job, error.to_string()).await;
            false
        }
    }
}

fn panic_message(error: JoinError) -> String {
    if !error.is_panic() {
        return error.to_string();
    }
    let payload = error.into_panic();
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

impl Shared {
    async fn execute(&self, job: JobKind) -> Result<()> {
        match job {
            JobKind::Generation => self.generate().await,
            JobKind::AiAnalysis => self.analyze().await,
            JobKind::Autoscaling => self.autoscale().await,
            JobKind::Performance => self.measure().await,
        }
    }

    /// Evolve every record and commit the ones that evolved cleanly
    async fn generate(&self) -> Result<()> {
        let (generation, parallel, scaling) = {
            let config = self.config.read().await;
            (
                config.generation.clone(),
                config.performance.parallel_processing,
                config.autoscaling.clone(),
            )
        };
        let records = self.fleet.read().await.snapshot();
        let now = Utc::now();

        let results = if parallel {
            self.evolve_parallel(records, &generation, now).await
        } else {
            let mut rng = self.rng.lock().await;
            records
                .iter()
                .map(|record| evolver::evolve(record, &generation, now, &mut *rng))
                .collect()
        };

        let mut first_error = None;
        let mut changes = Vec::new();
        let (counts, recommendation) = {
            let mut fleet = self.fleet.write().await;
            for result in results {
                match result {
                    Ok(mut evolved) => {
                        // Servers removed since the snapshot stay removed
                        let Some(current) = fleet.get_mut(&evolved.id) else {
                            continue;
                        };
                        if current.status != evolved.status {
                            changes.push((evolved.id.clone(), current.status, evolved.status));
                        }
                        evolved.analysis = current.analysis.take();
                        *current = evolved;
                    }
                    Err(e) => {
                        warn!(error = %e, "Keeping previous record");
                        first_error.get_or_insert(e);
                    }
                }
            }

            let recommendation = scaling
                .enabled
                .then(|| autoscaler::calculate_scaling_recommendation(&fleet, &scaling));
            (fleet.status_counts(), recommendation)
        };

        self.metrics.set_fleet(&counts);
        if recommendation.is_some() {
            self.reports.write().await.recommendation = recommendation;
        }
        for (server_id, from, to) in changes {
            self.logger.log_status_changed(&server_id, from, to);
            self.emit(SchedulerEvent::StatusChanged {
                server_id,
                from,
                to,
            });
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Fan evolution out over a `JoinSet`, one child RNG per record
    async fn evolve_parallel(
        &self,
        records: Vec<ServerRecord>,
        generation: &GenerationConfig,
        now: DateTime<Utc>,
    ) -> Vec<Result<ServerRecord>> {
        let child_rngs: Vec<StdRng> = {
            let mut rng = self.rng.lock().await;
            records.iter().map(|_| StdRng::from_rng(&mut *rng)).collect()
        };
        let ids: Vec<String> = records.iter().map(|r| r.id.clone()).collect();

        let mut set = JoinSet::new();
        for (index, (record, mut rng)) in records.into_iter().zip(child_rngs).enumerate() {
            let generation = generation.clone();
            set.spawn(async move { (index, evolver::evolve(&record, &generation, now, &mut rng)) });
        }

        let mut slots: Vec<Option<Result<ServerRecord>>> = ids.iter().map(|_| None).collect();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((index, result)) => slots[index] = Some(result),
                Err(e) => warn!(error = %e, "Evolution task failed"),
            }
        }

        slots
            .into_iter()
            .zip(ids)
            .map(|(slot, server_id)| {
                slot.unwrap_or_else(|| {
                    Err(FleetError::Generation {
                        server_id,
                        reason: "evolution task failed".to_string(),
                    })
                })
            })
            .collect()
    }

    /// Analyse the whole fleet; nothing is committed unless every record scored
    async fn analyze(&self) -> Result<()> {
        let (results, health) = {
            let fleet = self.fleet.read().await;
            (
                analysis::analyze_fleet(&fleet)?,
                analysis::analyze_system_health(&fleet),
            )
        };

        let applied = {
            let mut fleet = self.fleet.write().await;
            analysis::commit_analysis(&mut fleet, results)
        };

        self.counters.write().await.record_analysis();
        self.metrics.inc_analysis_runs();
        self.metrics.set_health_score(health.health_score);
        debug!(
            servers = applied,
            health_score = health.health_score,
            critical = health.critical_count,
            "Fleet analysis committed"
        );
        self.reports.write().await.system_health = Some(health);
        Ok(())
    }

    /// Decide and apply one scaling step
    async fn autoscale(&self) -> Result<()> {
        let scaling = self.config.read().await.autoscaling.clone();

        let (decision, outcome, to_count, counts) = {
            let mut rng = self.rng.lock().await;
            let mut fleet = self.fleet.write().await;
            let decision = autoscaler::decide(&fleet, &scaling);
            let outcome = autoscaler::apply(&decision, &mut fleet, &self.factory, &mut *rng);
            (decision, outcome, fleet.len(), fleet.status_counts())
        };

        self.counters.write().await.record_scaling_decision();
        self.metrics.inc_scaling_decision(decision.action);
        self.metrics.set_fleet(&counts);

        if decision.action == ScaleAction::Maintain && outcome.is_ok() {
            return Ok(());
        }

        let server_id = match &outcome {
            Ok(ScaleOutcome::Added(id)) | Ok(ScaleOutcome::Removed(id)) => Some(id.clone()),
            _ => None,
        };
        let event = ScalingEvent {
            timestamp: Utc::now(),
            action: decision.action,
            from_count: decision.current_count,
            to_count,
            server_id,
            success: outcome.is_ok(),
        };
        self.history.write().await.record(event.clone());

        outcome?;
        self.logger.log_scaling_applied(
            event.action,
            event.from_count,
            event.to_count,
            decision.avg_cpu,
            event.server_id.as_deref(),
        );
        self.emit(SchedulerEvent::Scaled(event));
        Ok(())
    }

    /// Refresh the performance and efficiency reports
    async fn measure(&self) -> Result<()> {
        let resident = resident_memory_bytes().await;
        let (performance, efficiency) = self.build_reports(resident).await;

        self.metrics.set_system_score(performance.system_score);
        self.metrics.set_efficiency_score(efficiency.overall);
        debug!(
            system_score = performance.system_score,
            efficiency = efficiency.overall,
            bottlenecks = efficiency.bottlenecks.len(),
            "Performance measured"
        );

        let mut reports = self.reports.write().await;
        reports.performance = Some(performance);
        reports.efficiency = Some(efficiency);
        Ok(())
    }

    async fn build_reports(&self, resident: Option<u64>) -> (PerformanceReport, EfficiencyReport) {
        let counters = self.counters.read().await.clone();
        let fleet = self.fleet.read().await;
        (
            self.monitor.report(&fleet, &counters, resident),
            self.efficiency.calculate(&fleet),
        )
    }

    async fn record_failure(&self, job: JobKind, message: String) {
        let error_count = {
            let mut counters = self.counters.write().await;
            counters.record_error();
            counters.error_count
        };
        self.metrics.inc_job_errors(job.name());
        self.health
            .report_failure(job.component(), message.clone())
            .await;
        self.logger.log_job_failed(job.name(), &message, error_count);
        self.emit(SchedulerEvent::JobFailed {
            job,
            error: message,
        });
    }

    fn emit(&self, event: SchedulerEvent) {
        if let Err(e) = self.events_tx.try_send(event) {
            debug!(error = %e, "Dropped scheduler event");
        }
    }
}

/// Resident set size of this process, absent where `/proc` is unavailable
async fn resident_memory_bytes() -> Option<u64> {
    let statm = tokio::fs::read_to_string("/proc/self/statm").await.ok()?;
    parse_statm_resident(&statm)
}

fn parse_statm_resident(statm: &str) -> Option<u64> {
    let pages: u64 = statm.split_whitespace().nth(1)?.parse().ok()?;
    Some(pages.saturating_mul(PAGE_SIZE_BYTES))
}
