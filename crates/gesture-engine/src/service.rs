//! Shared engine with background watchdog and release ticks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use headput_common::config::TimeoutConfig;
use headput_face_model::MeasurementSample;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::engine::GestureEngine;
use crate::timeout::InputTimeoutMonitor;

/// Cloneable handle to the engine's critical section.
///
/// Every operation takes the engine lock for its whole duration, so
/// samples, refreshes and ticks never interleave.
#[derive(Clone)]
pub struct GestureHandle {
    engine: Arc<Mutex<GestureEngine>>,
}

impl GestureHandle {
    pub fn new(engine: GestureEngine) -> Self {
        Self {
            engine: Arc::new(Mutex::new(engine)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, GestureEngine> {
        self.engine.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn process_sample(&self, sample: &MeasurementSample) {
        self.lock().process(sample);
    }

    pub fn calibrate(&self, sample: &MeasurementSample) {
        self.lock().calibrate(sample);
    }

    pub fn request_recalibration(&self) {
        self.lock().request_recalibration();
    }

    pub fn refresh_settings(&self) {
        self.lock().refresh_settings();
    }

    /// Flip the pause state, returning whether tracking is now paused.
    pub fn toggle_pause(&self) -> bool {
        let mut engine = self.lock();
        let paused = !engine.is_paused();
        engine.set_paused(paused);
        paused
    }

    /// Run `f` inside the critical section.
    pub fn with_engine<R>(&self, f: impl FnOnce(&mut GestureEngine) -> R) -> R {
        let mut engine = self.lock();
        f(&mut *engine)
    }
}

/// Owns the engine handle and its two background tasks.
pub struct GestureService {
    handle: GestureHandle,
    stop_flag: Arc<AtomicBool>,
    tasks: Vec<JoinHandle<()>>,
}

impl GestureService {
    /// Start the watchdog and release ticker. Must be called inside a
    /// tokio runtime.
    pub fn start(engine: GestureEngine, timeout: &TimeoutConfig) -> Self {
        let handle = GestureHandle::new(engine);
        let stop_flag = Arc::new(AtomicBool::new(false));
        let monitor = InputTimeoutMonitor::from_config(timeout);

        let watchdog = spawn_ticker(
            handle.clone(),
            stop_flag.clone(),
            timeout.poll_interval(),
            move |engine, now| {
                monitor.check(engine, now);
            },
        );
        let releaser = spawn_ticker(
            handle.clone(),
            stop_flag.clone(),
            timeout.release_tick(),
            |engine, now| {
                let released = engine.poll_scheduled_releases(now);
                if released > 0 {
                    tracing::trace!(released, "Scheduled releases fired");
                }
            },
        );

        tracing::info!(
            timeout_ms = timeout.input_timeout_ms,
            poll_ms = timeout.poll_interval_ms,
            "Gesture service started"
        );

        Self {
            handle,
            stop_flag,
            tasks: vec![watchdog, releaser],
        }
    }

    pub fn handle(&self) -> GestureHandle {
        self.handle.clone()
    }

    /// Flag shared with producers that should stop with the service.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.stop_flag.clone()
    }

    pub fn process_sample(&self, sample: &MeasurementSample) {
        self.handle.process_sample(sample);
    }

    pub fn calibrate(&self, sample: &MeasurementSample) {
        self.handle.calibrate(sample);
    }

    pub fn request_recalibration(&self) {
        self.handle.request_recalibration();
    }

    pub fn refresh_settings(&self) {
        self.handle.refresh_settings();
    }

    /// Stop the background tasks and release everything still held.
    pub async fn shutdown(self) {
        self.stop_flag.store(true, Ordering::Relaxed);
        for task in self.tasks {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Gesture service task ended abnormally");
            }
        }
        self.handle.with_engine(GestureEngine::shutdown);
        tracing::info!("Gesture service stopped");
    }
}

fn spawn_ticker<F>(
    handle: GestureHandle,
    stop_flag: Arc<AtomicBool>,
    period: Duration,
    mut tick: F,
) -> JoinHandle<()>
where
    F: FnMut(&mut GestureEngine, Instant) + Send + 'static,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            if stop_flag.load(Ordering::Relaxed) {
                break;
            }
            handle.with_engine(|engine| tick(engine, Instant::now()));
        }
    })
}
