use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use soundsentry_alarm::AlarmTrigger;
use soundsentry_audio::SampleSource;
use soundsentry_foundation::{
    AppError, AudioError, DiagnosticSink, MonitorError, MonitorState, SharedClock, StateManager,
};
use soundsentry_level::constants::CALIBRATION_POLL_INTERVAL;
use soundsentry_level::{mean_level, AlarmState, LevelEstimator, MonitorConfig, Reading};

use crate::stats::MonitorStats;

/// How long spawn() waits for the source factory to open the device.
const OPEN_TIMEOUT: Duration = Duration::from_secs(5);

enum ControlMsg {
    Calibrate {
        duration: Duration,
        reply: Sender<Result<f32, MonitorError>>,
    },
}

/// Foreground handle to a running monitor.
///
/// The monitor itself is a dedicated thread that owns the capture stream.
/// The handle exposes the control surface: threshold and cooldown setters
/// (effective on the next evaluation), blocking calibration, and stop.
/// `stop` consumes the handle, so the device release runs exactly once.
pub struct MonitorHandle {
    handle: JoinHandle<()>,
    running: Arc<AtomicBool>,
    shared: Arc<Mutex<AlarmState>>,
    control_tx: Sender<ControlMsg>,
    state: StateManager,
    stats: Arc<MonitorStats>,
}

impl MonitorHandle {
    /// Spawn the monitor thread.
    ///
    /// `source_factory` runs inside the thread because capture streams are
    /// not `Send`; spawn() blocks until the device is open and reports an
    /// open failure directly, leaving the monitor Idle.
    pub fn spawn<S, F>(
        config: MonitorConfig,
        source_factory: F,
        alarm: Arc<dyn AlarmTrigger>,
        sink: Arc<dyn DiagnosticSink>,
        clock: SharedClock,
    ) -> Result<Self, AppError>
    where
        S: SampleSource + 'static,
        F: FnOnce() -> Result<S, AudioError> + Send + 'static,
    {
        config.validate().map_err(AppError::Config)?;

        let running = Arc::new(AtomicBool::new(true));
        let shared = Arc::new(Mutex::new(AlarmState::new(
            config.threshold_db,
            config.cooldown(),
        )));
        let stats = Arc::new(MonitorStats::default());
        let state = StateManager::new();

        let (open_tx, open_rx) = bounded::<Result<(), AudioError>>(1);
        let (control_tx, control_rx) = unbounded::<ControlMsg>();

        let thread_running = Arc::clone(&running);
        let thread_shared = Arc::clone(&shared);
        let thread_stats = Arc::clone(&stats);
        let thread_config = config.clone();

        let handle = thread::Builder::new()
            .name("sound-monitor".to_string())
            .spawn(move || {
                let source = match source_factory() {
                    Ok(source) => {
                        let _ = open_tx.send(Ok(()));
                        source
                    }
                    Err(e) => {
                        let _ = open_tx.send(Err(e));
                        return;
                    }
                };
                run_loop(
                    source,
                    &thread_config,
                    &thread_shared,
                    &control_rx,
                    alarm.as_ref(),
                    sink.as_ref(),
                    &clock,
                    &thread_running,
                    &thread_stats,
                );
                // source drops here: the input device is released on every
                // exit path, exactly once
            })
            .map_err(|e| AppError::Monitor(MonitorError::Spawn(e.to_string())))?;

        match open_rx.recv_timeout(OPEN_TIMEOUT) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let _ = handle.join();
                return Err(AppError::Audio(e));
            }
            Err(_) => {
                running.store(false, Ordering::SeqCst);
                let _ = handle.join();
                return Err(AppError::Fatal(format!(
                    "Device open timed out after {:?}",
                    OPEN_TIMEOUT
                )));
            }
        }

        state.transition(MonitorState::Running)?;
        tracing::info!(
            "Monitoring started, alarm threshold {} dB",
            config.threshold_db
        );

        Ok(Self {
            handle,
            running,
            shared,
            control_tx,
            state,
            stats,
        })
    }

    pub fn state(&self) -> MonitorState {
        self.state.current()
    }

    pub fn subscribe_state(&self) -> Receiver<MonitorState> {
        self.state.subscribe()
    }

    pub fn stats(&self) -> Arc<MonitorStats> {
        Arc::clone(&self.stats)
    }

    pub fn threshold_db(&self) -> f32 {
        self.shared.lock().threshold_db()
    }

    /// Takes effect on the next evaluation cycle.
    pub fn set_threshold_db(&self, db: f32) {
        self.shared.lock().set_threshold_db(db);
    }

    pub fn cooldown(&self) -> Duration {
        self.shared.lock().cooldown()
    }

    /// Takes effect on the next evaluation cycle.
    pub fn set_cooldown(&self, cooldown: Duration) {
        self.shared.lock().set_cooldown(cooldown);
    }

    /// Measure the ambient level and return a suggested baseline.
    ///
    /// The measurement runs on the monitor thread, through the same capture
    /// stream the loop reads, so the device never has two logical readers.
    /// Blocks the caller for the full duration (plus at most one update
    /// interval until the loop services the request). Fails fast with
    /// `NotRunning` when the monitor has stopped.
    pub fn calibrate(&self, duration: Duration) -> Result<f32, MonitorError> {
        if !self.running.load(Ordering::SeqCst) {
            return Err(MonitorError::NotRunning);
        }
        let (reply_tx, reply_rx) = bounded(1);
        self.control_tx
            .send(ControlMsg::Calibrate {
                duration,
                reply: reply_tx,
            })
            .map_err(|_| MonitorError::NotRunning)?;
        reply_rx.recv().map_err(|_| MonitorError::NotRunning)?
    }

    /// Stop monitoring: halts polling within one update interval plus one
    /// device-read timeout, joins the thread, and releases the device.
    pub fn stop(self) -> Result<(), AppError> {
        self.state.transition(MonitorState::Stopping)?;
        self.running.store(false, Ordering::SeqCst);
        let _ = self.handle.join();
        self.state.transition(MonitorState::Stopped)?;
        tracing::info!("Monitoring stopped");
        Ok(())
    }
}

#[allow(clippy::too_many_arguments)]
fn run_loop<S: SampleSource>(
    mut source: S,
    config: &MonitorConfig,
    shared: &Mutex<AlarmState>,
    control_rx: &Receiver<ControlMsg>,
    alarm: &dyn AlarmTrigger,
    sink: &dyn DiagnosticSink,
    clock: &SharedClock,
    running: &AtomicBool,
    stats: &MonitorStats,
) {
    let estimator = LevelEstimator::new();
    let update_interval = config.update_interval();
    let alarm_duration = config.alarm_duration();

    while running.load(Ordering::SeqCst) {
        while let Ok(msg) = control_rx.try_recv() {
            match msg {
                ControlMsg::Calibrate { duration, reply } => {
                    let result = run_calibration(&mut source, &estimator, clock, duration);
                    let _ = reply.send(result);
                }
            }
        }
        if !running.load(Ordering::SeqCst) {
            break;
        }

        // A failed read is a 0 dB reading, never a reason to stop
        let db = match source.read_chunk() {
            Ok(buffer) => estimator.estimate(&buffer),
            Err(e) => {
                stats.read_errors.fetch_add(1, Ordering::Relaxed);
                sink.line(&format!("Error measuring sound level: {}", e));
                0.0
            }
        };
        let reading = Reading {
            db,
            at: clock.now(),
        };
        stats.record_level(reading.db);
        stats.cycles.fetch_add(1, Ordering::Relaxed);
        sink.line(&format!("Current sound level: {:.1} dB", reading.db));

        let fired_threshold = {
            let mut state = shared.lock();
            if state.should_trigger(reading.db, reading.at) {
                state.record_trigger(reading.at);
                Some(state.threshold_db())
            } else {
                None
            }
        };
        if let Some(threshold) = fired_threshold {
            stats.alarms_fired.fetch_add(1, Ordering::Relaxed);
            sink.line(&format!(
                "ALARM! Sound level ({:.1} dB) exceeded threshold ({:.1} dB)",
                reading.db, threshold
            ));
            alarm.trigger(alarm_duration);
        }

        clock.sleep(update_interval);
    }
}

/// Sample the ambient level at a fixed sub-interval for `duration`.
///
/// Runs to completion once started; there is no cancellation path. Failed
/// reads contribute a 0 reading, and exactly-zero readings are discarded by
/// the mean, so a window with nothing usable reports CalibrationEmpty
/// rather than a misleading 0.0 baseline.
fn run_calibration<S: SampleSource>(
    source: &mut S,
    estimator: &LevelEstimator,
    clock: &SharedClock,
    duration: Duration,
) -> Result<f32, MonitorError> {
    let started = clock.now();
    let mut readings = Vec::new();
    while clock.now().saturating_duration_since(started) < duration {
        let db = match source.read_chunk() {
            Ok(buffer) => estimator.estimate(&buffer),
            Err(e) => {
                tracing::trace!("Calibration read failed: {}", e);
                0.0
            }
        };
        readings.push(db);
        clock.sleep(CALIBRATION_POLL_INTERVAL);
    }
    tracing::debug!(
        "Calibration window done: {} raw readings",
        readings.len()
    );
    mean_level(&readings).ok_or(MonitorError::CalibrationEmpty)
}
