//! Background layout engine.
//!
//! Runs a [`ForceSimulation`] on its own tokio task. The simulation ticks on
//! a fixed interval and hands a [`LayoutFrame`] to the observer at most once
//! per emit interval. Once the layout settles the task parks until an update
//! or a stop wakes it.
//!
//! Key properties:
//! - Ticking never blocks the caller; updates and hit tests take a short lock
//! - A settled engine costs no wakeups
//! - Frames are throttled; call [`LayoutEngine::frame`] for the latest state

use egui::Pos2;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::LayoutConfig;
use crate::force_sim::{ForceSimulation, LayoutFrame, LayoutInput, UpdateSummary};

struct Shared {
    sim: Mutex<ForceSimulation>,
    running: AtomicBool,
    wake: Notify,
}

impl Shared {
    /// A panic inside an observer never leaves the simulation half-stepped,
    /// so a poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, ForceSimulation> {
        self.sim.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Handle to a running layout.
pub struct LayoutEngine {
    shared: Arc<Shared>,
    task: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for LayoutEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayoutEngine")
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl LayoutEngine {
    /// Spawn the tick loop. Must be called inside a tokio runtime.
    pub fn start<F>(initial: LayoutInput, config: LayoutConfig, on_tick: F) -> Self
    where
        F: FnMut(LayoutFrame) + Send + 'static,
    {
        let sim = ForceSimulation::with_input(config, initial);
        let shared = Arc::new(Shared {
            sim: Mutex::new(sim),
            running: AtomicBool::new(true),
            wake: Notify::new(),
        });
        let task = tokio::spawn(run(Arc::clone(&shared), on_tick));
        Self {
            shared,
            task: Some(task),
        }
    }

    /// Merge new input and reheat.
    pub fn update(&self, input: LayoutInput) -> UpdateSummary {
        let summary = self.shared.lock().update(input);
        self.shared.wake.notify_one();
        summary
    }

    /// Id of the node under a simulation-space point.
    pub fn hit_test(&self, point: Pos2) -> Option<String> {
        self.shared.lock().pick(point).map(|node| node.id.clone())
    }

    /// Latest state, regardless of throttling.
    pub fn frame(&self) -> LayoutFrame {
        self.shared.lock().frame()
    }

    pub fn is_settled(&self) -> bool {
        self.shared.lock().is_settled()
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    pub fn pin(&self, id: &str) {
        self.shared.lock().pin(id);
    }

    pub fn unpin(&self, id: &str) {
        self.shared.lock().unpin(id);
    }

    /// Move a node (typically while dragged) and keep the layout alive.
    pub fn move_node(&self, id: &str, position: Pos2) {
        {
            let mut sim = self.shared.lock();
            sim.move_node(id, position);
            let reheat = sim.config().reheat_alpha;
            if sim.alpha() < reheat {
                sim.reheat(reheat);
            }
        }
        self.shared.wake.notify_one();
    }

    /// Ask the loop to exit. No frame is emitted after the loop observes it.
    pub fn stop(&self) {
        self.shared.running.store(false, Ordering::Release);
        self.shared.wake.notify_one();
    }

    /// Stop and wait for the loop to exit.
    pub async fn shutdown(mut self) {
        self.stop();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = ?e, "layout task ended abnormally");
            }
        }
    }
}

impl Drop for LayoutEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run<F>(shared: Arc<Shared>, mut on_tick: F)
where
    F: FnMut(LayoutFrame) + Send + 'static,
{
    let (tick_every, emit_every) = {
        let sim = shared.lock();
        (sim.config().tick_interval(), sim.config().emit_interval())
    };
    let mut ticker = interval(tick_every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last_emit: Option<Instant> = None;

    info!(
        tick_ms = tick_every.as_millis() as u64,
        emit_ms = emit_every.as_millis() as u64,
        "layout engine started"
    );

    loop {
        ticker.tick().await;
        if !shared.running.load(Ordering::Acquire) {
            break;
        }

        let now = Instant::now();
        let (frame, settled) = {
            let mut sim = shared.lock();
            let active = sim.tick();
            let due = last_emit.map_or(true, |at| now.duration_since(at) >= emit_every);
            let frame = (active && due).then(|| sim.frame());
            (frame, !active)
        };

        if let Some(frame) = frame {
            last_emit = Some(now);
            on_tick(frame);
        }

        if settled {
            debug!("layout settled, parking");
            shared.wake.notified().await;
            if !shared.running.load(Ordering::Acquire) {
                break;
            }
            debug!("layout woken");
            ticker.reset();
        }
    }

    info!("layout engine stopped");
}
