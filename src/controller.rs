//! Run control.
//!
//! The [`RunController`] owns the lifecycle of the binding registry and the
//! single pump task that consumes the global key-event stream. The pump
//! runs the matcher synchronously on each event and never blocks: a
//! matched combination resolves to an owned script snapshot and is handed
//! off to a fresh execution task immediately.
//!
//! `start()` registers every script with a non-empty keybind as one batch,
//! replacing any prior registry wholesale; `stop()` tears the registry
//! down. Stopping only prevents *new* triggers -- in-flight executions run
//! to completion deterministically.
//!
//! Keybind capture rides the same event stream: while a capture is active,
//! events feed the recorder instead of the matcher, so rebinding never
//! fires scripts mid-capture.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::error::{ClickScriptError, Result};
use crate::executor::{Executor, RunOutcome};
use crate::keys::KeyCombination;
use crate::listener::KeyEvent;
use crate::matcher::{HotkeyAction, HotkeyMatcher};
use crate::pointer::PointerDriver;
use crate::recorder::{CapturePolicy, KeybindRecorder, DEFAULT_CAPTURE_TIMEOUT};
use crate::script::{ScriptId, ScriptSet};

/// Whether hotkey dispatch is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Stopped,
    Running,
}

/// Scripts shared between the controller, the editing surfaces, and the
/// persistence layer.
pub type SharedScripts = Arc<RwLock<ScriptSet>>;

struct ActiveCapture {
    recorder: KeybindRecorder,
    done: oneshot::Sender<Result<KeyCombination>>,
    generation: u64,
}

struct RunningScript {
    seq: u64,
    cancel: CancellationToken,
}

struct Shared {
    scripts: SharedScripts,
    matcher: Mutex<HotkeyMatcher>,
    capture: Mutex<Option<ActiveCapture>>,
    capture_seq: AtomicU64,
    running: Mutex<HashMap<ScriptId, RunningScript>>,
    run_seq: AtomicU64,
    state_tx: watch::Sender<RunState>,
}

/// Awaitable handle to an in-flight keybind capture.
pub struct CaptureHandle {
    rx: oneshot::Receiver<Result<KeyCombination>>,
}

impl CaptureHandle {
    /// Wait for the capture to finish.
    pub async fn wait(self) -> Result<KeyCombination> {
        match self.rx.await {
            Ok(outcome) => outcome,
            Err(_) => Err(ClickScriptError::capture_failed("capture abandoned")),
        }
    }
}

/// Owns the global on/off state gating hotkey dispatch.
pub struct RunController {
    shared: Arc<Shared>,
    state_rx: watch::Receiver<RunState>,
}

impl RunController {
    /// Create a controller and spawn its pump over `events`. Must be
    /// called within a tokio runtime.
    pub fn new(
        scripts: SharedScripts,
        pointer: Arc<Mutex<dyn PointerDriver>>,
        events: mpsc::UnboundedReceiver<KeyEvent>,
    ) -> Self {
        Self::with_debounce(scripts, pointer, events, crate::matcher::DEFAULT_DEBOUNCE)
    }

    /// Like [`RunController::new`] with a custom matcher debounce window.
    pub fn with_debounce(
        scripts: SharedScripts,
        pointer: Arc<Mutex<dyn PointerDriver>>,
        events: mpsc::UnboundedReceiver<KeyEvent>,
        debounce: Duration,
    ) -> Self {
        let (state_tx, state_rx) = watch::channel(RunState::Stopped);
        let shared = Arc::new(Shared {
            scripts,
            matcher: Mutex::new(HotkeyMatcher::with_debounce(debounce)),
            capture: Mutex::new(None),
            capture_seq: AtomicU64::new(0),
            running: Mutex::new(HashMap::new()),
            run_seq: AtomicU64::new(0),
            state_tx,
        });
        let executor = Executor::new(pointer);

        tokio::spawn(pump(Arc::clone(&shared), executor, events));

        Self { shared, state_rx }
    }

    /// Register every script with a non-empty keybind, replacing any prior
    /// registry wholesale. Calling this while already running rebuilds the
    /// registry from the current script list, picking up edited keybinds.
    pub fn start(&self) {
        let bindings: Vec<(KeyCombination, HotkeyAction)> = {
            let scripts = self.shared.scripts.read();
            scripts
                .iter()
                .filter(|(_, script)| !script.keybind.is_empty())
                .map(|(id, script)| (script.keybind.clone(), HotkeyAction::TriggerScript(id)))
                .collect()
        };
        let registered = {
            let mut matcher = self.shared.matcher.lock();
            matcher.set_bindings(bindings);
            matcher.len()
        };
        self.shared.state_tx.send_replace(RunState::Running);
        info!(bindings = registered, "hotkey dispatch running");
    }

    /// Unregister every binding. In-flight executions are not cancelled;
    /// stopping only prevents new triggers. No-op while already stopped.
    pub fn stop(&self) {
        let was_running =
            self.shared.state_tx.send_replace(RunState::Stopped) == RunState::Running;
        if was_running {
            self.shared.matcher.lock().clear();
            info!("hotkey dispatch stopped");
        }
    }

    /// Current dispatch state.
    pub fn state(&self) -> RunState {
        *self.state_rx.borrow()
    }

    /// Watch dispatch state changes. The state drops to [`RunState::Stopped`]
    /// without a `stop()` call when the key-event stream is lost.
    pub fn subscribe_state(&self) -> watch::Receiver<RunState> {
        self.state_rx.clone()
    }

    /// Number of script invocations currently in flight.
    pub fn active_runs(&self) -> usize {
        self.shared.running.lock().len()
    }

    /// Cancel every in-flight invocation at target granularity.
    pub fn cancel_all(&self) {
        let mut running = self.shared.running.lock();
        for (_, run) in running.drain() {
            run.cancel.cancel();
        }
    }

    /// Begin a keybind capture with the default 15s timeout.
    pub fn begin_capture(&self, policy: CapturePolicy) -> CaptureHandle {
        self.begin_capture_with_timeout(policy, DEFAULT_CAPTURE_TIMEOUT)
    }

    /// Begin a keybind capture. A capture already in progress is finalized
    /// first with stop semantics; no two captures run concurrently.
    pub fn begin_capture_with_timeout(
        &self,
        policy: CapturePolicy,
        timeout: Duration,
    ) -> CaptureHandle {
        let (tx, rx) = oneshot::channel();
        let generation = self.shared.capture_seq.fetch_add(1, Ordering::Relaxed);
        {
            let mut slot = self.shared.capture.lock();
            if let Some(ActiveCapture { mut recorder, done, .. }) = slot.take() {
                let _ = done.send(recorder.stop());
            }
            *slot = Some(ActiveCapture {
                recorder: KeybindRecorder::start(policy, timeout),
                done: tx,
                generation,
            });
        }

        // Watchdog: enforce the deadline even if no further key events
        // arrive to drive the recorder.
        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            let mut slot = shared.capture.lock();
            if slot.as_ref().map(|c| c.generation) == Some(generation) {
                if let Some(ActiveCapture { mut recorder, done, .. }) = slot.take() {
                    let _ = done.send(recorder.stop());
                }
            }
        });

        CaptureHandle { rx }
    }

    /// Explicitly finalize the active capture, if any.
    pub fn stop_capture(&self) {
        let mut slot = self.shared.capture.lock();
        if let Some(ActiveCapture { mut recorder, done, .. }) = slot.take() {
            let _ = done.send(recorder.stop());
        }
    }

}

/// The single task consuming the key-event stream.
async fn pump(
    shared: Arc<Shared>,
    executor: Executor,
    mut events: mpsc::UnboundedReceiver<KeyEvent>,
) {
    while let Some(event) = events.recv().await {
        if feed_capture(&shared, &event) {
            continue;
        }
        let fired = {
            let mut matcher = shared.matcher.lock();
            match &event {
                KeyEvent::Down(raw) => matcher.on_key_down(raw),
                KeyEvent::Up(raw) => {
                    matcher.on_key_up(raw);
                    Vec::new()
                }
            }
        };
        for action in fired {
            dispatch(&shared, &executor, action);
        }
    }

    // The platform stream is gone; dispatch cannot continue.
    error!("key event stream closed, run mode stopped unexpectedly");
    shared.matcher.lock().clear();
    shared.state_tx.send_replace(RunState::Stopped);
}

/// Route an event into the active capture. Returns false when no capture
/// is active, in which case the event goes to the matcher instead.
fn feed_capture(shared: &Shared, event: &KeyEvent) -> bool {
    let mut slot = shared.capture.lock();
    let outcome = {
        let Some(active) = slot.as_mut() else {
            return false;
        };
        match event {
            KeyEvent::Down(raw) => active.recorder.on_key_down(raw),
            KeyEvent::Up(raw) => active.recorder.on_key_up(raw),
        }
    };
    if let Some(result) = outcome {
        if let Some(finished) = slot.take() {
            let _ = finished.done.send(result);
        }
    }
    true
}

/// Resolve a fired action and hand it off to a fresh execution task.
///
/// Re-triggering a script that is already running cancels that run instead
/// of starting a second copy (the hotkey toggles the script); distinct
/// scripts always run concurrently.
fn dispatch(shared: &Arc<Shared>, executor: &Executor, action: HotkeyAction) {
    let HotkeyAction::TriggerScript(id) = action;

    {
        let mut running = shared.running.lock();
        if let Some(run) = running.remove(&id) {
            if !run.cancel.is_cancelled() {
                info!(script_id = ?id, "hotkey re-trigger, stopping running script");
                run.cancel.cancel();
                return;
            }
        }
    }

    // Snapshot the script at fire time; concurrent edits cannot touch
    // this invocation.
    let Some(script) = shared.scripts.read().get(id).cloned() else {
        warn!(script_id = ?id, "binding fired for a deleted script");
        return;
    };

    let cancel = CancellationToken::new();
    let seq = shared.run_seq.fetch_add(1, Ordering::Relaxed);
    shared.running.lock().insert(
        id,
        RunningScript {
            seq,
            cancel: cancel.clone(),
        },
    );

    let name = script.name.clone();
    let executor = executor.clone();
    let shared = Arc::clone(shared);
    tokio::spawn(async move {
        info!(script = %name, "script started");
        match executor.execute(script, cancel).await {
            Ok(RunOutcome::Completed) => info!(script = %name, "script completed"),
            Ok(RunOutcome::Cancelled) => info!(script = %name, "script cancelled"),
            // contained: one invocation's failure never reaches the pump
            // or sibling executions
            Err(e) => error!(script = %name, "script failed: {e}"),
        }
        let mut running = shared.running.lock();
        if running.get(&id).is_some_and(|run| run.seq == seq) {
            running.remove(&id);
        }
    });
}
