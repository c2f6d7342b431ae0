//! Keybind capture.
//!
//! A capture is a small state machine fed by the same global key-event
//! stream the dispatcher listens to; it never blocks the listener, it is
//! just a different handler mode for incoming events. The run controller
//! holds at most one [`KeybindRecorder`] at a time -- "idle" is simply the
//! absence of one, and starting a new capture finalizes any active one
//! first.
//!
//! Key-downs accumulate normalized symbols in first-seen order (duplicates
//! and OS key-repeat are ignored). How a capture ends depends on its
//! [`CapturePolicy`]:
//!
//! - [`CapturePolicy::FirstRelease`]: the capture finishes on the first
//!   release of a non-modifier key, provided at least one key has been
//!   accumulated. Holding modifiers and tapping the trigger key works
//!   regardless of release order.
//! - [`CapturePolicy::ExplicitStop`]: releases are ignored; the capture
//!   finishes when the stop key (Escape) is pressed, when [`stop`] is
//!   called, or at the deadline, whichever comes first.
//!
//! A capture that finishes with zero accumulated keys is a failure
//! ([`ClickScriptError::CaptureFailed`]), distinct from an empty-but-valid
//! combination, which cannot be produced here.
//!
//! [`stop`]: KeybindRecorder::stop

use std::time::{Duration, Instant};

use crate::error::{ClickScriptError, Result};
use crate::keys::{self, KeyCombination};

/// How long a capture may run before it is finalized with whatever has
/// been accumulated so far.
pub const DEFAULT_CAPTURE_TIMEOUT: Duration = Duration::from_secs(15);

/// The key that terminates an explicit-stop capture.
pub const STOP_KEY: &str = "escape";

/// Termination policy for a keybind capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapturePolicy {
    /// Finish on the first release of a non-modifier key.
    FirstRelease,
    /// Finish only on the stop key, an explicit stop, or the timeout.
    ExplicitStop,
}

/// A single keybind capture in progress.
#[derive(Debug)]
pub struct KeybindRecorder {
    policy: CapturePolicy,
    /// Normalized symbols in first-seen order.
    accumulated: Vec<String>,
    deadline: Instant,
}

impl KeybindRecorder {
    /// Begin a capture with a fresh accumulation and a deadline.
    pub fn start(policy: CapturePolicy, timeout: Duration) -> Self {
        Self {
            policy,
            accumulated: Vec::new(),
            deadline: Instant::now() + timeout,
        }
    }

    /// Feed a key-down event. Returns the capture outcome once the capture
    /// has terminated, `None` while it is still running.
    pub fn on_key_down(&mut self, raw: &str) -> Option<Result<KeyCombination>> {
        if self.expired() {
            return Some(self.finish());
        }
        let symbol = keys::normalize(raw);
        if self.policy == CapturePolicy::ExplicitStop && symbol == STOP_KEY {
            return Some(self.finish());
        }
        if !self.accumulated.contains(&symbol) {
            self.accumulated.push(symbol);
        }
        None
    }

    /// Feed a key-up event. Returns the capture outcome once the capture
    /// has terminated, `None` while it is still running.
    pub fn on_key_up(&mut self, raw: &str) -> Option<Result<KeyCombination>> {
        if self.expired() {
            return Some(self.finish());
        }
        if self.policy == CapturePolicy::FirstRelease {
            let symbol = keys::normalize(raw);
            if !keys::is_modifier(&symbol) && !self.accumulated.is_empty() {
                return Some(self.finish());
            }
        }
        None
    }

    /// Finalize the capture immediately with whatever has accumulated.
    pub fn stop(&mut self) -> Result<KeyCombination> {
        self.finish()
    }

    /// Whether the capture deadline has passed.
    pub fn expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    /// The instant at which the capture times out.
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    fn finish(&mut self) -> Result<KeyCombination> {
        let accumulated = std::mem::take(&mut self.accumulated);
        if accumulated.is_empty() {
            Err(ClickScriptError::capture_failed(
                "no keys captured before stop or timeout",
            ))
        } else {
            Ok(KeyCombination::from_raw(accumulated))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder(policy: CapturePolicy) -> KeybindRecorder {
        KeybindRecorder::start(policy, Duration::from_secs(60))
    }

    #[test]
    fn release_policy_finishes_on_first_nonmodifier_release() {
        let mut rec = recorder(CapturePolicy::FirstRelease);
        assert!(rec.on_key_down("ControlLeft").is_none());
        assert!(rec.on_key_down("Alt").is_none());
        assert!(rec.on_key_down("P").is_none());
        // OS key-repeat while holding
        assert!(rec.on_key_down("P").is_none());

        let combo = rec.on_key_up("P").unwrap().unwrap();
        assert_eq!(combo.to_string(), "Alt+Ctrl+P");
    }

    #[test]
    fn release_policy_result_is_independent_of_press_order() {
        let mut a = recorder(CapturePolicy::FirstRelease);
        a.on_key_down("P");
        a.on_key_down("ControlLeft");
        a.on_key_down("Alt");
        let a = a.on_key_up("p").unwrap().unwrap();

        let mut b = recorder(CapturePolicy::FirstRelease);
        b.on_key_down("Alt");
        b.on_key_down("ControlRight");
        b.on_key_down("p");
        let b = b.on_key_up("P").unwrap().unwrap();

        assert_eq!(a, b);
        assert_eq!(a.to_string(), "Alt+Ctrl+P");
    }

    #[test]
    fn release_policy_ignores_modifier_releases() {
        let mut rec = recorder(CapturePolicy::FirstRelease);
        rec.on_key_down("ControlLeft");
        rec.on_key_down("p");
        // letting go of a modifier first does not end the capture
        assert!(rec.on_key_up("ControlLeft").is_none());
        let combo = rec.on_key_up("p").unwrap().unwrap();
        assert_eq!(combo.to_string(), "Ctrl+P");
    }

    #[test]
    fn release_policy_ignores_stray_release_with_empty_accumulation() {
        let mut rec = recorder(CapturePolicy::FirstRelease);
        // release of a key pressed before the capture started
        assert!(rec.on_key_up("x").is_none());
        rec.on_key_down("f6");
        let combo = rec.on_key_up("f6").unwrap().unwrap();
        assert_eq!(combo.to_string(), "F6");
    }

    #[test]
    fn explicit_stop_policy_finishes_on_stop_key() {
        let mut rec = recorder(CapturePolicy::ExplicitStop);
        rec.on_key_down("ControlLeft");
        rec.on_key_down("a");
        // releases never terminate this policy
        assert!(rec.on_key_up("a").is_none());
        assert!(rec.on_key_up("ControlLeft").is_none());

        let combo = rec.on_key_down("Escape").unwrap().unwrap();
        assert_eq!(combo.to_string(), "Ctrl+A");
        assert!(!combo.contains("escape"));
    }

    #[test]
    fn stop_with_no_keys_is_a_failure_not_an_empty_combination() {
        let mut rec = recorder(CapturePolicy::ExplicitStop);
        let err = rec.stop().unwrap_err();
        assert!(matches!(err, ClickScriptError::CaptureFailed { .. }));
    }

    #[test]
    fn stop_key_with_no_keys_is_a_failure() {
        let mut rec = recorder(CapturePolicy::ExplicitStop);
        let outcome = rec.on_key_down("Escape").unwrap();
        assert!(outcome.is_err());
    }

    #[test]
    fn timeout_finalizes_with_accumulated_keys() {
        let mut rec = KeybindRecorder::start(CapturePolicy::ExplicitStop, Duration::ZERO);
        // deadline already passed: the next event finalizes
        let outcome = rec.on_key_down("a").unwrap();
        assert!(outcome.is_err());

        let mut rec = KeybindRecorder::start(CapturePolicy::ExplicitStop, Duration::from_secs(60));
        rec.on_key_down("ctrl");
        rec.on_key_down("s");
        rec.deadline = Instant::now() - Duration::from_millis(1);
        let combo = rec.on_key_up("anything").unwrap().unwrap();
        assert_eq!(combo.to_string(), "Ctrl+S");
    }

    #[test]
    fn explicit_stop_returns_accumulated_keys() {
        let mut rec = recorder(CapturePolicy::ExplicitStop);
        rec.on_key_down("shift");
        rec.on_key_down("f2");
        let combo = rec.stop().unwrap();
        assert_eq!(combo.to_string(), "Shift+F2");
    }
}
