//! Hotkey matching and the binding registry.
//!
//! The matcher tracks the live set of currently pressed canonical symbols,
//! updated by key-down and key-up events in the order the platform emits
//! them. A registered combination fires when it becomes *newly satisfied*:
//! its full symbol set is a subset of the pressed set and it was not
//! already satisfied on the previous check. Matching is edge-triggered, so
//! holding a combination (and the OS key-repeat that comes with it) fires
//! exactly once per press cycle.
//!
//! A per-combination debounce window additionally suppresses a second fire
//! of the same combination shortly after the first, even when the keys are
//! released and pressed again inside the window. This absorbs event jitter;
//! deliberate re-presses beyond the window fire normally.
//!
//! The registry maps each combination to a [`HotkeyAction`]. At most one
//! binding exists per combination; registering a duplicate silently
//! replaces the previous one (last registered wins, logged as a warning).
//! When several combinations are satisfied by the same key-down, the order
//! of the returned actions is unspecified.

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::keys::{self, KeyCombination};
use crate::script::ScriptId;

/// Minimum time between accepted fires of the same combination.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// What a matched combination triggers. Resolved by the run controller;
/// the matcher knows nothing about scripts beyond their ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotkeyAction {
    /// Invoke the execution engine on the identified script.
    TriggerScript(ScriptId),
}

/// Edge-triggered, debounced hotkey matcher.
#[derive(Debug)]
pub struct HotkeyMatcher {
    bindings: Vec<(KeyCombination, HotkeyAction)>,
    pressed: HashSet<String>,
    satisfied: HashSet<KeyCombination>,
    last_fired: HashMap<KeyCombination, Instant>,
    debounce: Duration,
}

impl Default for HotkeyMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl HotkeyMatcher {
    pub fn new() -> Self {
        Self::with_debounce(DEFAULT_DEBOUNCE)
    }

    /// Create a matcher with a custom debounce window.
    pub fn with_debounce(debounce: Duration) -> Self {
        Self {
            bindings: Vec::new(),
            pressed: HashSet::new(),
            satisfied: HashSet::new(),
            last_fired: HashMap::new(),
            debounce,
        }
    }

    /// Register a binding. An empty combination is unbound and is never
    /// registered. Registering over an existing combination replaces it
    /// (last registered wins) and resets its edge state to unsatisfied.
    pub fn register(&mut self, combo: KeyCombination, action: HotkeyAction) {
        if combo.is_empty() {
            return;
        }
        self.satisfied.remove(&combo);
        self.last_fired.remove(&combo);
        if let Some(slot) = self.bindings.iter_mut().find(|(existing, _)| *existing == combo) {
            warn!(combo = %combo, "duplicate keybind registration, last one wins");
            slot.1 = action;
        } else {
            self.bindings.push((combo, action));
        }
    }

    /// Remove a binding and its edge/debounce state. Returns false when
    /// the combination was not registered.
    pub fn unregister(&mut self, combo: &KeyCombination) -> bool {
        self.satisfied.remove(combo);
        self.last_fired.remove(combo);
        let before = self.bindings.len();
        self.bindings.retain(|(existing, _)| existing != combo);
        self.bindings.len() != before
    }

    /// Replace the whole registry in one batch (run controller start).
    pub fn set_bindings<I>(&mut self, bindings: I)
    where
        I: IntoIterator<Item = (KeyCombination, HotkeyAction)>,
    {
        self.clear();
        for (combo, action) in bindings {
            self.register(combo, action);
        }
    }

    /// Tear down the whole registry (run controller stop). The pressed-key
    /// state survives: keys physically held do not release on stop.
    pub fn clear(&mut self) {
        self.bindings.clear();
        self.satisfied.clear();
        self.last_fired.clear();
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Process a key-down event and return the actions to fire. Never
    /// blocks and never fails: unrecognized identifiers are normalized and
    /// treated as opaque symbols.
    pub fn on_key_down(&mut self, raw: &str) -> Vec<HotkeyAction> {
        let symbol = keys::normalize(raw);
        self.pressed.insert(symbol);

        let now = Instant::now();
        let mut fired = Vec::new();
        for index in 0..self.bindings.len() {
            let (combo, action) = &self.bindings[index];
            if !combo.is_satisfied_by(&self.pressed) || self.satisfied.contains(combo) {
                continue;
            }
            let combo = combo.clone();
            let action = *action;
            self.satisfied.insert(combo.clone());

            let debounced = self
                .last_fired
                .get(&combo)
                .is_some_and(|last| now.duration_since(*last) < self.debounce);
            if debounced {
                debug!(combo = %combo, "suppressed re-fire inside debounce window");
                continue;
            }
            self.last_fired.insert(combo, now);
            fired.push(action);
        }
        fired
    }

    /// Process a key-up event. Combinations that are no longer fully
    /// pressed drop out of the satisfied set and may fire again on the
    /// next complete press.
    pub fn on_key_up(&mut self, raw: &str) {
        let symbol = keys::normalize(raw);
        self.pressed.remove(&symbol);
        let pressed = &self.pressed;
        self.satisfied.retain(|combo| combo.is_satisfied_by(pressed));
    }
}
