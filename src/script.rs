//! Script and target data model.
//!
//! A [`Script`] is an ordered list of [`Target`]s plus the key combination
//! that triggers it. Targets have positional identity only: they are created
//! by adding to a script, destroyed by removing from it, and their order is
//! the execution order. The overlay/edit surfaces mutate scripts exclusively
//! through [`Script::add_target`], [`Script::remove_target`],
//! [`Script::move_target`], and [`Script::set_editing`].

use serde::{Deserialize, Serialize};

use crate::error::{ClickScriptError, Result};
use crate::keys::KeyCombination;

/// One step of a script: a screen coordinate plus the wait before the click.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub x: i32,
    pub y: i32,
    /// Wait before clicking this target, in milliseconds.
    pub delay_ms: u64,
}

fn default_return_delay_ms() -> u64 {
    500
}

/// A named, hotkey-bound sequence of click targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Script {
    pub name: String,
    /// Trigger combination. Empty means unbound: the script is never
    /// registered with the dispatcher.
    #[serde(default)]
    pub keybind: KeyCombination,
    /// Move the pointer back to where it was before the run started.
    #[serde(default)]
    pub return_mouse: bool,
    /// Wait before the return move, in milliseconds.
    #[serde(default = "default_return_delay_ms")]
    pub return_delay_ms: u64,
    #[serde(default)]
    pub targets: Vec<Target>,
    /// True while an overlay/edit surface is positioning this script's
    /// targets. Session-only state, never persisted.
    #[serde(skip)]
    pub editing: bool,
}

impl Script {
    /// Create an empty, unbound script.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            keybind: KeyCombination::new(),
            return_mouse: false,
            return_delay_ms: default_return_delay_ms(),
            targets: Vec::new(),
            editing: false,
        }
    }

    /// Append a target; insertion order is execution order.
    pub fn add_target(&mut self, target: Target) {
        self.targets.push(target);
    }

    /// Remove the target at `index`, shifting later targets down.
    pub fn remove_target(&mut self, index: usize) -> Option<Target> {
        if index < self.targets.len() {
            Some(self.targets.remove(index))
        } else {
            None
        }
    }

    /// Reorder by index: take the target at `from` and re-insert it at `to`.
    /// Returns false when either index is out of range.
    pub fn move_target(&mut self, from: usize, to: usize) -> bool {
        if from >= self.targets.len() || to >= self.targets.len() {
            return false;
        }
        let target = self.targets.remove(from);
        self.targets.insert(to, target);
        true
    }

    /// Flag the script as being edited by an overlay surface.
    pub fn set_editing(&mut self, editing: bool) {
        self.editing = editing;
    }

    /// Check the script's own invariants.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(ClickScriptError::script_validation(
                "script name cannot be empty",
            ));
        }
        Ok(())
    }
}

/// Opaque handle identifying a script within a [`ScriptSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScriptId(u64);

/// The in-memory script store. Assigns stable ids and preserves insertion
/// order, which is also the registration order used by the run controller.
#[derive(Debug, Default)]
pub struct ScriptSet {
    next_id: u64,
    entries: Vec<(ScriptId, Script)>,
}

impl ScriptSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from loaded scripts, assigning fresh ids in order.
    pub fn from_scripts(scripts: Vec<Script>) -> Self {
        let mut set = Self::new();
        for script in scripts {
            set.add(script);
        }
        set
    }

    /// Add a script and return its id.
    pub fn add(&mut self, script: Script) -> ScriptId {
        let id = ScriptId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, script));
        id
    }

    /// Remove a script by id.
    pub fn remove(&mut self, id: ScriptId) -> Option<Script> {
        let index = self.entries.iter().position(|(entry_id, _)| *entry_id == id)?;
        Some(self.entries.remove(index).1)
    }

    pub fn get(&self, id: ScriptId) -> Option<&Script> {
        self.entries
            .iter()
            .find(|(entry_id, _)| *entry_id == id)
            .map(|(_, script)| script)
    }

    pub fn get_mut(&mut self, id: ScriptId) -> Option<&mut Script> {
        self.entries
            .iter_mut()
            .find(|(entry_id, _)| *entry_id == id)
            .map(|(_, script)| script)
    }

    /// Iterate scripts in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (ScriptId, &Script)> {
        self.entries.iter().map(|(id, script)| (*id, script))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Clone out the scripts in insertion order, e.g. for saving.
    pub fn scripts(&self) -> Vec<Script> {
        self.entries.iter().map(|(_, script)| script.clone()).collect()
    }

    /// Validate every script in the set.
    pub fn validate(&self) -> Result<()> {
        for (_, script) in self.iter() {
            script.validate()?;
        }
        Ok(())
    }
}
