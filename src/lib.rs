//! # ClickScript
//!
//! A hotkey-driven mouse macro tool: define named scripts of timed click
//! targets, bind each to a global key combination, and replay them
//! system-wide regardless of which window has focus.
//!
//! ## Features
//!
//! - Scripts of screen-coordinate targets with per-target delays
//! - Global hotkey dispatch with edge-triggered matching and debounce
//! - Interactive keybind capture with two termination policies
//! - Optional return of the pointer to its pre-run position
//! - Concurrent script execution with cooperative cancellation
//! - JSON script files with tolerant defaults
//!
//! ## Example
//!
//! ```no_run
//! use clickscript::{KeyCombination, Script, Target};
//!
//! fn main() -> clickscript::Result<()> {
//!     let mut script = Script::new("farm loop");
//!     script.keybind = KeyCombination::parse("ctrl+alt+p")?;
//!     script.add_target(Target { x: 640, y: 400, delay_ms: 250 });
//!     script.add_target(Target { x: 120, y: 90, delay_ms: 100 });
//!     Ok(())
//! }
//! ```
//!
//! ## Script files
//!
//! ```json
//! {
//!   "scripts": [
//!     {
//!       "name": "farm loop",
//!       "keybind": ["alt", "ctrl", "p"],
//!       "return_mouse": true,
//!       "targets": [
//!         { "x": 640, "y": 400, "delay_ms": 250 }
//!       ]
//!     }
//!   ]
//! }
//! ```

pub mod config;
pub mod controller;
pub mod error;
pub mod executor;
pub mod keys;
pub mod listener;
pub mod matcher;
pub mod pointer;
pub mod recorder;
pub mod script;

pub use config::{load_scripts, save_scripts};
pub use controller::{CaptureHandle, RunController, RunState, SharedScripts};
pub use error::{ClickScriptError, Result};
pub use executor::{Executor, RunOutcome};
pub use keys::KeyCombination;
pub use listener::{KeyEvent, KeyListener};
pub use matcher::{HotkeyAction, HotkeyMatcher};
pub use pointer::{EnigoPointer, PointerDriver};
pub use recorder::{CapturePolicy, KeybindRecorder};
pub use script::{Script, ScriptId, ScriptSet, Target};
