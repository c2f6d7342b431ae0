//! Loading and saving script files.
//!
//! The durable representation is a single JSON document:
//!
//! ```json
//! {
//!   "scripts": [
//!     {
//!       "name": "farm loop",
//!       "keybind": ["alt", "ctrl", "p"],
//!       "return_mouse": true,
//!       "return_delay_ms": 500,
//!       "targets": [
//!         { "x": 640, "y": 400, "delay_ms": 250 }
//!       ]
//!     }
//!   ]
//! }
//! ```
//!
//! Missing `return_mouse` defaults to false and missing `return_delay_ms`
//! to 500. Structurally invalid JSON is reported as a load error carrying
//! the underlying parse cause; it never mutates in-memory state.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ClickScriptError, Result};
use crate::script::{Script, ScriptSet};

#[derive(Debug, Serialize, Deserialize)]
struct ScriptFile {
    scripts: Vec<Script>,
}

/// Load a script set from a JSON file.
pub fn load_scripts<P: AsRef<Path>>(path: P) -> Result<ScriptSet> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .map_err(|e| ClickScriptError::script_load(path.display().to_string(), e.to_string()))?;
    let file: ScriptFile = serde_json::from_str(&text)
        .map_err(|e| ClickScriptError::script_load(path.display().to_string(), e.to_string()))?;
    debug!(path = %path.display(), scripts = file.scripts.len(), "loaded script file");
    Ok(ScriptSet::from_scripts(file.scripts))
}

/// Save a script set as pretty-printed JSON.
pub fn save_scripts<P: AsRef<Path>>(path: P, set: &ScriptSet) -> Result<()> {
    let path = path.as_ref();
    let file = ScriptFile {
        scripts: set.scripts(),
    };
    let json = serde_json::to_string_pretty(&file)
        .map_err(|e| ClickScriptError::script_save(path.display().to_string(), e.to_string()))?;
    fs::write(path, json)
        .map_err(|e| ClickScriptError::script_save(path.display().to_string(), e.to_string()))?;
    debug!(path = %path.display(), scripts = set.len(), "saved script file");
    Ok(())
}
