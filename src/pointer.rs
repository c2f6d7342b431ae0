//! Pointer simulation.
//!
//! The execution engine drives the mouse through the narrow
//! [`PointerDriver`] trait. The primitives are synchronous; a failure is
//! fatal to the invocation that issued it and to nothing else.

use enigo::{Button, Coordinate, Direction, Enigo, Mouse, Settings};

use crate::error::{ClickScriptError, Result};

/// The pointer primitives the execution engine needs.
pub trait PointerDriver: Send {
    /// Move to `(x, y)` and press-release the primary button there.
    fn click(&mut self, x: i32, y: i32) -> Result<()>;

    /// Move to `(x, y)` without clicking.
    fn move_to(&mut self, x: i32, y: i32) -> Result<()>;

    /// Current pointer position.
    fn position(&mut self) -> Result<(i32, i32)>;
}

/// [`PointerDriver`] backed by `enigo`.
pub struct EnigoPointer {
    enigo: Enigo,
}

impl EnigoPointer {
    pub fn new() -> Result<Self> {
        let enigo = Enigo::new(&Settings::default())
            .map_err(|e| ClickScriptError::pointer("init", e.to_string()))?;
        Ok(Self { enigo })
    }
}

impl PointerDriver for EnigoPointer {
    fn click(&mut self, x: i32, y: i32) -> Result<()> {
        self.enigo
            .move_mouse(x, y, Coordinate::Abs)
            .map_err(|e| ClickScriptError::pointer("move", e.to_string()))?;
        self.enigo
            .button(Button::Left, Direction::Click)
            .map_err(|e| ClickScriptError::pointer("click", e.to_string()))?;
        Ok(())
    }

    fn move_to(&mut self, x: i32, y: i32) -> Result<()> {
        self.enigo
            .move_mouse(x, y, Coordinate::Abs)
            .map_err(|e| ClickScriptError::pointer("move", e.to_string()))
    }

    fn position(&mut self) -> Result<(i32, i32)> {
        self.enigo
            .location()
            .map_err(|e| ClickScriptError::pointer("position", e.to_string()))
    }
}
