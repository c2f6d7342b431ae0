//! Global key-event subscription, backed by `rdev`.
//!
//! # Design
//!
//! `rdev::listen()` is a blocking OS-level call that never returns while
//! the process is alive. It must run on a dedicated OS thread -- it cannot
//! live inside a tokio task.
//!
//! [`KeyListener::spawn`] starts that thread and returns the receiving end
//! of an unbounded channel of [`KeyEvent`]s, raw key names translated to
//! strings the [`crate::keys`] normalizer understands. Dropping the
//! [`KeyListener`] handle sets a stop flag so the callback silently
//! discards further events; the underlying thread lives until process exit
//! (rdev has no graceful shutdown API) but consumes no meaningful CPU
//! while blocked.
//!
//! If the subscription itself fails or is lost, the sender is dropped and
//! the channel closes; the consumer side treats a closed stream as "run
//! mode stopped unexpectedly".

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use rdev::EventType;
use tokio::sync::mpsc;
use tracing::error;

use crate::error::{ClickScriptError, Result};

/// A single key transition from the platform stream, carrying the raw
/// (pre-normalization) key name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyEvent {
    Down(String),
    Up(String),
}

/// Handle to the background listener thread.
pub struct KeyListener {
    active: Arc<AtomicBool>,
}

impl KeyListener {
    /// Spawn the dedicated listener thread and return the event stream.
    pub fn spawn() -> Result<(Self, mpsc::UnboundedReceiver<KeyEvent>)> {
        let (tx, rx) = mpsc::unbounded_channel();
        let active = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&active);

        thread::Builder::new()
            .name("key-listener".into())
            .spawn(move || {
                let result = rdev::listen(move |event| {
                    if !flag.load(Ordering::Relaxed) {
                        return;
                    }
                    let forwarded = match event.event_type {
                        EventType::KeyPress(key) => Some(KeyEvent::Down(key_name(&key))),
                        EventType::KeyRelease(key) => Some(KeyEvent::Up(key_name(&key))),
                        _ => None,
                    };
                    if let Some(key_event) = forwarded {
                        // Receiver gone means the pump exited; nothing to do.
                        let _ = tx.send(key_event);
                    }
                });
                if let Err(e) = result {
                    error!("global key subscription lost: {e:?}");
                }
                // The callback (and with it the sender) is dropped here,
                // closing the stream.
            })
            .map_err(|e| {
                ClickScriptError::subscription(format!("failed to spawn listener thread: {e}"))
            })?;

        Ok((Self { active }, rx))
    }
}

impl Drop for KeyListener {
    fn drop(&mut self) {
        self.active.store(false, Ordering::Relaxed);
    }
}

/// Translate an `rdev` key to the raw name fed to the normalizer.
fn key_name(key: &rdev::Key) -> String {
    use rdev::Key;

    let name = match key {
        Key::ControlLeft => "ControlLeft",
        Key::ControlRight => "ControlRight",
        Key::ShiftLeft => "ShiftLeft",
        Key::ShiftRight => "ShiftRight",
        Key::Alt => "Alt",
        Key::AltGr => "AltGr",
        Key::MetaLeft => "MetaLeft",
        Key::MetaRight => "MetaRight",

        Key::KeyA => "a",
        Key::KeyB => "b",
        Key::KeyC => "c",
        Key::KeyD => "d",
        Key::KeyE => "e",
        Key::KeyF => "f",
        Key::KeyG => "g",
        Key::KeyH => "h",
        Key::KeyI => "i",
        Key::KeyJ => "j",
        Key::KeyK => "k",
        Key::KeyL => "l",
        Key::KeyM => "m",
        Key::KeyN => "n",
        Key::KeyO => "o",
        Key::KeyP => "p",
        Key::KeyQ => "q",
        Key::KeyR => "r",
        Key::KeyS => "s",
        Key::KeyT => "t",
        Key::KeyU => "u",
        Key::KeyV => "v",
        Key::KeyW => "w",
        Key::KeyX => "x",
        Key::KeyY => "y",
        Key::KeyZ => "z",

        Key::Num0 => "0",
        Key::Num1 => "1",
        Key::Num2 => "2",
        Key::Num3 => "3",
        Key::Num4 => "4",
        Key::Num5 => "5",
        Key::Num6 => "6",
        Key::Num7 => "7",
        Key::Num8 => "8",
        Key::Num9 => "9",

        Key::F1 => "f1",
        Key::F2 => "f2",
        Key::F3 => "f3",
        Key::F4 => "f4",
        Key::F5 => "f5",
        Key::F6 => "f6",
        Key::F7 => "f7",
        Key::F8 => "f8",
        Key::F9 => "f9",
        Key::F10 => "f10",
        Key::F11 => "f11",
        Key::F12 => "f12",

        Key::Space => "space",
        Key::Return => "enter",
        Key::Escape => "escape",
        Key::Tab => "tab",
        Key::Backspace => "backspace",
        Key::Delete => "delete",
        Key::Insert => "insert",
        Key::Home => "home",
        Key::End => "end",
        Key::PageUp => "pageup",
        Key::PageDown => "pagedown",
        Key::UpArrow => "up",
        Key::DownArrow => "down",
        Key::LeftArrow => "left",
        Key::RightArrow => "right",
        Key::CapsLock => "capslock",

        // keypad, punctuation, and anything else: the Debug name,
        // lower-cased, is an acceptable opaque symbol
        other => return format!("{other:?}").to_lowercase(),
    };
    name.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_names_feed_the_normalizer() {
        use crate::keys::normalize;

        assert_eq!(normalize(&key_name(&rdev::Key::ControlLeft)), "ctrl");
        assert_eq!(normalize(&key_name(&rdev::Key::ControlRight)), "ctrl");
        assert_eq!(normalize(&key_name(&rdev::Key::AltGr)), "alt");
        assert_eq!(normalize(&key_name(&rdev::Key::MetaRight)), "super");
        assert_eq!(normalize(&key_name(&rdev::Key::KeyP)), "p");
        assert_eq!(normalize(&key_name(&rdev::Key::Num3)), "3");
        assert_eq!(normalize(&key_name(&rdev::Key::F6)), "f6");
        assert_eq!(normalize(&key_name(&rdev::Key::Escape)), "escape");
    }

    #[test]
    fn unlisted_keys_become_opaque_symbols() {
        let name = key_name(&rdev::Key::Unknown(187));
        assert_eq!(crate::keys::normalize(&name), name.to_lowercase());
    }
}
