//! Input vocabulary shared by key and pointer events.

use bitflags::bitflags;

use crate::primitives::Point;

bitflags! {
    /// Keyboard modifiers held while an event was generated.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u8 {
        const CAPS_LOCK = 1 << 0;
        const SHIFT = 1 << 1;
        const CONTROL = 1 << 2;
        const OPTION = 1 << 3;
        const COMMAND = 1 << 4;
    }
}

impl Modifiers {
    /// The modifier used for menu shortcuts on this platform.
    pub fn platform_menu() -> Self {
        if cfg!(target_os = "macos") {
            Modifiers::COMMAND
        } else {
            Modifiers::CONTROL
        }
    }
}

impl std::fmt::Display for Modifiers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names = [
            (Modifiers::CAPS_LOCK, "CapsLock"),
            (Modifiers::SHIFT, "Shift"),
            (Modifiers::CONTROL, "Control"),
            (Modifiers::OPTION, "Option"),
            (Modifiers::COMMAND, "Command"),
        ];
        let mut first = true;
        for (flag, name) in names {
            if self.contains(flag) {
                if !first {
                    f.write_str("+")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Key codes the core itself reacts to.
///
/// Codes are X11 keysym values, passed through untouched by the translation layer.
pub mod keys {
    pub const TAB: u32 = 0xff09;
    pub const ISO_LEFT_TAB: u32 = 0xfe20;
    pub const RETURN: u32 = 0xff0d;
    pub const ESCAPE: u32 = 0xff1b;
    pub const BACKSPACE: u32 = 0xff08;
    pub const DELETE: u32 = 0xffff;
}

/// Payload for key down/up events.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyInfo {
    /// Virtual key code.
    pub code: u32,
    /// The character typed, if any.
    pub ch: Option<char>,
    pub modifiers: Modifiers,
    /// True when generated by key auto-repeat.
    pub repeat: bool,
}

impl KeyInfo {
    pub fn new(code: u32, ch: Option<char>, modifiers: Modifiers, repeat: bool) -> Self {
        Self {
            code,
            ch,
            modifiers,
            repeat,
        }
    }

    /// True for Tab and the shifted Tab keysym some layouts produce.
    pub fn is_tab(&self) -> bool {
        self.code == keys::TAB || self.code == keys::ISO_LEFT_TAB
    }
}

/// Payload for pointer events.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MouseInfo {
    /// Position in the target block's local coordinates.
    pub position: Point,
    /// 0 = primary, 1 = secondary, 2 = middle.
    pub button: u8,
    /// 1 for a single click, 2 for a double click, and so on. Zero for non-press events.
    pub click_count: u32,
    pub modifiers: Modifiers,
}

impl MouseInfo {
    pub fn new(position: Point, modifiers: Modifiers) -> Self {
        Self {
            position,
            button: 0,
            click_count: 0,
            modifiers,
        }
    }

    pub fn with_button(mut self, button: u8) -> Self {
        self.button = button;
        self
    }

    pub fn with_click_count(mut self, click_count: u32) -> Self {
        self.click_count = click_count;
        self
    }
}
