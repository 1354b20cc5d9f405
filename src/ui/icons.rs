//! Shared UI icons.
//!
//! Each constant falls back to plain ASCII on terminals without emoji
//! support.

use console::Emoji;

use crate::session::Sender;

// Log senders
pub static USER: Emoji<'_, '_> = Emoji("🧑 ", "> ");
pub static AGENT: Emoji<'_, '_> = Emoji("🤖 ", "< ");
pub static SYSTEM: Emoji<'_, '_> = Emoji("🔌 ", "* ");
pub static ERROR: Emoji<'_, '_> = Emoji("❌ ", "[ERR] ");
pub static SUCCESS: Emoji<'_, '_> = Emoji("✅ ", "[OK] ");

// Status indicators
pub static DONE: Emoji<'_, '_> = Emoji("✔ ", "[x] ");
pub static PENDING: Emoji<'_, '_> = Emoji("· ", "[ ] ");
pub static RUNNING: Emoji<'_, '_> = Emoji("▶ ", "[>] ");
pub static PROGRESS: Emoji<'_, '_> = Emoji("📊 ", "");
pub static CAMERA: Emoji<'_, '_> = Emoji("📸 ", "");

pub fn for_sender(sender: Sender) -> &'static Emoji<'static, 'static> {
    match sender {
        Sender::User => &USER,
        Sender::Agent => &AGENT,
        Sender::System => &SYSTEM,
        Sender::Error => &ERROR,
        Sender::Success => &SUCCESS,
    }
}
