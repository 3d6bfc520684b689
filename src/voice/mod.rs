//! Voice configuration endpoints.
//!
//! `GET {mount}/config` and `GET {mount}/token` answer from the user's
//! settings, falling back to process defaults.

pub mod handlers;
pub mod settings;

pub use handlers::{router, VoiceState};
pub use settings::{
    ClientVoiceConfig, HttpSettingsProvider, NoSettings, SettingsError, SettingsProvider, UserSettings,
    VoiceConfigResolver,
};
