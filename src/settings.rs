//! Player settings and preferences
//!
//! Persisted in LocalStorage; defaults cover first launch and any parse
//! failure.

use serde::{Deserialize, Serialize};

use crate::anim::MIN_SPEED;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Global animation speed multiplier
    pub speed: f32,
    /// Decorative particle bursts
    pub particles: bool,
    /// Skip shakes and knockbacks, keep positional tweens
    pub reduced_motion: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            speed: 1.0,
            particles: true,
            reduced_motion: false,
        }
    }
}

impl Settings {
    /// LocalStorage key
    #[cfg(target_arch = "wasm32")]
    const STORAGE_KEY: &'static str = "buckshot_duel_settings";

    /// Clamp anything a hand-edited storage entry could break
    pub fn sanitized(mut self) -> Self {
        if !self.speed.is_finite() {
            self.speed = 1.0;
        }
        self.speed = self.speed.clamp(MIN_SPEED, 10.0);
        self
    }

    /// Load settings from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY) {
                if let Ok(settings) = serde_json::from_str::<Settings>(&json) {
                    log::info!("Loaded settings from LocalStorage");
                    return settings.sanitized();
                }
            }
        }

        log::info!("Using default settings");
        Self::default()
    }

    /// Save settings to LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(json) = serde_json::to_string(self) {
                let _ = storage.set_item(Self::STORAGE_KEY, &json);
                log::info!("Settings saved");
            }
        }
    }

    /// Native stubs
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::default()
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self) {
        // No-op for native
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_round_trip_through_json() {
        let json = serde_json::to_string(&Settings::default()).unwrap();
        let back: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(back.speed, 1.0);
        assert!(back.particles);
        assert!(!back.reduced_motion);
    }

    #[test]
    fn test_missing_fields_fall_back_to_defaults() {
        let back: Settings = serde_json::from_str(r#"{"speed": 2.0}"#).unwrap();
        assert_eq!(back.speed, 2.0);
        assert!(back.particles);
    }

    #[test]
    fn test_sanitize_clamps_bad_speeds() {
        let s = Settings {
            speed: f32::NAN,
            ..Settings::default()
        };
        assert_eq!(s.sanitized().speed, 1.0);
        let s = Settings {
            speed: 0.0,
            ..Settings::default()
        };
        assert_eq!(s.sanitized().speed, MIN_SPEED);
        let s = Settings {
            speed: 1e9,
            ..Settings::default()
        };
        assert_eq!(s.sanitized().speed, 10.0);
    }
}
