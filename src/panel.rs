//! Panel State
//!
//! Visibility, maximize and size bookkeeping for the terminal panel. The
//! panel itself never talks to the terminal service; transitions report
//! whether the caller must create a session so the panel is not shown empty.

use serde::{Deserialize, Serialize};

use crate::config::PanelConfig;

/// Result of a panel transition
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PanelTransition {
    /// Any flag or the size changed
    pub changed: bool,
    /// The panel became visible and needs a session to show
    pub became_visible: bool,
}

/// Terminal panel flags
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PanelState {
    visible: bool,
    maximized: bool,
    size: f32,
    min_size: f32,
    max_size: f32,
}

impl PanelState {
    /// Panel configured from `config`
    ///
    /// Bounds that are not usable numbers fall back to the defaults.
    pub fn new(config: &PanelConfig) -> Self {
        let fallback = PanelConfig::default();
        let min_size = if config.min_size.is_finite() && config.min_size > 0.0 {
            config.min_size
        } else {
            fallback.min_size
        };
        let or_fallback = |value: f32, fallback: f32| if value.is_nan() { fallback } else { value };
        let max_size = or_fallback(config.max_size, fallback.max_size).max(min_size);
        let size = or_fallback(config.default_size, fallback.default_size);
        Self {
            visible: config.start_visible,
            maximized: false,
            size: size.clamp(min_size, max_size),
            min_size,
            max_size,
        }
    }

    /// Whether the panel is shown
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Whether the panel fills the window
    pub fn is_maximized(&self) -> bool {
        self.maximized
    }

    /// Current size in logical pixels
    pub fn size(&self) -> f32 {
        self.size
    }

    /// Show the panel
    pub fn show(&mut self) -> PanelTransition {
        if self.visible {
            return PanelTransition::default();
        }
        self.visible = true;
        PanelTransition {
            changed: true,
            became_visible: true,
        }
    }

    /// Hide the panel; also leaves maximized mode
    pub fn hide(&mut self) -> PanelTransition {
        if !self.visible {
            return PanelTransition::default();
        }
        self.visible = false;
        self.maximized = false;
        PanelTransition {
            changed: true,
            became_visible: false,
        }
    }

    /// Flip visibility
    pub fn toggle(&mut self) -> PanelTransition {
        if self.visible {
            self.hide()
        } else {
            self.show()
        }
    }

    /// Maximize, showing the panel first if needed
    pub fn maximize(&mut self) -> PanelTransition {
        let shown = self.show();
        if self.maximized {
            return shown;
        }
        self.maximized = true;
        PanelTransition {
            changed: true,
            became_visible: shown.became_visible,
        }
    }

    /// Leave maximized mode
    pub fn restore(&mut self) -> PanelTransition {
        if !self.maximized {
            return PanelTransition::default();
        }
        self.maximized = false;
        PanelTransition {
            changed: true,
            became_visible: false,
        }
    }

    /// Flip maximized mode
    pub fn toggle_maximize(&mut self) -> PanelTransition {
        if self.maximized {
            self.restore()
        } else {
            self.maximize()
        }
    }

    /// Resize, clamped to the configured bounds; NaN is ignored
    pub fn set_size(&mut self, size: f32) -> PanelTransition {
        if size.is_nan() {
            return PanelTransition::default();
        }
        let clamped = size.clamp(self.min_size, self.max_size);
        if clamped == self.size {
            return PanelTransition::default();
        }
        self.size = clamped;
        PanelTransition {
            changed: true,
            became_visible: false,
        }
    }
}

impl Default for PanelState {
    fn default() -> Self {
        Self::new(&PanelConfig::default())
    }
}
