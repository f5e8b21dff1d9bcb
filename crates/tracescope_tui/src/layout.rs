//! Screen areas for the player.

use ratatui::layout::Rect;
use serde::{Deserialize, Serialize};

/// Layout configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Width of the source panel as a percentage (0-100)
    pub source_percent: u16,
    /// Status bar height
    pub status_height: u16,
    /// Height of the stdout panel
    pub stdout_height: u16,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            source_percent: 60,
            status_height: 3,
            stdout_height: 8,
        }
    }
}

impl LayoutConfig {
    /// Set the source panel width
    #[must_use]
    pub fn with_source_percent(mut self, percent: u16) -> Self {
        self.source_percent = percent.min(100);
        self
    }

    /// Set the status bar height
    #[must_use]
    pub fn with_status_height(mut self, height: u16) -> Self {
        self.status_height = height;
        self
    }
}

/// Areas for every player panel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerLayout {
    /// Numbered source, left
    pub source: Rect,
    /// Call tree, top right
    pub tree: Rect,
    /// Frame tabs and locals, middle right
    pub locals: Rect,
    /// Program output, bottom right
    pub stdout: Rect,
    /// Status bar, full width at the bottom
    pub status: Rect,
}

/// Layout manager for calculating screen areas
#[derive(Debug, Clone, Copy, Default)]
pub struct Layout {
    config: LayoutConfig,
}

impl Layout {
    /// Layout with the default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Layout with a given configuration
    #[must_use]
    pub fn with_config(config: LayoutConfig) -> Self {
        Self { config }
    }

    /// Configuration in use
    #[must_use]
    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Calculate panel areas for a terminal size
    #[must_use]
    pub fn calculate(&self, size: Rect) -> PlayerLayout {
        let status_height = self.config.status_height.min(size.height.saturating_sub(1));
        let main_height = size.height.saturating_sub(status_height);

        let status = Rect {
            x: size.x,
            y: size.y + main_height,
            width: size.width,
            height: status_height,
        };

        let source_width =
            (u32::from(size.width) * u32::from(self.config.source_percent.min(100)) / 100) as u16;
        let source = Rect {
            x: size.x,
            y: size.y,
            width: source_width,
            height: main_height,
        };

        let side_x = size.x + source_width;
        let side_width = size.width.saturating_sub(source_width);
        let stdout_height = self.config.stdout_height.min(main_height / 3);
        let upper = main_height.saturating_sub(stdout_height);
        let tree_height = upper / 2;

        let tree = Rect {
            x: side_x,
            y: size.y,
            width: side_width,
            height: tree_height,
        };
        let locals = Rect {
            x: side_x,
            y: size.y + tree_height,
            width: side_width,
            height: upper - tree_height,
        };
        let stdout = Rect {
            x: side_x,
            y: size.y + upper,
            width: side_width,
            height: stdout_height,
        };

        PlayerLayout {
            source,
            tree,
            locals,
            stdout,
            status,
        }
    }
}
