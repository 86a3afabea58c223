use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::layout_engine::ResizeCorner;

pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("rift-wl")
}
pub fn config_file() -> PathBuf { config_dir().join("config.toml") }

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    settings: Settings,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
pub struct Config {
    pub settings: Settings,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default)]
    pub layout: LayoutSettings,
    /// Interactive move/resize behaviour
    #[serde(default)]
    pub drag: DragSettings,
    /// Edge snapping while dragging floating windows
    #[serde(default)]
    pub snap: SnapSettings,
    /// Tab stack (group) behaviour
    #[serde(default)]
    pub groups: GroupSettings,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct LayoutSettings {
    /// Layout mode: "dwindle" (binary tree) or "master" (master/stack)
    #[serde(default)]
    pub mode: LayoutMode,
    /// Gap configuration for window spacing
    #[serde(default)]
    pub gaps: GapSettings,
    /// Scale applied to tiled windows on special (scratch) workspaces.
    #[serde(default = "default_special_scale_factor")]
    pub special_scale_factor: f64,
    #[serde(default)]
    pub dwindle: DwindleSettings,
    #[serde(default)]
    pub master: MasterSettings,
}

/// Layout mode enum
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy, Default, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum LayoutMode {
    /// Recursive binary splitting
    #[default]
    Dwindle,
    /// Master area plus a proportionally sized stack
    Master,
}

/// Gap configuration for window spacing
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct GapSettings {
    /// Outer gaps (space between windows and screen edges)
    #[serde(default)]
    pub outer: OuterGaps,
    /// Inner gaps (space between windows)
    #[serde(default)]
    pub inner: InnerGaps,
}

/// Outer gap configuration (space between windows and screen edges)
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct OuterGaps {
    #[serde(default)]
    pub top: f64,
    #[serde(default)]
    pub left: f64,
    #[serde(default)]
    pub bottom: f64,
    #[serde(default)]
    pub right: f64,
}

/// Inner gap configuration (space between windows)
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct InnerGaps {
    /// Gap between horizontally adjacent windows
    #[serde(default)]
    pub horizontal: f64,
    /// Gap between vertically adjacent windows
    #[serde(default)]
    pub vertical: f64,
}

/// Where the new window lands when the split axis is chosen by aspect ratio.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "snake_case")]
pub enum ForceSplit {
    /// Follow the cursor: the half under the pointer gets the new window
    #[default]
    Cursor,
    /// Always left/top
    First,
    /// Always right/bottom
    Second,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct DwindleSettings {
    /// Keep each split's axis once chosen instead of re-deriving it from the box
    /// shape on every recalculation.
    #[serde(default)]
    pub preserve_split: bool,
    /// Pick the split axis from the pointer's quadrant in the target box.
    #[serde(default)]
    pub smart_split: bool,
    /// Resize by adjusting the pair of ancestors around the grabbed corner.
    #[serde(default = "yes")]
    pub smart_resizing: bool,
    #[serde(default)]
    pub force_split: ForceSplit,
    /// 1.0 is an even split; valid range is [0.1, 1.9].
    #[serde(default = "default_split_ratio")]
    pub default_split_ratio: f32,
    /// A box splits side by side when `width * split_width_multiplier > height`.
    #[serde(default = "default_split_width_multiplier")]
    pub split_width_multiplier: f64,
    /// Split the focused window rather than the one under the cursor.
    #[serde(default = "yes")]
    pub use_active_for_splits: bool,
}

/// Side of the workspace the master area occupies.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy, Default, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MasterOrientation {
    #[default]
    Left,
    Right,
    Top,
    Bottom,
    Center,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct MasterSettings {
    /// New windows become master and push the oldest master into the stack.
    #[serde(default = "yes")]
    pub new_is_master: bool,
    /// New stack windows go to the top of the stack instead of the bottom.
    #[serde(default)]
    pub new_on_top: bool,
    #[serde(default)]
    pub orientation: MasterOrientation,
    /// Fraction of the workspace given to the master area.
    #[serde(default = "default_mfact")]
    pub mfact: f32,
    /// Masters per workspace before `addmaster`/`removemaster` adjust it.
    #[serde(default = "default_master_count")]
    pub master_count: usize,
    #[serde(default = "yes")]
    pub smart_resizing: bool,
    /// Keep the master centred even with fewer than two stack windows.
    #[serde(default)]
    pub always_center_master: bool,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct DragSettings {
    /// Corner grabbed on resize; `none` picks the corner nearest the pointer.
    #[serde(default)]
    pub resize_corner: ResizeCorner,
    /// Used to rate limit drag updates when a monitor reports no refresh rate.
    #[serde(default = "default_refresh_rate")]
    pub default_refresh_rate: f64,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct SnapSettings {
    #[serde(default)]
    pub enabled: bool,
    /// Distance within which an edge snaps to another window's edge.
    #[serde(default = "default_snap_gap")]
    pub window_gap: f64,
    /// Distance within which an edge snaps to the monitor's working area.
    #[serde(default = "default_snap_gap")]
    pub monitor_gap: f64,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct GroupSettings {
    /// Windows opened while a grouped window is focused join that group.
    #[serde(default = "yes")]
    pub auto_group: bool,
    #[serde(default = "yes")]
    pub insert_after_current: bool,
    /// Tiling insertion onto a grouped window merges into the group.
    #[serde(default = "yes")]
    pub merge_on_insert: bool,
    /// Dropping a dragged tiled window onto a group merges it.
    #[serde(default = "yes")]
    pub merge_on_drag: bool,
    /// Initial value of the global group lock.
    #[serde(default)]
    pub locked: bool,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            mode: LayoutMode::default(),
            gaps: GapSettings::default(),
            special_scale_factor: default_special_scale_factor(),
            dwindle: DwindleSettings::default(),
            master: MasterSettings::default(),
        }
    }
}

impl Default for DwindleSettings {
    fn default() -> Self {
        Self {
            preserve_split: false,
            smart_split: false,
            smart_resizing: true,
            force_split: ForceSplit::default(),
            default_split_ratio: default_split_ratio(),
            split_width_multiplier: default_split_width_multiplier(),
            use_active_for_splits: true,
        }
    }
}

impl Default for MasterSettings {
    fn default() -> Self {
        Self {
            new_is_master: true,
            new_on_top: false,
            orientation: MasterOrientation::default(),
            mfact: default_mfact(),
            master_count: default_master_count(),
            smart_resizing: true,
            always_center_master: false,
        }
    }
}

impl Default for DragSettings {
    fn default() -> Self {
        Self {
            resize_corner: ResizeCorner::None,
            default_refresh_rate: default_refresh_rate(),
        }
    }
}

impl Default for SnapSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            window_gap: default_snap_gap(),
            monitor_gap: default_snap_gap(),
        }
    }
}

impl Default for GroupSettings {
    fn default() -> Self {
        Self {
            auto_group: true,
            insert_after_current: true,
            merge_on_insert: true,
            merge_on_drag: true,
            locked: false,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        issues.extend(self.layout.validate());
        issues.extend(self.drag.validate());
        issues.extend(self.snap.validate());

        issues
    }

    pub fn auto_fix_values(&mut self) -> usize {
        let mut fixes = 0;

        fixes += self.layout.auto_fix_values();
        fixes += self.drag.auto_fix_values();
        fixes += self.snap.auto_fix_values();

        fixes
    }
}

impl LayoutSettings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if !(self.special_scale_factor > 0.0 && self.special_scale_factor <= 1.0) {
            issues.push(format!(
                "special_scale_factor must be in (0, 1], got {}",
                self.special_scale_factor
            ));
        }

        issues.extend(self.gaps.validate());
        issues.extend(self.dwindle.validate());
        issues.extend(self.master.validate());

        issues
    }

    pub fn auto_fix_values(&mut self) -> usize {
        let mut fixes = 0;

        if !(self.special_scale_factor > 0.0 && self.special_scale_factor <= 1.0) {
            self.special_scale_factor = default_special_scale_factor();
            fixes += 1;
        }

        fixes += self.gaps.auto_fix_values();
        fixes += self.dwindle.auto_fix_values();
        fixes += self.master.auto_fix_values();

        fixes
    }
}

impl GapSettings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        issues.extend(self.outer.validate());
        issues.extend(self.inner.validate());

        issues
    }

    pub fn auto_fix_values(&mut self) -> usize {
        let outer_fixes = self.outer.auto_fix_values();
        let inner_fixes = self.inner.auto_fix_values();

        outer_fixes + inner_fixes
    }
}

impl OuterGaps {
    /// Validates outer gap configuration values and returns a list of issues found.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        for (name, value) in
            [("top", self.top), ("left", self.left), ("bottom", self.bottom), ("right", self.right)]
        {
            if value < 0.0 {
                issues.push(format!("outer.{name} gap must be non-negative, got {value}"));
            }
        }

        issues
    }

    /// Attempts to fix outer gap configuration values automatically.
    /// Returns the number of fixes applied.
    pub fn auto_fix_values(&mut self) -> usize {
        let mut fixes = 0;

        for value in [&mut self.top, &mut self.left, &mut self.bottom, &mut self.right] {
            if *value < 0.0 {
                *value = 0.0;
                fixes += 1;
            }
        }

        fixes
    }
}

impl InnerGaps {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.horizontal < 0.0 {
            issues.push(format!(
                "inner.horizontal gap must be non-negative, got {}",
                self.horizontal
            ));
        }

        if self.vertical < 0.0 {
            issues.push(format!(
                "inner.vertical gap must be non-negative, got {}",
                self.vertical
            ));
        }

        issues
    }

    pub fn auto_fix_values(&mut self) -> usize {
        let mut fixes = 0;

        if self.horizontal < 0.0 {
            self.horizontal = 0.0;
            fixes += 1;
        }

        if self.vertical < 0.0 {
            self.vertical = 0.0;
            fixes += 1;
        }

        fixes
    }
}

impl DwindleSettings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if !(0.1..=1.9).contains(&self.default_split_ratio) {
            issues.push(format!(
                "dwindle.default_split_ratio must be within [0.1, 1.9], got {}",
                self.default_split_ratio
            ));
        }

        if self.split_width_multiplier <= 0.0 {
            issues.push(format!(
                "dwindle.split_width_multiplier must be positive, got {}",
                self.split_width_multiplier
            ));
        }

        issues
    }

    pub fn auto_fix_values(&mut self) -> usize {
        let mut fixes = 0;

        if !(0.1..=1.9).contains(&self.default_split_ratio) {
            self.default_split_ratio = self.default_split_ratio.clamp(0.1, 1.9);
            if self.default_split_ratio.is_nan() {
                self.default_split_ratio = default_split_ratio();
            }
            fixes += 1;
        }

        if self.split_width_multiplier <= 0.0 {
            self.split_width_multiplier = default_split_width_multiplier();
            fixes += 1;
        }

        fixes
    }
}

impl MasterSettings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if !(0.05..=0.95).contains(&self.mfact) {
            issues.push(format!("master.mfact must be within [0.05, 0.95], got {}", self.mfact));
        }

        if self.master_count == 0 {
            issues.push("master.master_count must be at least 1".to_string());
        }

        issues
    }

    pub fn auto_fix_values(&mut self) -> usize {
        let mut fixes = 0;

        if !(0.05..=0.95).contains(&self.mfact) {
            self.mfact = default_mfact();
            fixes += 1;
        }

        if self.master_count == 0 {
            self.master_count = 1;
            fixes += 1;
        }

        fixes
    }
}

impl DragSettings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.default_refresh_rate <= 0.0 {
            issues.push(format!(
                "drag.default_refresh_rate must be positive, got {}",
                self.default_refresh_rate
            ));
        }

        issues
    }

    pub fn auto_fix_values(&mut self) -> usize {
        if self.default_refresh_rate <= 0.0 {
            self.default_refresh_rate = default_refresh_rate();
            return 1;
        }
        0
    }
}

impl SnapSettings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.window_gap < 0.0 {
            issues.push(format!("snap.window_gap must be non-negative, got {}", self.window_gap));
        }

        if self.monitor_gap < 0.0 {
            issues.push(format!(
                "snap.monitor_gap must be non-negative, got {}",
                self.monitor_gap
            ));
        }

        issues
    }

    pub fn auto_fix_values(&mut self) -> usize {
        let mut fixes = 0;

        if self.window_gap < 0.0 {
            self.window_gap = 0.0;
            fixes += 1;
        }

        if self.monitor_gap < 0.0 {
            self.monitor_gap = 0.0;
            fixes += 1;
        }

        fixes
    }
}

fn yes() -> bool { true }

fn default_special_scale_factor() -> f64 { 1.0 }

fn default_split_ratio() -> f32 { 1.0 }

fn default_split_width_multiplier() -> f64 { 1.0 }

fn default_mfact() -> f32 { 0.55 }

fn default_master_count() -> usize { 1 }

fn default_refresh_rate() -> f64 { 60.0 }

fn default_snap_gap() -> f64 { 10.0 }

impl Config {
    pub fn read(path: &Path) -> anyhow::Result<Config> {
        let buf = std::fs::read_to_string(path)?;
        Self::parse(&buf)
    }

    /// Save the current config to a file
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let config_file = ConfigFile { settings: self.settings.clone() };

        let toml_string = toml::to_string_pretty(&config_file)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, toml_string.as_bytes())?;

        Ok(())
    }

    /// Validates the entire configuration and returns a list of issues found.
    pub fn validate(&self) -> Vec<String> { self.settings.validate() }

    /// Attempts to fix configuration values automatically.
    /// Returns the number of fixes applied.
    pub fn auto_fix_values(&mut self) -> usize { self.settings.auto_fix_values() }

    pub fn parse(buf: &str) -> anyhow::Result<Config> {
        let c: ConfigFile = toml::from_str(buf)?;
        Ok(Config { settings: c.settings })
    }
}
