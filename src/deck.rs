//! Slide list, active-slide navigation, keyboard mapping, and progress.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SlideDef {
    pub key: &'static str,
    pub title: &'static str,
}

pub const SLIDES: [SlideDef; 9] = [
    SlideDef { key: "title", title: "Title" },
    SlideDef { key: "welcome", title: "Welcome" },
    SlideDef { key: "explore", title: "Explore" },
    SlideDef { key: "analyze", title: "Analyze" },
    SlideDef { key: "propose", title: "Propose" },
    SlideDef { key: "apply_design", title: "Apply (4 tables)" },
    SlideDef { key: "m2m_redesign", title: "M2M Redesign" },
    SlideDef { key: "review", title: "Review" },
    SlideDef { key: "finish", title: "Finish and Download Submission" },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgressInfo {
    pub current: usize,
    pub total: usize,
    pub percent: u32,
}

/// Position-based progress used when the host supplies nothing better.
pub fn default_progress(active: usize, len: usize) -> ProgressInfo {
    let total = len.max(1);
    let current = (active + 1).min(total);
    ProgressInfo {
        current,
        total,
        percent: percent_of(current, total),
    }
}

pub fn percent_of(done: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (done as f64 / total as f64 * 100.0).round() as u32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum KeyAction {
    Prev,
    Next,
    ToggleFullscreen,
}

/// Keys typed into an input never navigate.
pub fn key_action(key: &str, in_input: bool) -> Option<KeyAction> {
    if in_input {
        return None;
    }
    match key {
        "ArrowLeft" | "ArrowUp" => Some(KeyAction::Prev),
        "ArrowRight" | "ArrowDown" | " " | "Space" => Some(KeyAction::Next),
        "f" | "F" => Some(KeyAction::ToggleFullscreen),
        _ => None,
    }
}

#[derive(Debug, Clone)]
pub struct Deck {
    slides: &'static [SlideDef],
    active: usize,
    fullscreen: bool,
}

impl Deck {
    pub fn new(slides: &'static [SlideDef]) -> Self {
        Self {
            slides,
            active: 0,
            fullscreen: false,
        }
    }

    pub fn slides(&self) -> &'static [SlideDef] {
        self.slides
    }

    pub fn active(&self) -> usize {
        self.active
    }

    pub fn active_slide(&self) -> Option<&'static SlideDef> {
        self.slides.get(self.active)
    }

    pub fn active_key(&self) -> &'static str {
        self.active_slide().map(|s| s.key).unwrap_or_default()
    }

    pub fn index_of(&self, key: &str) -> Option<usize> {
        self.slides.iter().position(|s| s.key == key)
    }

    /// Clamp into range; returns the resulting index.
    pub fn clamp(&self, to: i64) -> usize {
        let last = self.slides.len().saturating_sub(1) as i64;
        to.clamp(0, last) as usize
    }

    pub fn goto(&mut self, to: i64) -> usize {
        self.active = self.clamp(to);
        self.active
    }

    pub fn next_index(&self) -> usize {
        self.clamp(self.active as i64 + 1)
    }

    pub fn prev_index(&self) -> usize {
        self.clamp(self.active as i64 - 1)
    }

    pub fn fullscreen(&self) -> bool {
        self.fullscreen
    }

    pub fn toggle_fullscreen(&mut self) -> bool {
        self.fullscreen = !self.fullscreen;
        self.fullscreen
    }

    pub fn reset(&mut self) {
        self.active = 0;
    }

    pub fn progress(&self) -> ProgressInfo {
        default_progress(self.active, self.slides.len())
    }
}
