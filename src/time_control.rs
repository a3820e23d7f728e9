use serde::{Deserialize, Serialize};
use std::fmt;

pub const MIN_IMAGE_COUNT: u32 = 1;
pub const MAX_IMAGE_COUNT: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Seconds,
    #[default]
    Minutes,
    Hours,
    Days,
    Years,
}

impl TimeUnit {
    pub fn as_str(self) -> &'static str {
        match self {
            TimeUnit::Seconds => "seconds",
            TimeUnit::Minutes => "minutes",
            TimeUnit::Hours => "hours",
            TimeUnit::Days => "days",
            TimeUnit::Years => "years",
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which moment(s) of the scene to depict.
///
/// Custom variants carry a strictly positive offset magnitude; the direction
/// lives in the variant itself, so a "custom zero" cannot be represented.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TimeMode {
    CurrentOnly,
    SceneStart,
    #[default]
    SceneEnd,
    CustomFuture { offset: f64 },
    CustomPast { offset: f64 },
}

impl TimeMode {
    /// Maps a signed offset onto a mode. Zero (or anything non-finite) is `None`.
    pub fn from_offset(value: f64) -> Option<Self> {
        if !value.is_finite() || value == 0.0 {
            None
        } else if value > 0.0 {
            Some(TimeMode::CustomFuture { offset: value })
        } else {
            Some(TimeMode::CustomPast { offset: value.abs() })
        }
    }

    /// Signed offset as the UI slider shows it: 0 for named modes.
    pub fn signed_offset(&self) -> f64 {
        match *self {
            TimeMode::CustomFuture { offset } => offset,
            TimeMode::CustomPast { offset } => -offset,
            _ => 0.0,
        }
    }

    pub fn is_named(&self) -> bool {
        matches!(self, TimeMode::CurrentOnly | TimeMode::SceneStart | TimeMode::SceneEnd)
    }
}

/// Events the time-point controls emit. Slider and text input both map onto `SetOffset`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum TimeControlEvent {
    SetCurrentOnly(bool),
    SetSceneStart(bool),
    SetSceneEnd(bool),
    SetOffset(f64),
    SetUnit(TimeUnit),
    SetImageCount(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "TimeControlRepr")]
pub struct TimeControl {
    mode: TimeMode,
    unit: TimeUnit,
    image_count: u32,
}

impl Default for TimeControl {
    fn default() -> Self {
        Self { mode: TimeMode::default(), unit: TimeUnit::default(), image_count: 1 }
    }
}

impl TimeControl {
    pub fn new(mode: TimeMode, unit: TimeUnit, image_count: u32) -> Self {
        TimeControlRepr { mode, unit, image_count }.into()
    }

    pub fn mode(&self) -> TimeMode {
        self.mode
    }

    pub fn unit(&self) -> TimeUnit {
        self.unit
    }

    pub fn image_count(&self) -> u32 {
        self.image_count
    }

    pub fn offset(&self) -> f64 {
        self.mode.signed_offset()
    }

    pub fn is_image_count_locked(&self) -> bool {
        self.mode == TimeMode::CurrentOnly
    }

    /// Applies one UI event and returns the resulting state.
    pub fn apply(self, event: TimeControlEvent) -> Self {
        let mut next = self;
        match event {
            TimeControlEvent::SetCurrentOnly(true) => {
                next.mode = TimeMode::CurrentOnly;
                next.image_count = 1;
            }
            TimeControlEvent::SetSceneStart(true) => next.mode = TimeMode::SceneStart,
            TimeControlEvent::SetSceneEnd(true) => next.mode = TimeMode::SceneEnd,
            TimeControlEvent::SetCurrentOnly(false) => next.clear_flag(TimeMode::CurrentOnly),
            TimeControlEvent::SetSceneStart(false) => next.clear_flag(TimeMode::SceneStart),
            TimeControlEvent::SetSceneEnd(false) => next.clear_flag(TimeMode::SceneEnd),
            TimeControlEvent::SetOffset(value) => {
                next.mode = match TimeMode::from_offset(value) {
                    Some(custom) => custom,
                    None if matches!(next.mode, TimeMode::CurrentOnly | TimeMode::SceneStart) => next.mode,
                    None => TimeMode::SceneEnd,
                };
            }
            TimeControlEvent::SetUnit(unit) => next.unit = unit,
            TimeControlEvent::SetImageCount(count) => {
                if !next.is_image_count_locked() && (MIN_IMAGE_COUNT..=MAX_IMAGE_COUNT).contains(&count) {
                    next.image_count = count;
                }
            }
        }
        next
    }

    // Offset is 0 for every named mode, so a cleared flag lands on SceneEnd.
    fn clear_flag(&mut self, flag: TimeMode) {
        if self.mode == flag {
            self.mode = TimeMode::SceneEnd;
        }
    }

    /// Short label for the mode badge in the UI.
    pub fn label(&self) -> String {
        match self.mode {
            TimeMode::CurrentOnly => "Current Only".to_string(),
            TimeMode::SceneStart => "Scene Start".to_string(),
            TimeMode::SceneEnd => "Scene End".to_string(),
            TimeMode::CustomFuture { offset } => format!("Future (+{} {})", offset, self.unit),
            TimeMode::CustomPast { offset } => format!("Past (-{} {})", offset, self.unit),
        }
    }
}

#[derive(Deserialize)]
struct TimeControlRepr {
    #[serde(default)]
    mode: TimeMode,
    #[serde(default)]
    unit: TimeUnit,
    #[serde(default = "default_image_count")]
    image_count: u32,
}

fn default_image_count() -> u32 {
    1
}

impl From<TimeControlRepr> for TimeControl {
    fn from(raw: TimeControlRepr) -> Self {
        let mode = match raw.mode {
            TimeMode::CustomFuture { offset } => TimeMode::from_offset(offset),
            TimeMode::CustomPast { offset } => TimeMode::from_offset(-offset.abs()),
            named => Some(named),
        }
        .unwrap_or(TimeMode::SceneEnd);

        let image_count = if mode == TimeMode::CurrentOnly {
            1
        } else {
            raw.image_count.clamp(MIN_IMAGE_COUNT, MAX_IMAGE_COUNT)
        };

        Self { mode, unit: raw.unit, image_count }
    }
}
