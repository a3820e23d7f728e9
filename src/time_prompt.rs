//! Turns a time-point selection into the English instruction appended to the
//! user's scene text.
//!
//! Output is deterministic and begins with a newline, except for
//! [`TimeMode::CurrentOnly`] which contributes nothing.

use crate::time_control::{TimeControl, TimeMode, TimeUnit};

pub fn synthesize(mode: TimeMode, unit: TimeUnit, image_count: u32) -> String {
    match mode {
        TimeMode::CurrentOnly => String::new(),
        TimeMode::SceneStart => scene_start(image_count),
        TimeMode::SceneEnd => scene_end(image_count),
        TimeMode::CustomFuture { offset } => custom_future(offset.abs(), unit, image_count),
        TimeMode::CustomPast { offset } => custom_past(offset.abs(), unit, image_count),
    }
}

impl TimeControl {
    pub fn instruction(&self) -> String {
        synthesize(self.mode(), self.unit(), self.image_count())
    }
}

fn scene_start(count: u32) -> String {
    if count <= 1 {
        "\nGenerate the initial image showing the very beginning of this scene.".to_string()
    } else {
        format!(
            "\nGenerate {count} separate, independent images proceeding from the beginning of this scene, including its initial stages."
        )
    }
}

fn scene_end(count: u32) -> String {
    if count <= 1 {
        "\nGenerate the final image showing the end of this scene.".to_string()
    } else {
        format!(
            "\nGenerate {count} separate, independent images in sequence through this scene to its end, including the intermediate stages."
        )
    }
}

fn custom_future(offset: f64, unit: TimeUnit, count: u32) -> String {
    if count <= 1 {
        return format!("\nDepict this scene {offset} {unit} after the present moment.");
    }

    let interval = offset / f64::from(count - 1);
    let labels: Vec<String> = (0..count)
        .map(|i| {
            if i == 0 {
                "time 0 (now)".to_string()
            } else {
                let point = round2(interval * f64::from(i));
                format!("{} {unit} later", format_time_point(point))
            }
        })
        .collect();

    format!(
        "\nGenerate {count} distinct, separate, independent images of this scene at the following intervals: {}.",
        labels.join(", ")
    )
}

fn custom_past(offset: f64, unit: TimeUnit, count: u32) -> String {
    if count <= 1 {
        return format!("\nImagine and generate this scene as it was {offset} {unit} before the present moment.");
    }

    let interval = offset / f64::from(count - 1);
    let labels: Vec<String> = (0..count)
        .map(|i| {
            let point = round2(offset - interval * f64::from(i));
            if point == 0.0 {
                "present moment".to_string()
            } else {
                format!("{} {unit} before", format_time_point(point))
            }
        })
        .collect();

    format!(
        "\nGenerate {count} distinct, separate, independent images of this scene at the following intervals, ordered from the most distant past to the present: {}.",
        labels.join(", ")
    )
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Renders a rounded time point with the fewest digits needed: `5`, `2.5`, `3.33`.
pub fn format_time_point(value: f64) -> String {
    let fixed = format!("{:.2}", round2(value));
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    match trimmed {
        "-0" | "" => "0".to_string(),
        other => other.to_string(),
    }
}
