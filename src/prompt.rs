use crate::aspect_ratio::{self, AspectRatio, AspectRatioError};
use crate::models::ReferenceImage;
use crate::time_control::TimeControl;

/// `trim(user_text) + time_clause + aspect_clause`, with no separators added.
pub fn compose(user_text: &str, time_clause: &str, aspect_clause: &str) -> String {
    let user_text = user_text.trim();
    let mut prompt = String::with_capacity(user_text.len() + time_clause.len() + aspect_clause.len());
    prompt.push_str(user_text);
    prompt.push_str(time_clause);
    prompt.push_str(aspect_clause);
    prompt
}

#[derive(Debug, Clone)]
pub struct ComposedPrompt {
    pub text: String,
    /// User uploads in their original order, then the aspect-ratio blank if any.
    pub images: Vec<ReferenceImage>,
}

impl ComposedPrompt {
    pub fn has_blank_image(&self) -> bool {
        self.images
            .last()
            .is_some_and(|img| img.source == crate::models::ImageSource::AspectRatioBlank)
    }
}

/// Builds the exact text and image list the image model receives.
pub fn assemble(
    user_text: &str,
    time_control: &TimeControl,
    ratio: AspectRatio,
    uploads: Vec<ReferenceImage>,
) -> Result<ComposedPrompt, AspectRatioError> {
    let resolved = aspect_ratio::resolve(ratio)?;
    let text = compose(user_text, &time_control.instruction(), resolved.prompt_suffix);

    let mut images = uploads;
    images.extend(resolved.blank_image);

    Ok(ComposedPrompt { text, images })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ImageSource;
    use crate::time_control::{TimeMode, TimeUnit};
    use pretty_assertions::assert_eq;

    #[test]
    fn compose_is_plain_concatenation_after_trim() {
        assert_eq!(
            compose("  a cat on a roof \n", "\nGenerate the final image.", " Keep it square."),
            "a cat on a roof\nGenerate the final image. Keep it square."
        );
        assert_eq!(compose("x", "", ""), "x");
    }

    #[test]
    fn assemble_appends_blank_image_last() {
        let uploads = vec![
            ReferenceImage::uploaded(Some("a.png".into()), "image/png", vec![1, 2, 3]),
            ReferenceImage::uploaded(Some("b.jpg".into()), "image/jpeg", vec![4, 5]),
        ];
        let state = TimeControl::new(TimeMode::CustomFuture { offset: 10.0 }, TimeUnit::Minutes, 3);

        let composed = assemble(" a harbor at dawn ", &state, AspectRatio::Landscape, uploads).unwrap();

        assert_eq!(composed.images.len(), 3);
        assert_eq!(composed.images[0].name.as_deref(), Some("a.png"));
        assert_eq!(composed.images[1].name.as_deref(), Some("b.jpg"));
        assert_eq!(composed.images[2].source, ImageSource::AspectRatioBlank);
        assert!(composed.has_blank_image());
        assert_eq!(
            composed.text,
            "a harbor at dawn\nGenerate 3 distinct, separate, independent images of this scene at the following intervals: time 0 (now), 5 minutes later, 10 minutes later. Maintain the aspect ratio of the last reference white blank image."
        );
    }

    #[test]
    fn auto_ratio_and_current_only_leave_text_untouched() {
        let state = TimeControl::new(TimeMode::CurrentOnly, TimeUnit::Minutes, 1);
        let composed = assemble("a quiet street", &state, AspectRatio::Auto, Vec::new()).unwrap();
        assert_eq!(composed.text, "a quiet street");
        assert!(composed.images.is_empty());
        assert!(!composed.has_blank_image());
    }
}
