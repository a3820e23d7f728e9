//! Story/scene text suggestions for the prompt box.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::models::ReferenceImage;
use crate::orchestrator::{GenerationError, ImageGenerator};

const STORY_PROMPT: &str = "# Objective:
To generate text that users can use for creating picture books, based on their input text and images.

# Instructions:
Output only the core text without any prefaces, notes, questions, or image generation. Provide only the core text. Do not include a preface, notes, questions, or explanations. Do not generate images. Language: English.

# Method:
Analyze the user's input text and the content of their images. Create and describe a story that meets the user's requirements. 

# Important:
- Clearly define the scene breaks
- Focus on narrative flow and character development
- Describe settings, characters, and actions vividly
- If reference images are provided, incorporate their elements naturally into the story";

const VIDEO_SCENE_PROMPT: &str = "# Objective:
To generate text that users can use for creating videos, based on their input text and images.

# Instructions:
Output only the core text without any prefaces, notes, questions, or image generation. Provide only the core text. Do not include a preface, notes, questions, or explanations. Do not generate images. Language: English.

# Method:
Analyze the user's input text and the content of their images. Create a detailed text-based storyboard that meets the user's requirements.

# Important:
- Describe the subject's acting and the camera work in concrete and detailed manner
- Include specific shot types (close-up, wide shot, pan, zoom, etc.)
- Specify camera angles and movements
- If the user requests only one scene, create a single scene with a single shot and do not switch shots
- If reference images are provided, describe how they should be used in the video";

const SCENE_KEYWORDS: [&str; 16] = [
    "scene", "shot", "camera", "film", "video", "storyboard", "action", "close-up", "wide shot", "pan", "zoom",
    "cut", "frame", "angle", "cinemat", "direct",
];

const STORY_KEYWORDS: [&str; 12] = [
    "story", "tale", "book", "chapter", "once upon", "narrative", "novel", "fairy", "adventure", "journey",
    "character", "plot",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionMode {
    #[default]
    Story,
    Scene,
    Auto,
}

/// Keyword vote; ties go to story.
pub fn detect_mode(text: &str) -> SuggestionMode {
    let lower = text.to_lowercase();
    let score = |keywords: &[&str]| keywords.iter().filter(|k| lower.contains(*k)).count();
    if score(&SCENE_KEYWORDS[..]) > score(&STORY_KEYWORDS[..]) {
        SuggestionMode::Scene
    } else {
        SuggestionMode::Story
    }
}

pub fn build_prompt(user_text: &str, image_count: usize, mode: SuggestionMode) -> String {
    let template = if mode == SuggestionMode::Scene { VIDEO_SCENE_PROMPT } else { STORY_PROMPT };
    let mut prompt = format!("{template}\n\n");

    if user_text.trim().is_empty() {
        prompt.push_str("# User Input:\n[No text provided - create an engaging story or scene based on the provided images, or if no images, create a sample story about a magical adventure]\n\n");
    } else {
        prompt.push_str(&format!("# User Input:\n{user_text}\n\n"));
    }

    if image_count > 0 {
        prompt.push_str(&format!(
            "# Reference Images:\nThe user has provided {image_count} reference image(s). Please analyze these images and incorporate their elements (characters, settings, objects, mood) into the generated text. Describe how each image relates to the story or scene.\n\n"
        ));
    }

    prompt.push_str("# Generate:\nNow, based on the above context, generate the appropriate text for the user.");
    prompt
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SuggestionRequest {
    #[serde(default)]
    pub current_text: String,
    #[serde(default)]
    pub images: Vec<crate::models::UploadedImage>,
    #[serde(default)]
    pub mode: SuggestionMode,
}

#[derive(Debug, Serialize, Clone)]
pub struct Suggestion {
    pub suggestion: String,
    pub mode: SuggestionMode,
    pub model: String,
    pub processing_time_ms: u64,
}

pub async fn suggest(
    generator: &ImageGenerator,
    current_text: &str,
    images: Vec<ReferenceImage>,
    mode: SuggestionMode,
) -> Result<Suggestion, GenerationError> {
    let started = std::time::Instant::now();
    let mode = match mode {
        SuggestionMode::Auto => detect_mode(current_text),
        other => other,
    };

    info!("🎭 Generating suggestion with mode {:?} ({} chars, {} images)", mode, current_text.len(), images.len());
    let prompt = build_prompt(current_text, images.len(), mode);
    let suggestion = generator.generate_text(prompt, images).await?;

    Ok(Suggestion {
        suggestion,
        mode,
        model: generator.text_model().to_string(),
        processing_time_ms: started.elapsed().as_millis() as u64,
    })
}
