//! Output geometry control.
//!
//! The image model takes no width/height parameter, so a non-`auto` ratio is
//! requested by attaching a white PNG of the target size as the *last*
//! reference image and saying so in the prompt.

use std::io::Cursor;
use std::str::FromStr;

use image::{ImageFormat, Rgb, RgbImage};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::models::{ImageSource, ReferenceImage};

pub const ASPECT_RATIO_SUFFIX: &str = " Maintain the aspect ratio of the last reference white blank image.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "auto")]
    Auto,
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "16:9")]
    Landscape,
    #[serde(rename = "4:3")]
    Classic,
    #[serde(rename = "3:4")]
    PortraitClassic,
    #[serde(rename = "9:16")]
    MobilePortrait,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AspectRatioConfig {
    pub ratio: AspectRatio,
    pub label: &'static str,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Error)]
pub enum AspectRatioError {
    #[error("unknown aspect ratio: {0}")]
    Unknown(String),
    #[error("failed to synthesize {width}x{height} blank image: {source}")]
    Synthesis {
        width: u32,
        height: u32,
        #[source]
        source: image::ImageError,
    },
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 6] = [
        AspectRatio::Auto,
        AspectRatio::Square,
        AspectRatio::Landscape,
        AspectRatio::Classic,
        AspectRatio::PortraitClassic,
        AspectRatio::MobilePortrait,
    ];

    pub fn token(self) -> &'static str {
        match self {
            AspectRatio::Auto => "auto",
            AspectRatio::Square => "1:1",
            AspectRatio::Landscape => "16:9",
            AspectRatio::Classic => "4:3",
            AspectRatio::PortraitClassic => "3:4",
            AspectRatio::MobilePortrait => "9:16",
        }
    }

    pub fn config(self) -> AspectRatioConfig {
        let (label, width, height) = match self {
            AspectRatio::Auto => ("Auto (Default)", 1024, 1024),
            AspectRatio::Square => ("Square (1:1)", 1024, 1024),
            AspectRatio::Landscape => ("Landscape (16:9)", 1920, 1080),
            AspectRatio::Classic => ("Classic (4:3)", 1600, 1200),
            AspectRatio::PortraitClassic => ("Portrait Classic (3:4)", 1200, 1600),
            AspectRatio::MobilePortrait => ("Mobile Portrait (9:16)", 1080, 1920),
        };
        AspectRatioConfig { ratio: self, label, width, height }
    }

    pub fn prompt_suffix(self) -> &'static str {
        match self {
            AspectRatio::Auto => "",
            _ => ASPECT_RATIO_SUFFIX,
        }
    }
}

impl FromStr for AspectRatio {
    type Err = AspectRatioError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        AspectRatio::ALL
            .into_iter()
            .find(|ratio| ratio.token() == token)
            .ok_or_else(|| AspectRatioError::Unknown(token.to_string()))
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedAspectRatio {
    pub prompt_suffix: &'static str,
    pub blank_image: Option<ReferenceImage>,
}

pub fn resolve(ratio: AspectRatio) -> Result<ResolvedAspectRatio, AspectRatioError> {
    if ratio == AspectRatio::Auto {
        return Ok(ResolvedAspectRatio { prompt_suffix: "", blank_image: None });
    }

    let AspectRatioConfig { width, height, .. } = ratio.config();
    let data = white_png(width, height)?;
    debug!(ratio = ratio.token(), width, height, bytes = data.len(), "synthesized blank reference image");

    Ok(ResolvedAspectRatio {
        prompt_suffix: ratio.prompt_suffix(),
        blank_image: Some(ReferenceImage {
            name: Some(format!("white-{width}x{height}.png")),
            mime_type: "image/png".to_string(),
            data,
            source: ImageSource::AspectRatioBlank,
        }),
    })
}

pub fn white_png(width: u32, height: u32) -> Result<Vec<u8>, AspectRatioError> {
    let canvas = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));
    let mut buf = Cursor::new(Vec::new());
    canvas
        .write_to(&mut buf, ImageFormat::Png)
        .map_err(|source| AspectRatioError::Synthesis { width, height, source })?;
    Ok(buf.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_yields_nothing() {
        let resolved = resolve(AspectRatio::Auto).unwrap();
        assert_eq!(resolved.prompt_suffix, "");
        assert!(resolved.blank_image.is_none());
    }

    #[test]
    fn square_yields_1024_white_png() {
        let resolved = resolve(AspectRatio::Square).unwrap();
        assert_eq!(
            resolved.prompt_suffix,
            " Maintain the aspect ratio of the last reference white blank image."
        );
        let blank = resolved.blank_image.unwrap();
        assert_eq!(blank.mime_type, "image/png");
        assert_eq!(blank.source, ImageSource::AspectRatioBlank);

        let decoded = image::load_from_memory(&blank.data).unwrap().to_rgb8();
        assert_eq!(decoded.dimensions(), (1024, 1024));
        assert!(decoded.pixels().all(|p| p.0 == [255, 255, 255]));
    }

    #[test]
    fn every_fixed_ratio_matches_its_table_entry() {
        for ratio in AspectRatio::ALL.into_iter().filter(|r| *r != AspectRatio::Auto) {
            let config = ratio.config();
            let blank = resolve(ratio).unwrap().blank_image.unwrap();
            let decoded = image::load_from_memory(&blank.data).unwrap();
            assert_eq!((decoded.width(), decoded.height()), (config.width, config.height), "{}", ratio.token());
        }
    }

    #[test]
    fn tokens_round_trip_and_unknown_fails() {
        for ratio in AspectRatio::ALL {
            assert_eq!(ratio.token().parse::<AspectRatio>().unwrap(), ratio);
        }
        assert!(matches!("21:9".parse::<AspectRatio>(), Err(AspectRatioError::Unknown(_))));
        assert!(serde_json::from_str::<AspectRatio>("\"2:1\"").is_err());
        assert_eq!(serde_json::from_str::<AspectRatio>("\"16:9\"").unwrap(), AspectRatio::Landscape);
    }
}
