//! Resolution-aware caption styling for the ffmpeg `subtitles` filter.

use crate::config::CaptionSettings;
use crate::models::CaptionStyle;

/// Font size multiplier of the `large` style.
const LARGE_FACTOR: f64 = 1.35;

/// Sizes scaled to the output frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptionLayout {
    pub font_size: u32,
    pub outline: u32,
    pub margin_v: u32,
}

impl CaptionLayout {
    /// Scale the base sizes by `frame_height / reference_height`, clamped.
    ///
    /// Unknown frame height uses the base sizes.
    pub fn for_frame(frame_height: Option<u32>, settings: &CaptionSettings) -> Self {
        let scale = scale_for_height(frame_height, settings);
        Self {
            font_size: scaled(settings.base_font_size, scale),
            outline: scaled(settings.base_outline, scale),
            margin_v: scaled(settings.base_margin_v, scale),
        }
    }
}

pub fn scale_for_height(frame_height: Option<u32>, settings: &CaptionSettings) -> f64 {
    match frame_height {
        Some(height) if height > 0 && settings.reference_height > 0 => {
            (height as f64 / settings.reference_height as f64)
                .clamp(settings.min_scale, settings.max_scale)
        }
        _ => 1.0,
    }
}

fn scaled(base: f64, scale: f64) -> u32 {
    (base * scale).round().max(0.0) as u32
}

/// Build the ASS `force_style` override for a style variant.
pub fn force_style(style: CaptionStyle, font: &str, layout: CaptionLayout) -> String {
    let mut fields = vec![
        format!("FontName={}", font),
        format!(
            "FontSize={}",
            match style {
                CaptionStyle::Large => (layout.font_size as f64 * LARGE_FACTOR).round() as u32,
                _ => layout.font_size,
            }
        ),
        "PrimaryColour=&H00FFFFFF".to_string(),
        "OutlineColour=&H00000000".to_string(),
        "Alignment=2".to_string(),
        format!("MarginV={}", layout.margin_v),
    ];

    match style {
        CaptionStyle::Plain | CaptionStyle::Large => {
            fields.push("BorderStyle=1".into());
            fields.push(format!("Outline={}", layout.outline));
            fields.push("Shadow=0".into());
        }
        CaptionStyle::Bold => {
            fields.push("Bold=1".into());
            fields.push("BorderStyle=1".into());
            fields.push(format!("Outline={}", layout.outline + 1));
            fields.push("Shadow=1".into());
        }
        CaptionStyle::Boxed => {
            fields.push("BorderStyle=3".into());
            fields.push("BackColour=&H80000000".into());
            fields.push(format!("Outline={}", layout.outline.max(1)));
            fields.push("Shadow=0".into());
        }
    }

    fields.join(",")
}
