//! Caption writing (SRT) and burn-in styling.

mod fonts;
mod srt;
mod style;

pub use fonts::{default_fonts, parse_families, select_font, FcListProbe, FontChoice, FontProbe};
pub use srt::{format_timestamp, render_srt, wrap_caption, write_srt};
pub use style::{force_style, scale_for_height, CaptionLayout};
