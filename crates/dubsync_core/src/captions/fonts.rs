//! Caption font selection against the installed font families.

use std::collections::{BTreeMap, BTreeSet};

use crate::media::{MediaResult, ToolRunner};
use crate::models::DubLanguage;

const FC_LIST: &str = "fc-list";

/// Lists installed font families.
pub trait FontProbe: Send + Sync {
    fn installed_families(&self) -> MediaResult<BTreeSet<String>>;
}

/// Font probe backed by `fc-list : family`.
#[derive(Clone, Default)]
pub struct FcListProbe {
    runner: ToolRunner,
}

impl FcListProbe {
    pub fn new(runner: ToolRunner) -> Self {
        Self { runner }
    }
}

impl FontProbe for FcListProbe {
    fn installed_families(&self) -> MediaResult<BTreeSet<String>> {
        let output = self
            .runner
            .run(FC_LIST, &[":".to_string(), "family".to_string()])?;
        Ok(parse_families(&output))
    }
}

/// Parse `fc-list` family output; one font per line, aliases comma separated.
pub fn parse_families(output: &str) -> BTreeSet<String> {
    output
        .lines()
        .flat_map(|line| line.split(','))
        .map(|family| family.trim().replace("\\-", "-"))
        .filter(|family| !family.is_empty())
        .collect()
}

/// Preferred families, best first. The first entry is the language default.
pub fn default_fonts(language: DubLanguage) -> Vec<String> {
    let fonts: &[&str] = match language {
        DubLanguage::Hindi => &["Noto Sans Devanagari", "Lohit Devanagari", "Mangal"],
        DubLanguage::English | DubLanguage::Spanish => &["Noto Sans", "DejaVu Sans", "Arial"],
    };
    fonts.iter().map(|f| f.to_string()).collect()
}

/// The chosen caption font.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontChoice {
    pub font: String,
    /// True when no preferred family was confirmed installed.
    pub fallback: bool,
    /// Set when the probe itself failed.
    pub probe_error: Option<String>,
}

/// Pick the first preferred family the probe confirms, else the language default.
///
/// Entries in `overrides` (keyed by language code) replace the built-in list.
pub fn select_font(
    language: DubLanguage,
    overrides: &BTreeMap<String, Vec<String>>,
    probe: &dyn FontProbe,
) -> FontChoice {
    let preferred = overrides
        .get(language.code())
        .filter(|list| !list.is_empty())
        .cloned()
        .unwrap_or_else(|| default_fonts(language));
    let default = preferred
        .first()
        .cloned()
        .unwrap_or_else(|| "Sans".to_string());

    let installed = match probe.installed_families() {
        Ok(installed) => installed,
        Err(e) => {
            return FontChoice {
                font: default,
                fallback: true,
                probe_error: Some(e.to_string()),
            }
        }
    };

    let found = preferred.iter().find(|family| {
        installed
            .iter()
            .any(|name| name.eq_ignore_ascii_case(family))
    });

    match found {
        Some(font) => FontChoice {
            font: font.clone(),
            fallback: false,
            probe_error: None,
        },
        None => FontChoice {
            font: default,
            fallback: true,
            probe_error: None,
        },
    }
}
