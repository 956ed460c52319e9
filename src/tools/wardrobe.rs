use serde::Deserialize;

use crate::tools::gear::{self, GearArgs};

const MIN_SHARED_WORD_LEN: usize = 4;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WardrobeArgs {
    #[serde(default)]
    pub owned_items: Vec<String>,
    #[serde(default)]
    pub trail_conditions: Vec<String>,
    #[serde(default)]
    pub elevation_gain_m: f64,
    #[serde(default)]
    pub distance_m: f64,
    pub temperature_c: Option<f64>,
}

fn words(s: &str) -> impl Iterator<Item = &str> {
    s.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() >= MIN_SHARED_WORD_LEN)
}

/// Loose match between something the user owns and a recommended item.
pub fn fuzzy_match(owned: &str, needed: &str) -> bool {
    let owned = owned.trim().to_lowercase();
    let needed = needed.trim().to_lowercase();
    if owned.is_empty() || needed.is_empty() {
        return false;
    }
    if owned.contains(&needed) || needed.contains(&owned) {
        return true;
    }
    let shared = words(&owned).any(|o| words(&needed).any(|n| n == o));
    shared
}

pub struct WardrobeReport {
    pub have: Vec<String>,
    pub missing: Vec<String>,
}

impl WardrobeReport {
    pub fn readiness_percent(&self) -> u32 {
        let total = self.have.len() + self.missing.len();
        if total == 0 {
            return 100;
        }
        ((self.have.len() as f64 / total as f64) * 100.0).round() as u32
    }
}

pub fn compare(args: &WardrobeArgs) -> WardrobeReport {
    let needed = gear::recommended_items(&GearArgs {
        trail_conditions: args.trail_conditions.clone(),
        elevation_gain_m: args.elevation_gain_m,
        distance_m: args.distance_m,
        temperature_c: args.temperature_c,
    });

    let (have, missing) = needed
        .into_iter()
        .partition(|item| args.owned_items.iter().any(|o| fuzzy_match(o, item)));
    WardrobeReport { have, missing }
}

pub fn check_wardrobe(args: &WardrobeArgs) -> String {
    if args.owned_items.iter().all(|i| i.trim().is_empty()) {
        return "Tell me what gear you already own (for example: \"I have hiking boots, a rain jacket and a headlamp\") and I'll check it against what this trail needs."
            .to_string();
    }

    let report = compare(args);
    let bullet = |items: &[String]| {
        items
            .iter()
            .map(|i| format!("• {i}"))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let mut paragraphs = Vec::new();
    if !report.have.is_empty() {
        paragraphs.push(format!("✅ You already have:\n{}", bullet(&report.have)));
    }
    if report.missing.is_empty() {
        paragraphs.push("❌ Still needed:\nNothing, you're fully equipped!".to_string());
    } else {
        paragraphs.push(format!("❌ Still needed:\n{}", bullet(&report.missing)));
    }
    paragraphs.push(format!(
        "Readiness: {}% ({} of {} items)",
        report.readiness_percent(),
        report.have.len(),
        report.have.len() + report.missing.len()
    ));
    paragraphs.join("\n\n")
}

/// Pulls item names out of "I have boots, a rain jacket and poles".
pub fn owned_items_from_text(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    let markers = ["i already have", "i have", "i own", "i've got", "i got"];
    let Some(rest) = markers
        .iter()
        .find_map(|m| lower.find(m).map(|idx| &lower[idx + m.len()..]))
    else {
        return Vec::new();
    };
    let rest = rest
        .split(['.', '?', '!'])
        .next()
        .unwrap_or_default();

    rest.split(',')
        .flat_map(|part| part.split(" and "))
        .map(|part| {
            let part = part.trim();
            ["a ", "an ", "some ", "my ", "the "]
                .iter()
                .find_map(|article| part.strip_prefix(article))
                .unwrap_or(part)
                .trim()
                .to_string()
        })
        .filter(|part| !part.is_empty())
        .collect()
}
