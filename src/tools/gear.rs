use std::collections::BTreeMap;

use serde::Deserialize;

use crate::tools::knowledge::{self, Category, ESSENTIALS};

const HOT_ABOVE_C: f64 = 25.0;
const COLD_BELOW_C: f64 = 5.0;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GearArgs {
    #[serde(default)]
    pub trail_conditions: Vec<String>,
    #[serde(default)]
    pub elevation_gain_m: f64,
    #[serde(default)]
    pub distance_m: f64,
    pub temperature_c: Option<f64>,
}

impl GearArgs {
    /// Trail conditions plus the temperature band, if any.
    fn effective_conditions(&self) -> Vec<String> {
        let mut conditions = self.trail_conditions.clone();
        let band = match self.temperature_c {
            Some(t) if t > HOT_ABOVE_C => Some("hot"),
            Some(t) if t < COLD_BELOW_C => Some("cold"),
            _ => None,
        };
        if let Some(band) = band {
            if !conditions.iter().any(|c| c.eq_ignore_ascii_case(band)) {
                conditions.push(band.to_string());
            }
        }
        conditions
    }
}

/// Flat list of recommended items, essentials included.
pub fn recommended_items(args: &GearArgs) -> Vec<String> {
    let mut items = knowledge::retrieve_gear(
        &args.effective_conditions(),
        args.elevation_gain_m,
        args.distance_m,
    );
    for essential in ESSENTIALS {
        if !items.iter().any(|i| i == essential) {
            items.push(essential.to_string());
        }
    }
    items
}

pub fn recommend_gear(args: &GearArgs) -> String {
    let conditions = args.effective_conditions();
    let mut grouped: BTreeMap<Category, Vec<String>> = BTreeMap::new();
    for item in recommended_items(args) {
        grouped.entry(knowledge::categorize(&item)).or_default().push(item);
    }

    let described = if conditions.is_empty() {
        "no special conditions reported".to_string()
    } else {
        format!("conditions: {}", conditions.join(", "))
    };
    let mut paragraphs = vec![format!(
        "Based on your trail ({:.1} km, {:.0} m elevation gain, {}), here's what I recommend bringing:",
        args.distance_m / 1000.0,
        args.elevation_gain_m,
        described
    )];

    for category in Category::ALL {
        if let Some(items) = grouped.get(&category) {
            let lines: Vec<String> = items.iter().map(|i| format!("• {i}")).collect();
            paragraphs.push(format!("**{}**\n{}", category.label(), lines.join("\n")));
        }
    }

    paragraphs.push(
        "_These recommendations are based on the trail conditions, distance and elevation gain. Adjust for the forecast on the day._"
            .to_string(),
    );
    paragraphs.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(conditions: &[&str], elevation: f64, distance: f64, temp: Option<f64>) -> GearArgs {
        GearArgs {
            trail_conditions: conditions.iter().map(|s| s.to_string()).collect(),
            elevation_gain_m: elevation,
            distance_m: distance,
            temperature_c: temp,
        }
    }

    #[test]
    fn essentials_are_always_included() {
        let items = recommended_items(&GearArgs::default());
        for essential in ESSENTIALS {
            assert!(items.iter().any(|i| i == essential), "missing {essential}");
        }
    }

    #[test]
    fn temperature_adds_hot_or_cold_gear() {
        let hot = recommended_items(&args(&[], 0.0, 0.0, Some(30.0)));
        assert!(hot.contains(&"Sunscreen".to_string()));
        let cold = recommended_items(&args(&[], 0.0, 0.0, Some(-2.0)));
        assert!(cold.contains(&"Gloves".to_string()));
        let mild = recommended_items(&args(&[], 0.0, 0.0, Some(15.0)));
        assert!(!mild.contains(&"Sunscreen".to_string()));
        assert!(!mild.contains(&"Gloves".to_string()));
    }

    #[test]
    fn response_is_grouped_by_category() {
        let text = recommend_gear(&args(&["rocky", "rainy"], 800.0, 12_000.0, None));
        assert!(text.starts_with("Based on your trail (12.0 km, 800 m elevation gain, conditions: rocky, rainy)"));
        assert!(text.contains("**Footwear**\n• Hiking Boots"));
        assert!(text.contains("**Clothing**\n• Rain Jacket\n• Extra Layers"));
        assert!(text.contains("• Blister Plasters"));
        assert!(text.trim_end().ends_with('_'));

        let footwear = text.find("**Footwear**").unwrap();
        let food = text.find("**Food & Water**").unwrap();
        assert!(footwear < food);
    }

    #[test]
    fn paragraphs_are_blank_line_separated() {
        let text = recommend_gear(&GearArgs::default());
        let paragraphs: Vec<&str> = text.split("\n\n").collect();
        assert!(paragraphs[0].contains("no special conditions reported"));
        assert!(paragraphs.iter().any(|p| p.starts_with("**Safety**")));
        assert!(paragraphs.last().unwrap().starts_with("_These recommendations"));
    }
}
