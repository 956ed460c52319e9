//! In-memory gear knowledge base: condition keywords to gear lists, plus the
//! category rules used when presenting gear.

use once_cell::sync::Lazy;

pub struct GearEntry {
    pub condition: &'static str,
    pub gear: &'static [&'static str],
}

pub static GEAR_KB: Lazy<Vec<GearEntry>> = Lazy::new(|| {
    vec![
        GearEntry {
            condition: "rocky",
            gear: &["Hiking Boots", "Trekking Poles"],
        },
        GearEntry {
            condition: "rainy",
            gear: &["Rain Jacket", "Waterproof Backpack"],
        },
        GearEntry {
            condition: "snowy",
            gear: &["Insulated Jacket", "Snow Boots", "Gaiters"],
        },
        GearEntry {
            condition: "muddy",
            gear: &["Waterproof Boots", "Gaiters"],
        },
        GearEntry {
            condition: "steep",
            gear: &["Trekking Poles", "High-Traction Shoes"],
        },
        GearEntry {
            condition: "hot",
            gear: &["Sun Hat", "Sunscreen", "Extra Water"],
        },
        GearEntry {
            condition: "cold",
            gear: &["Thermal Layers", "Gloves", "Beanie"],
        },
        GearEntry {
            condition: "long",
            gear: &["Extra Snacks", "Water Reservoir"],
        },
        GearEntry {
            condition: "river",
            gear: &["Water Shoes", "Quick-Dry Towel"],
        },
    ]
});

pub const ESSENTIALS: &[&str] = &[
    "Water Bottle",
    "First Aid Kit",
    "Navigation (map or GPS)",
    "Headlamp",
];

pub const HIGH_ELEVATION_GAIN_M: f64 = 500.0;
pub const LONG_DISTANCE_M: f64 = 10_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Category {
    Footwear,
    Clothing,
    Equipment,
    Safety,
    FoodAndWater,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Footwear,
        Category::Clothing,
        Category::Equipment,
        Category::Safety,
        Category::FoodAndWater,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Category::Footwear => "Footwear",
            Category::Clothing => "Clothing",
            Category::Equipment => "Equipment",
            Category::Safety => "Safety",
            Category::FoodAndWater => "Food & Water",
        }
    }
}

/// Keyword rules, checked in order; "Waterproof Boots" must land in footwear
/// before "water" sends it to food & water.
pub fn categorize(item: &str) -> Category {
    let item = item.to_lowercase();
    let has = |words: &[&str]| words.iter().any(|w| item.contains(w));

    if has(&["boot", "shoe", "gaiter", "sock", "crampon", "microspike"]) {
        Category::Footwear
    } else if has(&["jacket", "layer", "hat", "glove", "beanie", "fleece", "thermal", "pants"]) {
        Category::Clothing
    } else if has(&["first aid", "sunscreen", "headlamp", "blister", "navigation", "map", "whistle"]) {
        Category::Safety
    } else if has(&["pole", "pack", "towel", "tent"]) {
        Category::Equipment
    } else if has(&["water", "snack", "food", "electrolyte"]) {
        Category::FoodAndWater
    } else {
        Category::Equipment
    }
}

/// A condition matches an entry when either string contains the other.
pub fn condition_matches(condition: &str, keyword: &str) -> bool {
    let condition = condition.trim().to_lowercase();
    !condition.is_empty() && (keyword.contains(&condition) || condition.contains(keyword))
}

fn push_unique(gear: &mut Vec<String>, item: &str) {
    if !gear.iter().any(|g| g == item) {
        gear.push(item.to_string());
    }
}

/// Gear suggested by the knowledge base for the given trail, in a stable order.
pub fn retrieve_gear(trail_conditions: &[String], elevation: f64, distance: f64) -> Vec<String> {
    let mut gear = Vec::new();
    for cond in trail_conditions {
        for entry in GEAR_KB.iter() {
            if condition_matches(cond, entry.condition) {
                for item in entry.gear {
                    push_unique(&mut gear, item);
                }
            }
        }
    }
    if elevation > HIGH_ELEVATION_GAIN_M {
        push_unique(&mut gear, "Extra Layers");
    }
    if distance > LONG_DISTANCE_M {
        push_unique(&mut gear, "Blister Plasters");
    }
    gear
}

/// Knowledge-base keywords that appear in free text.
pub fn conditions_mentioned(text: &str) -> Vec<String> {
    let text = text.to_lowercase();
    let stems: &[(&str, &str)] = &[
        ("rock", "rocky"),
        ("rain", "rainy"),
        ("snow", "snowy"),
        ("mud", "muddy"),
        ("steep", "steep"),
        ("hot", "hot"),
        ("heat", "hot"),
        ("cold", "cold"),
        ("freez", "cold"),
        ("long", "long"),
        ("river", "river"),
        ("stream", "river"),
    ];
    let mut found: Vec<String> = Vec::new();
    for (stem, condition) in stems {
        let hit = text
            .split(|c: char| !c.is_alphanumeric())
            .any(|word| word.starts_with(stem));
        if hit && !found.iter().any(|f| f == condition) {
            found.push(condition.to_string());
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn rocky_and_rainy_trail() {
        let gear = retrieve_gear(&strings(&["rocky", "rainy"]), 100.0, 5000.0);
        assert_eq!(
            gear,
            strings(&["Hiking Boots", "Trekking Poles", "Rain Jacket", "Waterproof Backpack"])
        );
    }

    #[test]
    fn substrings_match_both_ways() {
        assert!(condition_matches("rain", "rainy"));
        assert!(condition_matches("Very Rocky", "rocky"));
        assert!(!condition_matches("", "rocky"));
        assert!(!condition_matches("sandy", "rocky"));
    }

    #[test]
    fn elevation_and_distance_thresholds() {
        let gear = retrieve_gear(&[], 501.0, 10_001.0);
        assert_eq!(gear, strings(&["Extra Layers", "Blister Plasters"]));
        assert!(retrieve_gear(&[], 500.0, 10_000.0).is_empty());
    }

    #[test]
    fn duplicates_are_collapsed() {
        let gear = retrieve_gear(&strings(&["rocky", "steep"]), 0.0, 0.0);
        assert_eq!(
            gear.iter().filter(|g| g.as_str() == "Trekking Poles").count(),
            1
        );
    }

    #[test]
    fn categories_follow_keyword_order() {
        assert_eq!(categorize("Waterproof Boots"), Category::Footwear);
        assert_eq!(categorize("Water Shoes"), Category::Footwear);
        assert_eq!(categorize("Rain Jacket"), Category::Clothing);
        assert_eq!(categorize("Sunscreen"), Category::Safety);
        assert_eq!(categorize("Waterproof Backpack"), Category::Equipment);
        assert_eq!(categorize("Water Reservoir"), Category::FoodAndWater);
        assert_eq!(categorize("Extra Snacks"), Category::FoodAndWater);
        assert_eq!(categorize("Quick-Dry Towel"), Category::Equipment);
        assert_eq!(categorize("Blister Plasters"), Category::Safety);
        assert_eq!(categorize("Carabiner"), Category::Equipment);
    }

    #[test]
    fn conditions_are_found_in_free_text() {
        assert_eq!(
            conditions_mentioned("What should I wear on a rocky trail if it rains?"),
            strings(&["rocky", "rainy"])
        );
        assert_eq!(
            conditions_mentioned("crossing a stream, freezing temps"),
            strings(&["cold", "river"])
        );
        assert!(conditions_mentioned("photographers love this hike").is_empty());
    }
}
