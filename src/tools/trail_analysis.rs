use serde::Deserialize;

/// Naismith: 5 km/h on the flat plus one hour per 600 m climbed.
const FLAT_SPEED_KMH: f64 = 5.0;
const CLIMB_M_PER_HOUR: f64 = 600.0;
const HAZARD_WEIGHT: f64 = 2.0;

const HAZARDS: &[&str] = &["rocky", "steep", "snowy", "icy", "muddy", "river", "scramble"];

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrailAnalysisArgs {
    #[serde(default)]
    pub distance_m: f64,
    #[serde(default)]
    pub elevation_gain_m: f64,
    #[serde(default)]
    pub trail_conditions: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Difficulty {
    Easy,
    Moderate,
    Hard,
    VeryHard,
}

impl Difficulty {
    pub fn from_score(score: f64) -> Self {
        if score < 8.0 {
            Difficulty::Easy
        } else if score < 15.0 {
            Difficulty::Moderate
        } else if score < 25.0 {
            Difficulty::Hard
        } else {
            Difficulty::VeryHard
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Moderate => "Moderate",
            Difficulty::Hard => "Hard",
            Difficulty::VeryHard => "Very Hard",
        }
    }
}

pub fn hazard_count(conditions: &[String]) -> usize {
    HAZARDS
        .iter()
        .filter(|h| conditions.iter().any(|c| c.to_lowercase().contains(*h)))
        .count()
}

pub fn difficulty_score(distance_m: f64, elevation_gain_m: f64, conditions: &[String]) -> f64 {
    distance_m / 1000.0 + elevation_gain_m / 100.0 + HAZARD_WEIGHT * hazard_count(conditions) as f64
}

pub fn estimated_minutes(distance_m: f64, elevation_gain_m: f64) -> u32 {
    let hours = distance_m / 1000.0 / FLAT_SPEED_KMH + elevation_gain_m / CLIMB_M_PER_HOUR;
    (hours * 60.0).round().max(0.0) as u32
}

pub fn format_duration(minutes: u32) -> String {
    format!("{}h {:02}m", minutes / 60, minutes % 60)
}

fn condition_note(condition: &str) -> Option<&'static str> {
    let notes: &[(&str, &str)] = &[
        ("rocky", "uneven footing, ankle-supporting boots help"),
        ("steep", "use poles on the descents and keep steps short"),
        ("snowy", "check avalanche reports, traction may be needed"),
        ("icy", "microspikes or crampons recommended"),
        ("muddy", "expect a slower pace and slippery sections"),
        ("river", "water crossings, check levels after rain"),
        ("scramble", "hands-on sections, stow your poles"),
        ("rain", "slippery surfaces, pack waterproofs"),
        ("hot", "start early and carry extra water"),
        ("cold", "layer up and limit long stops"),
    ];
    let condition = condition.to_lowercase();
    notes
        .iter()
        .find(|(key, _)| condition.contains(key))
        .map(|(_, note)| *note)
}

pub fn analyze_trail(args: &TrailAnalysisArgs) -> String {
    let score = difficulty_score(args.distance_m, args.elevation_gain_m, &args.trail_conditions);
    let difficulty = Difficulty::from_score(score);
    let minutes = estimated_minutes(args.distance_m, args.elevation_gain_m);

    let mut overview = format!(
        "📊 Trail analysis\nDistance: {:.1} km\nElevation gain: {:.0} m",
        args.distance_m / 1000.0,
        args.elevation_gain_m
    );
    if args.distance_m > 0.0 {
        overview.push_str(&format!(
            "\nAverage grade: {:.1}%",
            args.elevation_gain_m / args.distance_m * 100.0
        ));
    }

    let mut paragraphs = vec![
        overview,
        format!("Difficulty: {} (score {:.1})", difficulty.label(), score),
        format!(
            "Estimated time: {} (Naismith's rule: 5 km/h plus 1 h per 600 m of ascent, breaks not included)",
            format_duration(minutes)
        ),
    ];

    let notes: Vec<String> = args
        .trail_conditions
        .iter()
        .filter_map(|c| condition_note(c).map(|note| format!("• {c}: {note}")))
        .collect();
    if notes.is_empty() {
        paragraphs.push("No special trail conditions reported.".to_string());
    } else {
        paragraphs.push(format!("Conditions to prepare for:\n{}", notes.join("\n")));
    }

    paragraphs.join("\n\n")
}
