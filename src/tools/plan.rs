use chrono::{NaiveTime, Timelike};
use serde::Deserialize;

use crate::tools::trail_analysis::{estimated_minutes, format_duration};

const DEFAULT_START: (u32, u32) = (8, 0);
const BREAK_EVERY_MIN: u32 = 90;
const BREAK_LENGTH_MIN: u32 = 10;
const WATER_L_PER_HOUR: f64 = 0.5;
const HOT_EXTRA_L_PER_HOUR: f64 = 0.25;
const LATEST_FINISH_MIN: u32 = 18 * 60;
const MINUTES_PER_DAY: u32 = 24 * 60;
const MAX_LISTED_BREAKS: u32 = 8;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlanArgs {
    #[serde(default)]
    pub distance_m: f64,
    #[serde(default)]
    pub elevation_gain_m: f64,
    #[serde(default)]
    pub trail_conditions: Vec<String>,
    pub start_time: Option<String>,
}

#[derive(Debug, PartialEq)]
pub struct HikePlan {
    pub start_min: u32,
    pub hiking_min: u32,
    pub break_count: u32,
    /// Clock times of the first breaks, at most `MAX_LISTED_BREAKS`.
    pub breaks: Vec<u32>,
    pub finish_min: u32,
    pub water_liters: f64,
}

fn parse_start(value: Option<&str>) -> u32 {
    value
        .and_then(|s| {
            let s = s.trim();
            NaiveTime::parse_from_str(s, "%H:%M")
                .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
                .ok()
        })
        .map(|t| t.hour() * 60 + t.minute())
        .unwrap_or(DEFAULT_START.0 * 60 + DEFAULT_START.1)
}

pub fn clock(minutes: u32) -> String {
    let of_day = minutes % MINUTES_PER_DAY;
    let suffix = match minutes / MINUTES_PER_DAY {
        0 => String::new(),
        1 => " (+1 day)".to_string(),
        days => format!(" (+{days} days)"),
    };
    format!("{:02}:{:02}{suffix}", of_day / 60, of_day % 60)
}

pub fn build_plan(args: &PlanArgs) -> HikePlan {
    let start_min = parse_start(args.start_time.as_deref());
    let hiking_min = estimated_minutes(args.distance_m, args.elevation_gain_m);

    // A break after every full 90 minutes of walking, none at the finish.
    let break_count = hiking_min.saturating_sub(1) / BREAK_EVERY_MIN;
    let breaks = (1..=break_count.min(MAX_LISTED_BREAKS))
        .map(|k| start_min + k * BREAK_EVERY_MIN + (k - 1) * BREAK_LENGTH_MIN)
        .collect();
    let finish_min = start_min
        .saturating_add(hiking_min)
        .saturating_add(break_count.saturating_mul(BREAK_LENGTH_MIN));

    let hot = args
        .trail_conditions
        .iter()
        .any(|c| c.to_lowercase().contains("hot"));
    let per_hour = WATER_L_PER_HOUR + if hot { HOT_EXTRA_L_PER_HOUR } else { 0.0 };
    let water = (hiking_min as f64 / 60.0 * per_hour * 10.0).round() / 10.0;

    HikePlan {
        start_min,
        hiking_min,
        break_count,
        breaks,
        finish_min,
        water_liters: water.max(WATER_L_PER_HOUR),
    }
}

pub fn hiking_plan(args: &PlanArgs) -> String {
    let plan = build_plan(args);

    let mut schedule = vec![format!("🕗 {} Start hiking", clock(plan.start_min))];
    for (i, at) in plan.breaks.iter().enumerate() {
        schedule.push(format!(
            "☕ {} Break {} ({} min: snack, water, check the map)",
            clock(*at),
            i + 1,
            BREAK_LENGTH_MIN
        ));
    }
    let unlisted = plan.break_count as usize - plan.breaks.len();
    if unlisted > 0 {
        schedule.push(format!("… and {unlisted} more break(s)"));
    }
    schedule.push(format!("🏁 {} Finish", clock(plan.finish_min)));

    let mut paragraphs = vec![
        format!(
            "🥾 Hiking plan for {:.1} km with {:.0} m of climbing\nMoving time: {} plus {} break(s)",
            args.distance_m / 1000.0,
            args.elevation_gain_m,
            format_duration(plan.hiking_min),
            plan.break_count
        ),
        schedule.join("\n"),
        format!("💧 Water: carry at least {:.1} L", plan.water_liters),
    ];

    if plan.finish_min > LATEST_FINISH_MIN {
        let total = plan.finish_min - plan.start_min;
        let suggested = LATEST_FINISH_MIN.saturating_sub(total);
        let hint = if suggested > 0 {
            format!("start by {} to finish before 18:00", clock(suggested))
        } else {
            "consider splitting the route or planning a turnaround point".to_string()
        };
        paragraphs.push(format!(
            "⚠️ You'd finish after 18:00 and risk running out of daylight: {hint}."
        ));
    }

    paragraphs.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(distance_m: f64, elevation: f64, start: Option<&str>) -> PlanArgs {
        PlanArgs {
            distance_m,
            elevation_gain_m: elevation,
            trail_conditions: vec![],
            start_time: start.map(str::to_string),
        }
    }

    #[test]
    fn default_start_and_breaks() {
        // 15 km + 600 m = 3h + 1h = 240 min, breaks at 90 and 180 minutes of walking
        let plan = build_plan(&args(15_000.0, 600.0, None));
        assert_eq!(plan.start_min, 8 * 60);
        assert_eq!(plan.hiking_min, 240);
        assert_eq!(plan.breaks, vec![8 * 60 + 90, 8 * 60 + 190]);
        assert_eq!(plan.finish_min, 8 * 60 + 260);
        assert_eq!(plan.water_liters, 2.0);
    }

    #[test]
    fn exactly_ninety_minutes_has_no_break() {
        let plan = build_plan(&args(7_500.0, 0.0, Some("09:15")));
        assert_eq!(plan.hiking_min, 90);
        assert!(plan.breaks.is_empty());
        assert_eq!(clock(plan.finish_min), "10:45");
    }

    #[test]
    fn hot_trails_need_more_water() {
        let mut hot = args(10_000.0, 0.0, None);
        hot.trail_conditions = vec!["hot".into()];
        assert_eq!(build_plan(&hot).water_liters, 1.5);
        assert_eq!(build_plan(&args(10_000.0, 0.0, None)).water_liters, 1.0);
    }

    #[test]
    fn invalid_start_falls_back_to_default() {
        assert_eq!(build_plan(&args(1000.0, 0.0, Some("noonish"))).start_min, 480);
        assert_eq!(build_plan(&args(1000.0, 0.0, Some("06:30:00"))).start_min, 390);
    }

    #[test]
    fn late_finish_warns() {
        let text = hiking_plan(&args(25_000.0, 1200.0, Some("13:00")));
        assert!(text.contains("⚠️ You'd finish after 18:00"));
        assert!(text.contains("start by"));

        let text = hiking_plan(&args(5_000.0, 0.0, None));
        assert!(!text.contains("⚠️"));
        assert!(text.contains("🕗 08:00 Start hiking"));
        assert!(text.contains("🏁 09:00 Finish"));
    }

    #[test]
    fn clock_wraps_past_midnight() {
        assert_eq!(clock(25 * 60 + 5), "01:05 (+1 day)");
        assert_eq!(clock(49 * 60), "01:00 (+2 days)");
        assert_eq!(clock(0), "00:00");
    }

    #[test]
    fn huge_distance_saturates_and_lists_few_breaks() {
        let plan = build_plan(&args(1.0e12, 0.0, None));
        assert_eq!(plan.hiking_min, u32::MAX);
        assert_eq!(plan.finish_min, u32::MAX);
        assert_eq!(plan.breaks.len(), MAX_LISTED_BREAKS as usize);
        assert!(plan.break_count > MAX_LISTED_BREAKS);

        let text = hiking_plan(&args(1.0e12, 0.0, None));
        assert!(text.contains("more break(s)"));
        assert!(text.lines().count() < 30);
    }

    #[test]
    fn long_day_lists_every_break() {
        // 50 km = 600 min: breaks after 90, 180, .. 540 minutes of walking
        let plan = build_plan(&args(50_000.0, 0.0, None));
        assert_eq!(plan.break_count, 6);
        assert_eq!(plan.breaks.len(), 6);
        assert!(!hiking_plan(&args(50_000.0, 0.0, None)).contains("more break(s)"));
    }
}
