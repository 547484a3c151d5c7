use chrono::{Datelike, Utc};

pub const SEASON_ENV: &str = "PICKEM_SEASON";

/// Get the current season identifier
/// Format: YYYY, the calendar year the season starts in. Games in January
/// and February still belong to the previous year's season.
pub fn current_season() -> String {
    if let Ok(season) = std::env::var(SEASON_ENV) {
        let season = season.trim();
        if !season.is_empty() {
            return season.to_string();
        }
    }

    let now = Utc::now();
    season_for(now.year(), now.month())
}

fn season_for(year: i32, month: u32) -> String {
    match month {
        1 | 2 => (year - 1).to_string(),
        _ => year.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_season_format() {
        let season = current_season();
        assert!(!season.is_empty());
    }

    #[test]
    fn test_postseason_months_belong_to_previous_year() {
        assert_eq!(season_for(2026, 1), "2025");
        assert_eq!(season_for(2026, 2), "2025");
        assert_eq!(season_for(2026, 3), "2026");
        assert_eq!(season_for(2025, 9), "2025");
    }
}
