//! Weekly hours for the dashboard chart. The numbers are synthetic
//! placeholders and are not derived from stored tasks.

use std::ops::RangeInclusive;

use axum::response::Json as ResponseJson;
use rand::Rng;
use serde::{Deserialize, Serialize};
use utils_core::response::ApiResponse;

pub const PROGRESS_WEEKS: u32 = 8;
const WEEKLY_HOURS: RangeInclusive<u32> = 30..=44;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyProgress {
    pub name: String,
    pub hours: u32,
}

pub fn placeholder_progress<R: Rng>(rng: &mut R, weeks: u32) -> Vec<WeeklyProgress> {
    (1..=weeks)
        .map(|week| WeeklyProgress {
            name: format!("Week {week}"),
            hours: rng.gen_range(WEEKLY_HOURS),
        })
        .collect()
}

pub async fn progress_chart() -> ResponseJson<ApiResponse<Vec<WeeklyProgress>>> {
    let progress = placeholder_progress(&mut rand::thread_rng(), PROGRESS_WEEKS);
    ResponseJson(ApiResponse::success(progress))
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn weeks_are_labelled_in_ascending_order_with_bounded_hours() {
        let mut rng = StdRng::seed_from_u64(7);
        let progress = placeholder_progress(&mut rng, PROGRESS_WEEKS);

        assert_eq!(progress.len(), 8);
        for (index, week) in progress.iter().enumerate() {
            assert_eq!(week.name, format!("Week {}", index + 1));
            assert!(WEEKLY_HOURS.contains(&week.hours), "{week:?}");
        }
    }

    #[test]
    fn same_seed_gives_same_chart() {
        let first = placeholder_progress(&mut StdRng::seed_from_u64(42), 4);
        let second = placeholder_progress(&mut StdRng::seed_from_u64(42), 4);
        assert_eq!(first, second);
    }
}
