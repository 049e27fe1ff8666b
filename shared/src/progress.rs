//! Derived health and progress values.
//!
//! Everything here is a pure function of fetched records. The view layer
//! recomputes these on every render; nothing in this module is stored in the
//! model.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::WeightEntry;
use crate::{BASE_LEVEL_XP, LEVEL_XP_GROWTH};

/// XP needed to clear `level`: `floor(100 * 1.2^(level-1))`.
///
/// Level 0 is treated as level 1 so callers holding a fresh, zeroed profile
/// still get a sensible target.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn xp_required(level: u32) -> u64 {
    let exponent = i32::try_from(level.max(1) - 1).unwrap_or(i32::MAX);
    let required = (BASE_LEVEL_XP * LEVEL_XP_GROWTH.powi(exponent)).floor();
    if required.is_finite() && required < u64::MAX as f64 {
        required as u64
    } else {
        u64::MAX
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelProgress {
    pub level: u32,
    pub xp: u64,
    pub levels_gained: u32,
}

/// Applies an XP gain and rolls over as many levels as it pays for.
///
/// Postcondition: `result.xp < xp_required(result.level)`.
#[must_use]
pub fn level_up(level: u32, xp: u64, delta: u64) -> LevelProgress {
    let start = level.max(1);
    let mut level = start;
    let mut xp = xp.saturating_add(delta);

    loop {
        let required = xp_required(level);
        if xp < required || level == u32::MAX {
            break;
        }
        xp -= required;
        level += 1;
    }

    LevelProgress {
        level,
        xp,
        levels_gained: level - start,
    }
}

/// `clamp(0, 100, current / target * 100)`; a zero or negative target, or any
/// non-finite input, yields 0 rather than NaN.
#[must_use]
pub fn progress_percent(current: f64, target: f64) -> f64 {
    if !current.is_finite() || !target.is_finite() || target <= 0.0 {
        return 0.0;
    }
    (current / target * 100.0).clamp(0.0, 100.0)
}

#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn xp_progress_percent(xp: u64, level: u32) -> f64 {
    progress_percent(xp as f64, xp_required(level) as f64)
}

#[must_use]
pub fn xp_to_next_level(xp: u64, level: u32) -> u64 {
    xp_required(level).saturating_sub(xp)
}

/// Body-mass index rounded to one decimal, or `None` when either input is
/// missing or not a positive number.
#[must_use]
pub fn bmi(height_cm: Option<f64>, weight_kg: Option<f64>) -> Option<f64> {
    let height_m = height_cm.filter(|h| h.is_finite() && *h > 0.0)? / 100.0;
    let weight = weight_kg.filter(|w| w.is_finite() && *w > 0.0)?;
    let value = weight / (height_m * height_m);
    Some((value * 10.0).round() / 10.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BmiCategory {
    Underweight,
    Normal,
    Overweight,
    Obese,
}

impl BmiCategory {
    #[must_use]
    pub fn from_bmi(bmi: f64) -> Self {
        if bmi < 18.5 {
            Self::Underweight
        } else if bmi < 25.0 {
            Self::Normal
        } else if bmi < 30.0 {
            Self::Overweight
        } else {
            Self::Obese
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Underweight => "Underweight",
            Self::Normal => "Normal",
            Self::Overweight => "Overweight",
            Self::Obese => "Obese",
        }
    }
}

#[must_use]
pub fn format_bmi(value: Option<f64>) -> String {
    value.map_or_else(|| "N/A".to_string(), |v| format!("{v:.1}"))
}

/// Whole days from `today` until `end`, never negative.
#[must_use]
pub fn days_remaining(end: NaiveDate, today: NaiveDate) -> i64 {
    (end - today).num_days().max(0)
}

/// How far through a billing period `today` is, as a percentage.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn period_elapsed_percent(start: NaiveDate, end: NaiveDate, today: NaiveDate) -> f64 {
    let total = (end - start).num_days();
    let elapsed = (today - start).num_days();
    progress_percent(elapsed as f64, total as f64)
}

#[must_use]
pub fn streak_message(days: u32) -> String {
    match days {
        0 => "Check in today to start a streak".to_string(),
        1 => "1 day streak. Come back tomorrow!".to_string(),
        2..=6 => format!("{days} day streak. Keep it going!"),
        7..=29 => format!("{days} day streak. You're on fire!"),
        _ => format!("{days} day streak. Unstoppable!"),
    }
}

/// The streak after checking in on `today`, given the previous check-in.
#[must_use]
pub fn next_streak(current: u32, last_check_in: Option<NaiveDate>, today: NaiveDate) -> u32 {
    match last_check_in {
        Some(last) if last == today => current.max(1),
        Some(last) if today.pred_opt() == Some(last) => current.saturating_add(1),
        _ => 1,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightTrend<'a> {
    pub latest: Option<&'a WeightEntry>,
    pub previous: Option<&'a WeightEntry>,
}

impl WeightTrend<'_> {
    #[must_use]
    pub fn change_kg(&self) -> Option<f64> {
        let latest = self.latest?;
        let previous = self.previous?;
        Some(((latest.weight_kg - previous.weight_kg) * 10.0).round() / 10.0)
    }
}

/// Latest and previous weight entries by `recorded_at`, regardless of the
/// order the service returned them in.
#[must_use]
pub fn weight_trend(entries: &[WeightEntry]) -> WeightTrend<'_> {
    let mut sorted: Vec<&WeightEntry> = entries.iter().collect();
    sorted.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
    WeightTrend {
        latest: sorted.first().copied(),
        previous: sorted.get(1).copied(),
    }
}
