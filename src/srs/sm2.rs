use chrono::{DateTime, Duration, Utc};

use crate::config::{GRADUATION_INTERVAL_DAYS, MAX_INTERVAL_DAYS, MIN_EASE_FACTOR, PASSING_QUALITY};
use crate::domain::{ReviewItem, ReviewQuality};
use crate::error::ScheduleError;

pub struct Sm2Result {
  pub ease_factor: f64,
  pub interval_days: i64,
}

/// Core SM-2 arithmetic.
///
/// `times_reviewed` is the lifetime review count *before* this review; it is
/// never reset by failures, unlike classic SM-2 repetitions.
pub fn calculate_sm2(
  quality: ReviewQuality,
  current_ease_factor: f64,
  current_interval: i64,
  times_reviewed: i64,
) -> Sm2Result {
  let q = quality.value() as f64;

  // EF' = EF + (0.1 - (5 - q) * (0.08 + (5 - q) * 0.02))
  let ease_delta = 0.1 - (5.0 - q) * (0.08 + (5.0 - q) * 0.02);
  let new_ease_factor = (current_ease_factor + ease_delta).max(MIN_EASE_FACTOR);

  let new_interval = if quality.value() <= PASSING_QUALITY {
    // Failure, or a recall hard enough that spacing restarts
    1
  } else {
    match times_reviewed {
      0 => 1,
      1 => GRADUATION_INTERVAL_DAYS,
      _ => ((current_interval as f64) * new_ease_factor).round() as i64,
    }
  };

  Sm2Result {
    ease_factor: new_ease_factor,
    interval_days: new_interval.clamp(1, MAX_INTERVAL_DAYS),
  }
}

/// Apply one graded recall to an item, returning its new state.
///
/// Pure: the input is untouched and nothing is read or written elsewhere.
/// Qualities outside 0..=5 are rejected before any computation.
pub fn review_item(item: &ReviewItem, quality: u8, now: DateTime<Utc>) -> Result<ReviewItem, ScheduleError> {
  let quality = ReviewQuality::from_u8(quality)?;
  let result = calculate_sm2(quality, item.ease_factor, item.interval_days, item.times_reviewed);

  let mut next = item.clone();
  next.ease_factor = result.ease_factor;
  next.interval_days = result.interval_days;
  next.next_due_at = now
    .checked_add_signed(Duration::days(result.interval_days))
    .unwrap_or(DateTime::<Utc>::MAX_UTC);
  next.last_reviewed_at = Some(now);
  next.times_reviewed += 1;
  if quality.is_correct() {
    next.times_correct += 1;
  } else {
    next.times_incorrect += 1;
  }
  next.dirty = true;

  Ok(next)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn item_with(ease_factor: f64, interval_days: i64, times_reviewed: i64) -> ReviewItem {
    let mut item = ReviewItem::new("w-1", "물", "water", Utc::now());
    item.ease_factor = ease_factor;
    item.interval_days = interval_days;
    item.times_reviewed = times_reviewed;
    item.times_correct = times_reviewed / 2;
    item.times_incorrect = times_reviewed - times_reviewed / 2;
    item
  }

  /// A spread of plausible scheduling states
  fn sample_states() -> Vec<ReviewItem> {
    let mut states = Vec::new();
    for &ef in &[1.3, 1.7, 2.1, 2.5, 2.9, 3.4] {
      for &interval in &[1, 2, 6, 15, 40, 180] {
        for &reviewed in &[0, 1, 2, 3, 10, 57] {
          states.push(item_with(ef, interval, reviewed));
        }
      }
    }
    states
  }

  #[test]
  fn test_invalid_quality_rejected_without_mutation() {
    let item = item_with(2.5, 6, 2);
    let before = item.clone();

    for q in [6u8, 7, 42, 255] {
      assert_eq!(review_item(&item, q, Utc::now()), Err(ScheduleError::InvalidQuality(q)));
    }
    assert_eq!(item, before);
  }

  #[test]
  fn test_failures_reset_interval_and_count_incorrect() {
    let now = Utc::now();
    for state in sample_states() {
      for q in 0..=2u8 {
        let next = review_item(&state, q, now).unwrap();
        assert_eq!(next.interval_days, 1);
        assert_eq!(next.times_incorrect, state.times_incorrect + 1);
        assert_eq!(next.times_correct, state.times_correct);
      }
    }
  }

  #[test]
  fn test_hard_recall_resets_interval_but_counts_correct() {
    let now = Utc::now();
    for state in sample_states() {
      let next = review_item(&state, 3, now).unwrap();
      assert_eq!(next.interval_days, 1);
      assert_eq!(next.times_correct, state.times_correct + 1);
      assert_eq!(next.times_incorrect, state.times_incorrect);
    }
  }

  #[test]
  fn test_first_review_good_is_one_day() {
    let now = Utc::now();
    for state in sample_states().into_iter().filter(|s| s.times_reviewed == 0) {
      for q in 4..=5u8 {
        assert_eq!(review_item(&state, q, now).unwrap().interval_days, 1);
      }
    }
  }

  #[test]
  fn test_second_review_good_graduates_to_six_days() {
    let now = Utc::now();
    for state in sample_states().into_iter().filter(|s| s.times_reviewed == 1) {
      for q in 4..=5u8 {
        assert_eq!(review_item(&state, q, now).unwrap().interval_days, 6);
      }
    }
  }

  #[test]
  fn test_later_reviews_scale_by_new_ease() {
    let now = Utc::now();
    for state in sample_states().into_iter().filter(|s| s.times_reviewed >= 2) {
      for q in 4..=5u8 {
        let next = review_item(&state, q, now).unwrap();
        let expected = ((state.interval_days as f64 * next.ease_factor).round() as i64).max(1);
        assert_eq!(next.interval_days, expected);
      }
    }
  }

  #[test]
  fn test_result_invariants_hold_for_all_inputs() {
    let now = Utc::now();
    for state in sample_states() {
      for q in 0..=5u8 {
        let next = review_item(&state, q, now).unwrap();
        assert!(next.ease_factor >= MIN_EASE_FACTOR);
        assert!(next.interval_days >= 1);
        assert_eq!(next.times_reviewed, state.times_reviewed + 1);
        assert_eq!(next.times_reviewed, next.times_correct + next.times_incorrect);
        assert_eq!(next.last_reviewed_at, Some(now));
        assert_eq!(next.next_due_at, now + Duration::days(next.interval_days));
        assert!(next.dirty);
      }
    }
  }

  #[test]
  fn test_ease_factor_floor() {
    let now = Utc::now();
    let mut item = item_with(2.5, 10, 5);

    for _ in 0..50 {
      item = review_item(&item, 0, now).unwrap();
      assert!(item.ease_factor >= MIN_EASE_FACTOR);
    }

    assert!((item.ease_factor - MIN_EASE_FACTOR).abs() < 1e-9);
  }

  #[test]
  fn test_ease_delta_is_monotonic_in_quality() {
    let mut previous = f64::NEG_INFINITY;
    for q in 0..=5u8 {
      let quality = ReviewQuality::from_u8(q).unwrap();
      let result = calculate_sm2(quality, 2.5, 6, 2);
      assert!(result.ease_factor >= previous);
      previous = result.ease_factor;
    }
  }

  #[test]
  fn test_third_review_good() {
    let now = Utc::now();
    let item = item_with(2.5, 6, 2);
    let next = review_item(&item, 4, now).unwrap();

    // q=4 leaves the ease unchanged, so 6 * 2.5 = 15
    assert!((next.ease_factor - 2.5).abs() < 1e-9);
    assert_eq!(next.interval_days, 15);
    assert_eq!(next.next_due_at, now + Duration::days(15));
  }

  #[test]
  fn test_brand_new_item_perfect_recall() {
    let now = Utc::now();
    let item = ReviewItem::new("w-2", "불", "fire", now);
    let next = review_item(&item, 5, now).unwrap();

    assert_eq!(next.interval_days, 1);
    assert_eq!(next.times_reviewed, 1);
    assert_eq!(next.times_correct, 1);
    assert!(next.ease_factor > 2.5);
    assert!((next.ease_factor - 2.6).abs() < 1e-9);
  }

  #[test]
  fn test_input_item_not_mutated() {
    let item = item_with(2.5, 6, 2);
    let before = item.clone();
    let _ = review_item(&item, 5, Utc::now()).unwrap();
    assert_eq!(item, before);
  }

  #[test]
  fn test_interval_grows_exponentially() {
    let now = Utc::now();
    let mut item = ReviewItem::new("w-3", "눈", "eye / snow", now);

    for i in 0..5 {
      item = review_item(&item, 4, now).unwrap();
      match i {
        0 => assert_eq!(item.interval_days, 1),
        1 => assert_eq!(item.interval_days, 6),
        _ => assert!(item.interval_days > 6),
      }
    }

    assert!(item.interval_days > 30);
  }

  #[test]
  fn test_long_run_of_perfect_recalls_is_capped() {
    let now = Utc::now();
    let mut item = ReviewItem::new("w-5", "별", "star", now);

    for _ in 0..50 {
      item = review_item(&item, 5, now).unwrap();
      assert!(item.interval_days <= MAX_INTERVAL_DAYS);
      assert!(item.next_due_at > now);
    }

    assert_eq!(item.interval_days, MAX_INTERVAL_DAYS);
    assert_eq!(item.times_reviewed, 50);
  }

  #[test]
  fn test_oversized_stored_interval_does_not_overflow() {
    let now = Utc::now();
    let item = item_with(2.5, 100_000_000, 20);

    let next = review_item(&item, 5, now).unwrap();
    assert_eq!(next.interval_days, MAX_INTERVAL_DAYS);
    assert_eq!(next.next_due_at, now + Duration::days(MAX_INTERVAL_DAYS));
  }

  #[test]
  fn test_failure_after_growth_keeps_review_count() {
    let now = Utc::now();
    let mut item = ReviewItem::new("w-4", "밥", "rice", now);
    item = review_item(&item, 4, now).unwrap();
    item = review_item(&item, 4, now).unwrap();
    item = review_item(&item, 1, now).unwrap();
    assert_eq!(item.interval_days, 1);

    // Review count is lifetime, so the next good recall scales from 1 day
    item = review_item(&item, 4, now).unwrap();
    assert_eq!(item.times_reviewed, 4);
    assert_eq!(item.interval_days, ((1.0 * item.ease_factor).round() as i64).max(1));
  }
}
