//! Re-engagement message selection and feedback.

use std::cmp::Ordering;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::config::EngineConfig;
use crate::domain::{EngagementTier, NotificationTemplate, TemplatePatch};
use crate::error::StoreResult;
use crate::store::TemplateStore;

/// Outcome of a selection. `NoCandidate` is a catalog gap, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
  Candidate(NotificationTemplate),
  NoCandidate(EngagementTier),
}

impl Selection {
  pub fn template(&self) -> Option<&NotificationTemplate> {
    match self {
      Selection::Candidate(template) => Some(template),
      Selection::NoCandidate(_) => None,
    }
  }
}

/// `Greater` means `a` should be picked over `b`.
///
/// Higher rate wins; on a tie the template used longer ago (never used
/// counts as oldest) wins; ids settle the rest so the choice is stable.
fn preference(a: &NotificationTemplate, b: &NotificationTemplate, tier: EngagementTier) -> Ordering {
  a.rate_for(tier)
    .total_cmp(&b.rate_for(tier))
    .then_with(|| match (a.last_used_at, b.last_used_at) {
      (None, None) => Ordering::Equal,
      (None, Some(_)) => Ordering::Greater,
      (Some(_), None) => Ordering::Less,
      (Some(x), Some(y)) => y.cmp(&x),
    })
    .then_with(|| b.id.cmp(&a.id))
}

/// Best template for `tier` among `templates`
pub fn select_template(templates: &[NotificationTemplate], tier: EngagementTier) -> Option<&NotificationTemplate> {
  templates.iter().max_by(|a, b| preference(a, b, tier))
}

/// Picks messages from the shared catalog and records how they perform
#[derive(Clone)]
pub struct NotificationSelector {
  catalog: Arc<dyn TemplateStore>,
  click_rate_step: f64,
}

impl NotificationSelector {
  pub fn new(catalog: Arc<dyn TemplateStore>, config: &EngineConfig) -> Self {
    Self {
      catalog,
      click_rate_step: config.click_rate_step,
    }
  }

  /// Choose the template to send to a learner of `tier`. Does not mark it used.
  pub async fn select(&self, tier: EngagementTier) -> StoreResult<Selection> {
    let templates = self.catalog.fetch_templates(tier).await?;
    match select_template(&templates, tier) {
      Some(template) => Ok(Selection::Candidate(template.clone())),
      None => {
        tracing::warn!(tier = tier.as_str(), "no notification template for tier");
        Ok(Selection::NoCandidate(tier))
      }
    }
  }

  /// Record that `template_id` was sent to a learner of `tier`
  pub async fn mark_sent(
    &self,
    template_id: &str,
    tier: EngagementTier,
    at: DateTime<Utc>,
  ) -> StoreResult<NotificationTemplate> {
    self
      .catalog
      .update_template(template_id, TemplatePatch::MarkSent { at, tier })
      .await
  }

  /// Record a click on `template_id` by a learner of `tier`
  pub async fn record_click(&self, template_id: &str, tier: EngagementTier) -> StoreResult<NotificationTemplate> {
    let updated = self
      .catalog
      .update_template(
        template_id,
        TemplatePatch::RecordClick {
          tier,
          step: self.click_rate_step,
        },
      )
      .await?;
    tracing::debug!(
      template_id,
      tier = tier.as_str(),
      rate = updated.rate_for(tier),
      "recorded notification click"
    );
    Ok(updated)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::db::SqliteStore;
  use chrono::Duration;

  fn template(id: &str, rate: f64, last_used_at: Option<DateTime<Utc>>) -> NotificationTemplate {
    let mut template = NotificationTemplate::new(id, format!("message {id}"), EngagementTier::Low);
    template.click_through.insert(EngagementTier::Low, rate);
    template.last_used_at = last_used_at;
    template
  }

  fn selector_with(templates: &[NotificationTemplate]) -> (NotificationSelector, SqliteStore) {
    let store = SqliteStore::open_in_memory().unwrap();
    for t in templates {
      store.save_template(t).unwrap();
    }
    let selector = NotificationSelector::new(Arc::new(store.clone()), &EngineConfig::default());
    (selector, store)
  }

  #[test]
  fn test_highest_rate_wins() {
    let now = Utc::now();
    let templates = vec![
      template("a", 0.10, None),
      template("b", 0.40, Some(now)),
      template("c", 0.25, None),
    ];
    assert_eq!(select_template(&templates, EngagementTier::Low).unwrap().id, "b");
  }

  #[test]
  fn test_tie_prefers_older_last_used() {
    let now = Utc::now();
    let templates = vec![
      template("recent", 0.3, Some(now)),
      template("older", 0.3, Some(now - Duration::days(2))),
    ];
    assert_eq!(select_template(&templates, EngagementTier::Low).unwrap().id, "older");
  }

  #[test]
  fn test_tie_prefers_never_used() {
    let now = Utc::now();
    let templates = vec![
      template("used", 0.3, Some(now - Duration::days(30))),
      template("fresh", 0.3, None),
    ];
    assert_eq!(select_template(&templates, EngagementTier::Low).unwrap().id, "fresh");
  }

  #[test]
  fn test_full_tie_is_stable_regardless_of_order() {
    let forward = vec![template("x", 0.0, None), template("y", 0.0, None)];
    let backward: Vec<_> = forward.iter().rev().cloned().collect();

    let a = select_template(&forward, EngagementTier::Low).unwrap().id.clone();
    let b = select_template(&backward, EngagementTier::Low).unwrap().id.clone();
    assert_eq!(a, b);
    assert_eq!(a, "x");
  }

  #[test]
  fn test_rate_is_read_for_requested_tier() {
    let mut a = template("a", 0.9, None);
    a.click_through.insert(EngagementTier::Medium, 0.1);
    let mut b = template("b", 0.1, None);
    b.click_through.insert(EngagementTier::Medium, 0.5);

    let templates = vec![a, b];
    assert_eq!(select_template(&templates, EngagementTier::Low).unwrap().id, "a");
    assert_eq!(select_template(&templates, EngagementTier::Medium).unwrap().id, "b");
  }

  #[tokio::test]
  async fn test_select_is_deterministic() {
    let (selector, _) = selector_with(&[template("a", 0.2, None), template("b", 0.2, None), template("c", 0.1, None)]);

    let first = selector.select(EngagementTier::Low).await.unwrap();
    let second = selector.select(EngagementTier::Low).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first.template().unwrap().id, "a");
  }

  #[tokio::test]
  async fn test_no_candidate_for_empty_tier() {
    let (selector, _) = selector_with(&[template("a", 0.2, None)]);
    let selection = selector.select(EngagementTier::High).await.unwrap();
    assert_eq!(selection, Selection::NoCandidate(EngagementTier::High));
    assert!(selection.template().is_none());
  }

  #[tokio::test]
  async fn test_mark_sent_rotates_tied_templates() {
    let (selector, _) = selector_with(&[template("a", 0.2, None), template("b", 0.2, None)]);
    let now = Utc::now();

    let first = selector.select(EngagementTier::Low).await.unwrap();
    let first_id = first.template().unwrap().id.clone();
    let marked = selector.mark_sent(&first_id, EngagementTier::Low, now).await.unwrap();
    assert_eq!(marked.last_used_at, Some(now));
    assert_eq!(marked.impressions.get(&EngagementTier::Low), Some(&1));

    let second = selector.select(EngagementTier::Low).await.unwrap();
    assert_ne!(second.template().unwrap().id, first_id);
  }

  #[tokio::test]
  async fn test_record_click_raises_rate_and_wins_next_selection() {
    let (selector, store) = selector_with(&[template("a", 0.0, None), template("b", 0.0, None)]);

    let updated = selector.record_click("b", EngagementTier::Low).await.unwrap();
    assert!((updated.rate_for(EngagementTier::Low) - 0.05).abs() < 1e-12);

    let stored = store.fetch_templates(EngagementTier::Low).await.unwrap();
    let b = stored.iter().find(|t| t.id == "b").unwrap();
    assert_eq!(b.clicks.get(&EngagementTier::Low), Some(&1));

    let selection = selector.select(EngagementTier::Low).await.unwrap();
    assert_eq!(selection.template().unwrap().id, "b");
  }

  #[tokio::test]
  async fn test_click_on_missing_template_errors() {
    let (selector, _) = selector_with(&[]);
    assert!(selector.record_click("ghost", EngagementTier::Low).await.is_err());
  }
}
