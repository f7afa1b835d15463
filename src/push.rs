//! Outbound re-engagement notifications.
//!
//! The dispatcher ties the classifier and selector together for one
//! learner: classify, pick a template, optionally rewrite its copy, hand it
//! to the push gateway and record the impression.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{EngagementTier, NotificationTemplate};
use crate::engagement::{classify_engagement, NotificationSelector, Selection};
use crate::error::{DeliveryError, NotifyError};
use crate::store::ReviewStore;

/// Message handed to the push gateway
#[derive(Debug, Clone, PartialEq)]
pub struct PushMessage {
  pub learner: String,
  pub template_id: String,
  pub tier: EngagementTier,
  pub text: String,
}

#[async_trait]
pub trait PushDelivery: Send + Sync {
  async fn deliver(&self, message: &PushMessage) -> Result<(), DeliveryError>;
}

/// Gateway that only writes the message to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogPush;

#[async_trait]
impl PushDelivery for LogPush {
  async fn deliver(&self, message: &PushMessage) -> Result<(), DeliveryError> {
    tracing::info!(
      learner = %message.learner,
      template_id = %message.template_id,
      tier = message.tier.as_str(),
      "push: {}",
      message.text
    );
    Ok(())
  }
}

/// Optional rewriter for a template's text (personalization, localization)
#[async_trait]
pub trait CopyWriter: Send + Sync {
  async fn rewrite(&self, template: &NotificationTemplate, tier: EngagementTier) -> Result<String, DeliveryError>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum NotifyOutcome {
  Sent(PushMessage),
  /// Learner is already engaged
  Skipped(EngagementTier),
  /// Catalog has nothing for this tier
  NoCandidate(EngagementTier),
}

pub struct NotificationDispatcher {
  selector: NotificationSelector,
  push: Box<dyn PushDelivery>,
  copy: Option<Box<dyn CopyWriter>>,
}

impl NotificationDispatcher {
  pub fn new(selector: NotificationSelector, push: Box<dyn PushDelivery>) -> Self {
    Self {
      selector,
      push,
      copy: None,
    }
  }

  pub fn with_copy_writer(mut self, copy: Box<dyn CopyWriter>) -> Self {
    self.copy = Some(copy);
    self
  }

  pub fn selector(&self) -> &NotificationSelector {
    &self.selector
  }

  async fn message_text(&self, template: &NotificationTemplate, tier: EngagementTier) -> String {
    let Some(copy) = &self.copy else {
      return template.text.clone();
    };
    match copy.rewrite(template, tier).await {
      Ok(text) if !text.trim().is_empty() => text,
      Ok(_) => template.text.clone(),
      Err(e) => {
        tracing::warn!(template_id = %template.id, "copy rewrite failed, using template text: {}", e);
        template.text.clone()
      }
    }
  }

  /// Run one notification pass for `learner`, whose data lives in `store`
  pub async fn notify_learner(
    &self,
    learner: &str,
    store: &dyn ReviewStore,
    now: DateTime<Utc>,
  ) -> Result<NotifyOutcome, NotifyError> {
    let tier = classify_engagement(store, now.date_naive()).await?;
    if tier == EngagementTier::High {
      tracing::debug!(learner, "learner is highly engaged, not notifying");
      return Ok(NotifyOutcome::Skipped(tier));
    }

    let template = match self.selector.select(tier).await? {
      Selection::Candidate(template) => template,
      Selection::NoCandidate(tier) => {
        tracing::warn!(learner, tier = tier.as_str(), "catalog gap: nothing to send");
        return Ok(NotifyOutcome::NoCandidate(tier));
      }
    };

    let message = PushMessage {
      learner: learner.to_string(),
      template_id: template.id.clone(),
      tier,
      text: self.message_text(&template, tier).await,
    };
    self.push.deliver(&message).await?;
    self.selector.mark_sent(&template.id, tier, now).await?;

    tracing::info!(learner, template_id = %template.id, tier = tier.as_str(), "notification sent");
    Ok(NotifyOutcome::Sent(message))
  }
}
