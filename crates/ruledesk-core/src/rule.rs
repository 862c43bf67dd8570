//! Engagement rules and their SCD Type 2 version chain.
//!
//! A rule is identified by its `event_name`. Every edit appends a new version
//! record and closes the previous one; nothing but the latest record's
//! activity is ever changed in place.

use std::str::FromStr as _;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  flag::FlagInput,
  status::{Activity, Standing},
};

// ─── Billing ─────────────────────────────────────────────────────────────────

/// How engagements matched by a rule are billed.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::AsRefStr,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum BillingType {
  Cpx,
  Cpe,
  Cpvs,
}

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// The business fields of a version. An update replaces all of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleFields {
  pub billing_type:  BillingType,
  pub tactic_field:  Option<String>,
  pub is_engagement: bool,
  pub is_exposure:   bool,
}

/// A validated create/update request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRule {
  pub event_name: String,
  pub fields:     RuleFields,
}

/// Unvalidated create/update input as it arrives over the wire.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleDraft {
  pub event_name:    Option<String>,
  pub billing_type:  Option<String>,
  pub tactic_field:  Option<String>,
  pub is_engagement: Option<FlagInput>,
  pub is_exposure:   Option<FlagInput>,
}

impl RuleDraft {
  pub fn validate(self) -> Result<NewRule> {
    let (Some(event_name), Some(billing_type), Some(is_engagement), Some(is_exposure)) = (
      self.event_name.filter(|s| !s.is_empty()),
      self.billing_type.filter(|s| !s.is_empty()),
      self.is_engagement,
      self.is_exposure,
    ) else {
      return Err(Error::Validation("Missing required fields".into()));
    };

    let billing_type = BillingType::from_str(&billing_type).map_err(|_| {
      Error::Validation("Invalid billingType. Must be CPX, CPE, or CPVS".into())
    })?;

    let (Some(is_engagement), Some(is_exposure)) =
      (is_engagement.to_bool(), is_exposure.to_bool())
    else {
      return Err(Error::Validation(
        "isEngagement and isExposure must be 0 or 1".into(),
      ));
    };

    Ok(NewRule {
      event_name,
      fields: RuleFields {
        billing_type,
        tactic_field: self.tactic_field.filter(|s| !s.is_empty()),
        is_engagement,
        is_exposure,
      },
    })
  }
}

/// Reject an empty rule name.
pub fn require_event_name(event_name: &str) -> Result<&str> {
  if event_name.is_empty() {
    return Err(Error::Validation("eventName is required".into()));
  }
  Ok(event_name)
}

// ─── Version record ──────────────────────────────────────────────────────────

/// One immutable version of a named rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementRule {
  pub id:            Uuid,
  pub event_name:    String,
  pub billing_type:  BillingType,
  pub tactic_field:  Option<String>,
  #[serde(with = "crate::flag")]
  pub is_engagement: bool,
  #[serde(with = "crate::flag")]
  pub is_exposure:   bool,
  #[serde(flatten)]
  pub activity:      Activity,
  #[serde(flatten)]
  pub standing:      Standing,
  /// 1-based, gapless within a chain.
  pub version:       u32,
  pub valid_from:    DateTime<Utc>,
  pub created_at:    DateTime<Utc>,
  pub updated_at:    DateTime<Utc>,
  /// Email of the user who wrote this version.
  pub modified_by:   String,
}

impl EngagementRule {
  /// The first record of a new chain: active and latest.
  pub fn first_version(rule: NewRule, actor: &str, now: DateTime<Utc>) -> Self {
    Self {
      id:            Uuid::new_v4(),
      event_name:    rule.event_name,
      billing_type:  rule.fields.billing_type,
      tactic_field:  rule.fields.tactic_field,
      is_engagement: rule.fields.is_engagement,
      is_exposure:   rule.fields.is_exposure,
      activity:      Activity::Active,
      standing:      Standing::Latest,
      version:       1,
      valid_from:    now,
      created_at:    now,
      updated_at:    now,
      modified_by:   actor.to_owned(),
    }
  }

  pub fn is_latest(&self) -> bool { self.standing.is_latest() }

  pub fn is_active(&self) -> bool { self.activity.is_active() }

  fn ensure_latest(&self) -> Result<()> {
    if self.is_latest() {
      Ok(())
    } else {
      Err(Error::HistoricalRecord {
        event_name: self.event_name.clone(),
        version:    self.version,
      })
    }
  }

  /// Effective time for a transition of this record; never before it became
  /// valid, even if the clock stepped back.
  fn effective(&self, now: DateTime<Utc>) -> DateTime<Utc> { now.max(self.valid_from) }

  /// The next version of this chain with `fields` replacing the business
  /// fields. Activity is carried forward untouched.
  pub fn successor(
    &self,
    fields: RuleFields,
    actor: &str,
    now: DateTime<Utc>,
  ) -> Result<Self> {
    self.ensure_latest()?;
    let now = self.effective(now);
    Ok(Self {
      id:            Uuid::new_v4(),
      event_name:    self.event_name.clone(),
      billing_type:  fields.billing_type,
      tactic_field:  fields.tactic_field,
      is_engagement: fields.is_engagement,
      is_exposure:   fields.is_exposure,
      activity:      self.activity.clone(),
      standing:      Standing::Latest,
      version:       self.version + 1,
      valid_from:    now,
      created_at:    now,
      updated_at:    now,
      modified_by:   actor.to_owned(),
    })
  }

  /// Mark this record as superseded at `now`, or at `valid_from` if `now` is
  /// earlier.
  pub fn close(&mut self, now: DateTime<Utc>) -> Result<()> {
    self.ensure_latest()?;
    let now = self.effective(now);
    self.standing = Standing::Historical { valid_to: now };
    self.updated_at = now;
    Ok(())
  }

  /// Switch the rule on or off without creating a new version.
  ///
  /// Deactivating an already inactive rule refreshes who and when.
  pub fn set_active(
    &mut self,
    active: bool,
    actor: &str,
    now: DateTime<Utc>,
  ) -> Result<()> {
    self.ensure_latest()?;
    self.activity = if active {
      Activity::Active
    } else {
      Activity::Inactive { at: now, by: actor.to_owned() }
    };
    self.updated_at = now;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use chrono::Duration;

  use super::*;

  fn draft() -> RuleDraft {
    RuleDraft {
      event_name:    Some("e1".into()),
      billing_type:  Some("CPX".into()),
      tactic_field:  None,
      is_engagement: Some(FlagInput::Int(1)),
      is_exposure:   Some(FlagInput::Int(0)),
    }
  }

  fn validation_message(draft: RuleDraft) -> String {
    match draft.validate() {
      Err(Error::Validation(m)) => m,
      other => panic!("expected validation error, got {other:?}"),
    }
  }

  #[test]
  fn valid_draft() {
    let rule = draft().validate().unwrap();
    assert_eq!(rule.event_name, "e1");
    assert_eq!(rule.fields.billing_type, BillingType::Cpx);
    assert!(rule.fields.is_engagement);
    assert!(!rule.fields.is_exposure);
  }

  #[test]
  fn missing_and_empty_fields_are_rejected() {
    let mut d = draft();
    d.event_name = None;
    assert_eq!(validation_message(d), "Missing required fields");

    let mut d = draft();
    d.event_name = Some(String::new());
    assert_eq!(validation_message(d), "Missing required fields");

    let mut d = draft();
    d.is_exposure = None;
    assert_eq!(validation_message(d), "Missing required fields");
  }

  #[test]
  fn billing_type_must_be_known() {
    let mut d = draft();
    d.billing_type = Some("CPM".into());
    assert!(validation_message(d).starts_with("Invalid billingType"));

    let mut d = draft();
    d.billing_type = Some("CPVS".into());
    assert_eq!(d.validate().unwrap().fields.billing_type, BillingType::Cpvs);
  }

  #[test]
  fn flags_must_be_zero_or_one() {
    let mut d = draft();
    d.is_engagement = Some(FlagInput::Int(2));
    assert_eq!(
      validation_message(d),
      "isEngagement and isExposure must be 0 or 1"
    );
  }

  #[test]
  fn boolean_flags_get_the_flag_message() {
    let d: RuleDraft = serde_json::from_str(
      r#"{"eventName":"e1","billingType":"CPE","isEngagement":true,"isExposure":0}"#,
    )
    .unwrap();
    assert_eq!(
      validation_message(d),
      "isEngagement and isExposure must be 0 or 1"
    );
  }

  #[test]
  fn empty_tactic_field_becomes_none() {
    let mut d = draft();
    d.tactic_field = Some(String::new());
    assert_eq!(d.validate().unwrap().fields.tactic_field, None);
  }

  #[test]
  fn successor_carries_activity_and_bumps_version() {
    let t0 = Utc::now();
    let t1 = t0 + Duration::seconds(5);
    let mut v1 = EngagementRule::first_version(draft().validate().unwrap(), "a@x.io", t0);
    v1.set_active(false, "b@x.io", t0).unwrap();

    let fields = RuleFields {
      billing_type:  BillingType::Cpe,
      tactic_field:  Some("video".into()),
      is_engagement: false,
      is_exposure:   true,
    };
    let v2 = v1.successor(fields, "c@x.io", t1).unwrap();
    v1.close(t1).unwrap();

    assert_eq!(v2.version, 2);
    assert!(v2.is_latest());
    assert_eq!(v2.activity, Activity::Inactive { at: t0, by: "b@x.io".into() });
    assert_eq!(v2.billing_type, BillingType::Cpe);
    assert_eq!(v2.modified_by, "c@x.io");
    assert_eq!(v1.standing, Standing::Historical { valid_to: t1 });
  }

  #[test]
  fn transitions_never_end_before_valid_from() {
    let t1 = Utc::now();
    let earlier = t1 - Duration::milliseconds(3);
    let mut v1 = EngagementRule::first_version(draft().validate().unwrap(), "a@x.io", t1);

    let v2 = v1.successor(draft().validate().unwrap().fields, "a@x.io", earlier).unwrap();
    v1.close(earlier).unwrap();

    assert_eq!(v2.valid_from, t1);
    assert_eq!(v1.standing.valid_to(), Some(t1));
  }

  #[test]
  fn historical_records_are_frozen() {
    let now = Utc::now();
    let mut v1 = EngagementRule::first_version(draft().validate().unwrap(), "a@x.io", now);
    v1.close(now).unwrap();

    assert!(matches!(
      v1.set_active(false, "a@x.io", now),
      Err(Error::HistoricalRecord { version: 1, .. })
    ));
    assert!(v1.close(now).is_err());
    let fields = draft().validate().unwrap().fields;
    assert!(v1.successor(fields, "a@x.io", now).is_err());
  }

  #[test]
  fn reactivation_clears_inactivation() {
    let now = Utc::now();
    let mut v1 = EngagementRule::first_version(draft().validate().unwrap(), "a@x.io", now);
    v1.set_active(false, "a@x.io", now).unwrap();
    assert_eq!(v1.activity.inactivated_by(), Some("a@x.io"));
    v1.set_active(true, "a@x.io", now).unwrap();
    assert_eq!(v1.activity, Activity::Active);
  }

  #[test]
  fn json_uses_flat_integer_columns() {
    let now = Utc::now();
    let v1 = EngagementRule::first_version(draft().validate().unwrap(), "a@x.io", now);
    let json = serde_json::to_value(&v1).unwrap();

    assert_eq!(json["eventName"], "e1");
    assert_eq!(json["billingType"], "CPX");
    assert_eq!(json["isEngagement"], 1);
    assert_eq!(json["isExposure"], 0);
    assert_eq!(json["isActive"], 1);
    assert_eq!(json["isLatest"], 1);
    assert_eq!(json["version"], 1);
    assert!(json["validTo"].is_null());
    assert!(json["inactivatedAt"].is_null());

    let back: EngagementRule = serde_json::from_value(json).unwrap();
    assert_eq!(back, v1);
  }
}
