//! Per-resource configuration of the generic store.

use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Debug;

use crate::api::api_types::{ApiHalaka, ApiInvitation, ApiStudent, ApiTeacher};
use crate::api::types::{
  Halaka, HalakaStatus, Invitation, InvitationStatus, StudentProfile, TeacherProfile,
};

/// An entity kind served by a REST collection.
///
/// `normalize` must be pure: the same raw payload always produces the same
/// view model, with defaults filled in for anything the backend left out.
pub trait Resource: Clone + Debug + Send + Sync + Serialize + 'static {
  /// Raw backend shape
  type Raw: DeserializeOwned;
  /// Summary returned by `get_stats`
  type Stats: Debug + Clone + PartialEq + Serialize;

  /// Name used in logs
  const NAME: &'static str;
  /// Collection path, also the cache invalidation prefix
  const PATH: &'static str;
  /// Keys under which a list may be nested inside `data`
  const LIST_KEYS: &'static [&'static str];

  fn normalize(raw: Self::Raw) -> Self;

  fn id(&self) -> &str;

  /// Local filtering for `get_filtered_list`. Unknown keys match everything,
  /// since they are applied server-side.
  fn matches_filter(&self, key: &str, value: &str) -> bool {
    let _ = (key, value);
    true
  }

  fn stats(items: &[Self]) -> Self::Stats;

  fn item_path(id: &str) -> String {
    format!("{}/{}", Self::PATH, id)
  }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
  haystack.to_lowercase().contains(&needle.trim().to_lowercase())
}

/// Backend counts are untrusted; totals stop at `u32::MAX`.
fn saturating_sum(values: impl Iterator<Item = u32>) -> u32 {
  values.fold(0, u32::saturating_add)
}

fn parse_flag(value: &str) -> Option<bool> {
  match value.trim() {
    "true" | "1" | "yes" => Some(true),
    "false" | "0" | "no" => Some(false),
    _ => None,
  }
}

// ============================================================================
// Halakat
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HalakaStats {
  pub total: usize,
  pub active: usize,
  pub upcoming: usize,
  pub completed: usize,
  pub enrolled_students: u32,
  pub open_seats: u32,
}

impl Resource for Halaka {
  type Raw = ApiHalaka;
  type Stats = HalakaStats;

  const NAME: &'static str = "halaka";
  const PATH: &'static str = "/halakat";
  const LIST_KEYS: &'static [&'static str] = &["halakat", "episodes"];

  fn normalize(raw: ApiHalaka) -> Self {
    raw.into()
  }

  fn id(&self) -> &str {
    &self.id
  }

  fn matches_filter(&self, key: &str, value: &str) -> bool {
    match key {
      "status" => self.status.as_str().eq_ignore_ascii_case(value.trim()),
      "search" => {
        contains_ci(&self.title, value)
          || contains_ci(&self.description, value)
          || contains_ci(&self.teacher_name, value)
      }
      "type" | "halaka_type" => self.halaka_type.eq_ignore_ascii_case(value.trim()),
      "teacher" | "teacher_id" => self.teacher_id.as_deref() == Some(value.trim()),
      "available" => parse_flag(value).map_or(true, |want| want != self.is_full()),
      _ => true,
    }
  }

  fn stats(items: &[Self]) -> HalakaStats {
    let count = |status: HalakaStatus| items.iter().filter(|h| h.status == status).count();
    HalakaStats {
      total: items.len(),
      active: count(HalakaStatus::Active),
      upcoming: count(HalakaStatus::Upcoming),
      completed: count(HalakaStatus::Completed),
      enrolled_students: saturating_sum(items.iter().map(|h| h.current_students)),
      open_seats: saturating_sum(
        items
          .iter()
          .filter(|h| matches!(h.status, HalakaStatus::Active | HalakaStatus::Upcoming))
          .map(Halaka::available_seats),
      ),
    }
  }
}

// ============================================================================
// Teachers
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TeacherStats {
  pub total: usize,
  pub verified: usize,
  /// Mean rating over rated teachers, 0 when none are rated
  pub average_rating: f64,
}

impl Resource for TeacherProfile {
  type Raw = ApiTeacher;
  type Stats = TeacherStats;

  const NAME: &'static str = "teacher";
  const PATH: &'static str = "/teachers";
  const LIST_KEYS: &'static [&'static str] = &["teachers"];

  fn normalize(raw: ApiTeacher) -> Self {
    raw.into()
  }

  fn id(&self) -> &str {
    &self.id
  }

  fn matches_filter(&self, key: &str, value: &str) -> bool {
    match key {
      "search" => contains_ci(&self.name, value) || contains_ci(&self.specialization, value),
      "specialization" => contains_ci(&self.specialization, value),
      "verified" => parse_flag(value).map_or(true, |want| want == self.verified),
      "min_rating" | "minRating" => value
        .trim()
        .parse::<f64>()
        .map_or(true, |min| self.rating >= min),
      "language" => self.languages.iter().any(|l| l.eq_ignore_ascii_case(value.trim())),
      _ => true,
    }
  }

  fn stats(items: &[Self]) -> TeacherStats {
    let rated: Vec<f64> = items
      .iter()
      .filter(|t| t.reviews_count > 0 || t.rating > 0.0)
      .map(|t| t.rating)
      .collect();
    let average_rating = if rated.is_empty() {
      0.0
    } else {
      rated.iter().sum::<f64>() / rated.len() as f64
    };
    TeacherStats {
      total: items.len(),
      verified: items.iter().filter(|t| t.verified).count(),
      average_rating,
    }
  }
}

// ============================================================================
// Students
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StudentStats {
  pub total: usize,
  /// Students enrolled in at least one halaka
  pub enrolled: usize,
  pub average_progress: u8,
}

impl Resource for StudentProfile {
  type Raw = ApiStudent;
  type Stats = StudentStats;

  const NAME: &'static str = "student";
  const PATH: &'static str = "/students";
  const LIST_KEYS: &'static [&'static str] = &["students"];

  fn normalize(raw: ApiStudent) -> Self {
    raw.into()
  }

  fn id(&self) -> &str {
    &self.id
  }

  fn matches_filter(&self, key: &str, value: &str) -> bool {
    match key {
      "search" => {
        contains_ci(&self.name, value)
          || self.email.as_deref().is_some_and(|e| contains_ci(e, value))
      }
      "level" => self.level.eq_ignore_ascii_case(value.trim()),
      _ => true,
    }
  }

  fn stats(items: &[Self]) -> StudentStats {
    let average_progress = if items.is_empty() {
      0
    } else {
      let sum: u64 = items.iter().map(|s| u64::from(s.progress)).sum();
      (sum / items.len() as u64) as u8
    };
    StudentStats {
      total: items.len(),
      enrolled: items.iter().filter(|s| s.enrolled_count > 0).count(),
      average_progress,
    }
  }
}

// ============================================================================
// Invitations
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InvitationStats {
  pub total: usize,
  pub pending: usize,
  pub accepted: usize,
  pub rejected: usize,
}

impl Resource for Invitation {
  type Raw = ApiInvitation;
  type Stats = InvitationStats;

  const NAME: &'static str = "invitation";
  const PATH: &'static str = "/invitations";
  const LIST_KEYS: &'static [&'static str] = &["invitations"];

  fn normalize(raw: ApiInvitation) -> Self {
    raw.into()
  }

  fn id(&self) -> &str {
    &self.id
  }

  fn matches_filter(&self, key: &str, value: &str) -> bool {
    match key {
      "status" => self.status.as_str().eq_ignore_ascii_case(value.trim()),
      "search" => contains_ci(&self.halaka_title, value) || contains_ci(&self.sender_name, value),
      _ => true,
    }
  }

  fn stats(items: &[Self]) -> InvitationStats {
    let count = |status: InvitationStatus| items.iter().filter(|i| i.status == status).count();
    InvitationStats {
      total: items.len(),
      pending: count(InvitationStatus::Pending),
      accepted: count(InvitationStatus::Accepted),
      rejected: count(InvitationStatus::Rejected),
    }
  }
}
