//! Serde-deserializable types matching backend API responses.
//!
//! These types are separate from domain types so that deserialization can be
//! lenient (camelCase or snake_case names, numbers sent as strings, missing
//! fields) while domain types always carry fully-populated values.

use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;

use super::types::{
  Enrollment, Halaka, HalakaStatus, Invitation, InvitationStatus, PaymentSession, StudentProfile,
  TeacherProfile,
};

pub const DEFAULT_DESCRIPTION: &str = "لا يوجد وصف";
pub const DEFAULT_MAX_STUDENTS: u32 = 10;
pub const DEFAULT_TITLE: &str = "بدون عنوان";
pub const DEFAULT_TEACHER_NAME: &str = "غير محدد";
pub const DEFAULT_HALAKA_TYPE: &str = "general";
pub const DEFAULT_CURRENCY: &str = "SAR";
pub const DEFAULT_BIO: &str = "لا توجد نبذة";
pub const DEFAULT_SPECIALIZATION: &str = "تحفيظ القرآن الكريم";
pub const DEFAULT_LEVEL: &str = "مبتدئ";
pub const DEFAULT_SENDER: &str = "غير معروف";

/// Deserialize a JSON value into a typed struct.
pub fn reserialize<T: DeserializeOwned>(value: Value) -> serde_json::Result<T> {
  serde_json::from_value(value)
}

/// Field deserializers that never fail on an unexpected JSON type.
///
/// Anything that does not fit becomes `None` and picks up the domain default.
pub mod lenient {
  use serde::{Deserialize, Deserializer};
  use serde_json::Value;

  /// Strings and numbers (ids are sent either way); blank strings are absent.
  pub fn opt_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(d)? {
      Value::String(s) if !s.trim().is_empty() => Some(s),
      Value::Number(n) => Some(n.to_string()),
      _ => None,
    })
  }

  pub fn opt_u32<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u32>, D::Error> {
    Ok(match Value::deserialize(d)? {
      Value::Number(n) => n
        .as_u64()
        .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
        .and_then(|n| u32::try_from(n).ok()),
      Value::String(s) => s.trim().parse().ok(),
      _ => None,
    })
  }

  pub fn opt_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    Ok(match Value::deserialize(d)? {
      Value::Number(n) => n.as_f64(),
      Value::String(s) => s.trim().parse().ok(),
      _ => None,
    })
  }

  pub fn opt_bool<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
    Ok(match Value::deserialize(d)? {
      Value::Bool(b) => Some(b),
      Value::Number(n) => n.as_i64().map(|n| n != 0),
      Value::String(s) => match s.trim() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
      },
      _ => None,
    })
  }

  /// An array of strings or a single comma-separated string.
  pub fn string_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    let items: Vec<String> = match Value::deserialize(d)? {
      Value::Array(values) => values
        .into_iter()
        .filter_map(|v| match v {
          Value::String(s) => Some(s),
          _ => None,
        })
        .collect(),
      Value::String(s) => s.split(',').map(String::from).collect(),
      _ => Vec::new(),
    };
    Ok(
      items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect(),
    )
  }
}

// ============================================================================
// Nested references
// ============================================================================

/// A related person, sent either as an object or just a display name.
fn person_ref(value: Option<&Value>) -> (Option<String>, Option<String>) {
  match value {
    Some(Value::Object(map)) => {
      let id = ["id", "_id"]
        .iter()
        .find_map(|k| map.get(*k))
        .and_then(|v| match v {
          Value::String(s) if !s.is_empty() => Some(s.clone()),
          Value::Number(n) => Some(n.to_string()),
          _ => None,
        });
      let name = ["name", "fullName", "full_name"]
        .iter()
        .find_map(|k| map.get(*k).and_then(Value::as_str))
        .filter(|s| !s.trim().is_empty())
        .map(String::from);
      (id, name)
    }
    Some(Value::String(name)) if !name.trim().is_empty() => (None, Some(name.clone())),
    _ => (None, None),
  }
}

// ============================================================================
// Pagination block
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ApiPagination {
  #[serde(
    rename = "currentPage",
    alias = "current_page",
    alias = "page",
    deserialize_with = "lenient::opt_u32"
  )]
  pub current_page: Option<u32>,
  #[serde(
    rename = "totalPages",
    alias = "total_pages",
    alias = "pages",
    deserialize_with = "lenient::opt_u32"
  )]
  pub total_pages: Option<u32>,
  #[serde(
    rename = "totalItems",
    alias = "total_items",
    alias = "total",
    deserialize_with = "lenient::opt_u32"
  )]
  pub total_items: Option<u32>,
  #[serde(
    rename = "itemsPerPage",
    alias = "items_per_page",
    alias = "limit",
    deserialize_with = "lenient::opt_u32"
  )]
  pub items_per_page: Option<u32>,
  #[serde(rename = "hasNext", alias = "has_next", deserialize_with = "lenient::opt_bool")]
  pub has_next: Option<bool>,
  #[serde(rename = "hasPrev", alias = "has_prev", deserialize_with = "lenient::opt_bool")]
  pub has_prev: Option<bool>,
}

// ============================================================================
// Halaka
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ApiHalaka {
  #[serde(alias = "_id", deserialize_with = "lenient::opt_string")]
  pub id: Option<String>,
  #[serde(alias = "name", deserialize_with = "lenient::opt_string")]
  pub title: Option<String>,
  #[serde(deserialize_with = "lenient::opt_string")]
  pub description: Option<String>,
  #[serde(rename = "teacherId", alias = "teacher_id", deserialize_with = "lenient::opt_string")]
  pub teacher_id: Option<String>,
  #[serde(rename = "teacherName", alias = "teacher_name", deserialize_with = "lenient::opt_string")]
  pub teacher_name: Option<String>,
  pub teacher: Option<Value>,
  #[serde(deserialize_with = "lenient::opt_string")]
  pub status: Option<String>,
  #[serde(
    rename = "halakaType",
    alias = "halaka_type",
    alias = "type",
    deserialize_with = "lenient::opt_string"
  )]
  pub halaka_type: Option<String>,
  #[serde(rename = "maxStudents", alias = "max_students", deserialize_with = "lenient::opt_u32")]
  pub max_students: Option<u32>,
  #[serde(
    rename = "currentStudents",
    alias = "current_students",
    alias = "enrolledCount",
    deserialize_with = "lenient::opt_u32"
  )]
  pub current_students: Option<u32>,
  #[serde(deserialize_with = "lenient::opt_f64")]
  pub price: Option<f64>,
  #[serde(deserialize_with = "lenient::opt_string")]
  pub currency: Option<String>,
  #[serde(rename = "startDate", alias = "start_date", deserialize_with = "lenient::opt_string")]
  pub start_date: Option<String>,
  #[serde(rename = "endDate", alias = "end_date", deserialize_with = "lenient::opt_string")]
  pub end_date: Option<String>,
  #[serde(deserialize_with = "lenient::opt_string")]
  pub schedule: Option<String>,
}

fn parse_halaka_status(raw: Option<&str>) -> HalakaStatus {
  match raw.map(|s| s.trim().to_lowercase()).as_deref() {
    Some("upcoming") | Some("scheduled") | Some("pending") => HalakaStatus::Upcoming,
    Some("completed") | Some("finished") | Some("ended") => HalakaStatus::Completed,
    Some("cancelled") | Some("canceled") => HalakaStatus::Cancelled,
    _ => HalakaStatus::Active,
  }
}

impl From<ApiHalaka> for Halaka {
  fn from(raw: ApiHalaka) -> Self {
    let (nested_teacher_id, nested_teacher_name) = person_ref(raw.teacher.as_ref());

    Halaka {
      id: raw.id.unwrap_or_default(),
      title: raw.title.unwrap_or_else(|| DEFAULT_TITLE.to_string()),
      description: raw
        .description
        .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
      teacher_id: raw.teacher_id.or(nested_teacher_id),
      teacher_name: raw
        .teacher_name
        .or(nested_teacher_name)
        .unwrap_or_else(|| DEFAULT_TEACHER_NAME.to_string()),
      status: parse_halaka_status(raw.status.as_deref()),
      halaka_type: raw
        .halaka_type
        .unwrap_or_else(|| DEFAULT_HALAKA_TYPE.to_string()),
      // Zero capacity is treated like a missing value
      max_students: raw
        .max_students
        .filter(|n| *n > 0)
        .unwrap_or(DEFAULT_MAX_STUDENTS),
      current_students: raw.current_students.unwrap_or(0),
      price: raw.price.unwrap_or(0.0),
      currency: raw
        .currency
        .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
      start_date: raw.start_date,
      end_date: raw.end_date,
      schedule: raw.schedule,
    }
  }
}

// ============================================================================
// Teacher
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ApiTeacher {
  #[serde(alias = "_id", deserialize_with = "lenient::opt_string")]
  pub id: Option<String>,
  #[serde(alias = "fullName", alias = "full_name", deserialize_with = "lenient::opt_string")]
  pub name: Option<String>,
  #[serde(alias = "about", deserialize_with = "lenient::opt_string")]
  pub bio: Option<String>,
  #[serde(deserialize_with = "lenient::opt_string")]
  pub specialization: Option<String>,
  #[serde(deserialize_with = "lenient::opt_f64")]
  pub rating: Option<f64>,
  #[serde(rename = "reviewsCount", alias = "reviews_count", deserialize_with = "lenient::opt_u32")]
  pub reviews_count: Option<u32>,
  #[serde(rename = "hourlyRate", alias = "hourly_rate", deserialize_with = "lenient::opt_f64")]
  pub hourly_rate: Option<f64>,
  #[serde(
    rename = "experienceYears",
    alias = "experience_years",
    alias = "experience",
    deserialize_with = "lenient::opt_u32"
  )]
  pub experience_years: Option<u32>,
  #[serde(alias = "isVerified", alias = "is_verified", deserialize_with = "lenient::opt_bool")]
  pub verified: Option<bool>,
  #[serde(deserialize_with = "lenient::string_list")]
  pub languages: Vec<String>,
}

impl From<ApiTeacher> for TeacherProfile {
  fn from(raw: ApiTeacher) -> Self {
    TeacherProfile {
      id: raw.id.unwrap_or_default(),
      name: raw
        .name
        .unwrap_or_else(|| DEFAULT_TEACHER_NAME.to_string()),
      bio: raw.bio.unwrap_or_else(|| DEFAULT_BIO.to_string()),
      specialization: raw
        .specialization
        .unwrap_or_else(|| DEFAULT_SPECIALIZATION.to_string()),
      rating: raw.rating.unwrap_or(0.0).clamp(0.0, 5.0),
      reviews_count: raw.reviews_count.unwrap_or(0),
      hourly_rate: raw.hourly_rate.unwrap_or(0.0),
      experience_years: raw.experience_years.unwrap_or(0),
      verified: raw.verified.unwrap_or(false),
      languages: raw.languages,
    }
  }
}

// ============================================================================
// Student
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ApiStudent {
  #[serde(alias = "_id", deserialize_with = "lenient::opt_string")]
  pub id: Option<String>,
  #[serde(alias = "fullName", alias = "full_name", deserialize_with = "lenient::opt_string")]
  pub name: Option<String>,
  #[serde(deserialize_with = "lenient::opt_string")]
  pub email: Option<String>,
  #[serde(deserialize_with = "lenient::opt_string")]
  pub level: Option<String>,
  #[serde(
    rename = "enrolledCount",
    alias = "enrolled_count",
    alias = "enrolledHalakat",
    deserialize_with = "lenient::opt_u32"
  )]
  pub enrolled_count: Option<u32>,
  #[serde(
    rename = "completedSessions",
    alias = "completed_sessions",
    deserialize_with = "lenient::opt_u32"
  )]
  pub completed_sessions: Option<u32>,
  #[serde(deserialize_with = "lenient::opt_f64")]
  pub progress: Option<f64>,
}

impl From<ApiStudent> for StudentProfile {
  fn from(raw: ApiStudent) -> Self {
    StudentProfile {
      id: raw.id.unwrap_or_default(),
      name: raw.name.unwrap_or_default(),
      email: raw.email,
      level: raw.level.unwrap_or_else(|| DEFAULT_LEVEL.to_string()),
      enrolled_count: raw.enrolled_count.unwrap_or(0),
      completed_sessions: raw.completed_sessions.unwrap_or(0),
      progress: raw.progress.unwrap_or(0.0).clamp(0.0, 100.0).round() as u8,
    }
  }
}

// ============================================================================
// Invitation
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ApiInvitation {
  #[serde(alias = "_id", deserialize_with = "lenient::opt_string")]
  pub id: Option<String>,
  #[serde(rename = "halakaId", alias = "halaka_id", deserialize_with = "lenient::opt_string")]
  pub halaka_id: Option<String>,
  #[serde(
    rename = "halakaTitle",
    alias = "halaka_title",
    deserialize_with = "lenient::opt_string"
  )]
  pub halaka_title: Option<String>,
  pub halaka: Option<Value>,
  #[serde(rename = "senderName", alias = "sender_name", deserialize_with = "lenient::opt_string")]
  pub sender_name: Option<String>,
  #[serde(alias = "from")]
  pub sender: Option<Value>,
  #[serde(deserialize_with = "lenient::opt_string")]
  pub status: Option<String>,
  #[serde(deserialize_with = "lenient::opt_string")]
  pub message: Option<String>,
  #[serde(rename = "createdAt", alias = "created_at", deserialize_with = "lenient::opt_string")]
  pub created_at: Option<String>,
}

fn parse_invitation_status(raw: Option<&str>) -> InvitationStatus {
  match raw.map(|s| s.trim().to_lowercase()).as_deref() {
    Some("accepted") => InvitationStatus::Accepted,
    Some("rejected") | Some("declined") => InvitationStatus::Rejected,
    Some("expired") => InvitationStatus::Expired,
    _ => InvitationStatus::Pending,
  }
}

impl From<ApiInvitation> for Invitation {
  fn from(raw: ApiInvitation) -> Self {
    let halaka_title = raw.halaka.as_ref().and_then(|h| {
      h.get("title")
        .or_else(|| h.get("name"))
        .and_then(Value::as_str)
        .map(String::from)
    });
    let (nested_halaka_id, _) = person_ref(raw.halaka.as_ref());
    let (_, nested_sender) = person_ref(raw.sender.as_ref());

    Invitation {
      id: raw.id.unwrap_or_default(),
      halaka_id: raw.halaka_id.or(nested_halaka_id),
      halaka_title: raw
        .halaka_title
        .or(halaka_title)
        .unwrap_or_else(|| DEFAULT_TITLE.to_string()),
      sender_name: raw
        .sender_name
        .or(nested_sender)
        .unwrap_or_else(|| DEFAULT_SENDER.to_string()),
      status: parse_invitation_status(raw.status.as_deref()),
      message: raw.message,
      created_at: raw.created_at,
    }
  }
}

// ============================================================================
// Enrollment and payment
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ApiEnrollment {
  #[serde(alias = "_id", deserialize_with = "lenient::opt_string")]
  pub id: Option<String>,
  #[serde(rename = "halakaId", alias = "halaka_id", deserialize_with = "lenient::opt_string")]
  pub halaka_id: Option<String>,
  #[serde(deserialize_with = "lenient::opt_string")]
  pub status: Option<String>,
  #[serde(alias = "price", deserialize_with = "lenient::opt_f64")]
  pub amount: Option<f64>,
  #[serde(deserialize_with = "lenient::opt_string")]
  pub currency: Option<String>,
}

impl ApiEnrollment {
  /// `halaka_id` falls back to the halaka the enrollment was requested for.
  pub fn into_enrollment(self, halaka_id: &str) -> Enrollment {
    Enrollment {
      id: self.id.unwrap_or_default(),
      halaka_id: self.halaka_id.unwrap_or_else(|| halaka_id.to_string()),
      status: self
        .status
        .unwrap_or_else(|| "pending_payment".to_string()),
      amount: self.amount.unwrap_or(0.0),
      currency: self
        .currency
        .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
    }
  }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ApiPaymentSession {
  #[serde(
    alias = "paymentId",
    alias = "payment_id",
    alias = "id",
    deserialize_with = "lenient::opt_string"
  )]
  pub reference: Option<String>,
  #[serde(
    rename = "paymentUrl",
    alias = "payment_url",
    alias = "url",
    deserialize_with = "lenient::opt_string"
  )]
  pub payment_url: Option<String>,
  #[serde(deserialize_with = "lenient::opt_string")]
  pub status: Option<String>,
}

impl From<ApiPaymentSession> for PaymentSession {
  fn from(raw: ApiPaymentSession) -> Self {
    PaymentSession {
      reference: raw.reference.unwrap_or_default(),
      payment_url: raw.payment_url,
      status: raw.status.unwrap_or_else(|| "pending".to_string()),
    }
  }
}
