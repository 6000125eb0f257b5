use serde::Serialize;

/// Halaka status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HalakaStatus {
  Active,
  Upcoming,
  Completed,
  Cancelled,
}

impl HalakaStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      HalakaStatus::Active => "active",
      HalakaStatus::Upcoming => "upcoming",
      HalakaStatus::Completed => "completed",
      HalakaStatus::Cancelled => "cancelled",
    }
  }
}

/// A bookable teaching session (also called an episode)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Halaka {
  pub id: String,
  pub title: String,
  pub description: String,
  pub teacher_id: Option<String>,
  pub teacher_name: String,
  pub status: HalakaStatus,
  pub halaka_type: String,
  pub max_students: u32,
  pub current_students: u32,
  pub price: f64,
  pub currency: String,
  pub start_date: Option<String>,
  pub end_date: Option<String>,
  pub schedule: Option<String>,
}

impl Halaka {
  pub fn available_seats(&self) -> u32 {
    self.max_students.saturating_sub(self.current_students)
  }

  pub fn is_full(&self) -> bool {
    self.available_seats() == 0
  }
}

/// Public teacher profile
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeacherProfile {
  pub id: String,
  pub name: String,
  pub bio: String,
  pub specialization: String,
  pub rating: f64,
  pub reviews_count: u32,
  pub hourly_rate: f64,
  pub experience_years: u32,
  pub verified: bool,
  pub languages: Vec<String>,
}

/// Student profile with progress tracking
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentProfile {
  pub id: String,
  pub name: String,
  pub email: Option<String>,
  pub level: String,
  pub enrolled_count: u32,
  pub completed_sessions: u32,
  /// Overall progress percentage, 0-100
  pub progress: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
  Pending,
  Accepted,
  Rejected,
  Expired,
}

impl InvitationStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      InvitationStatus::Pending => "pending",
      InvitationStatus::Accepted => "accepted",
      InvitationStatus::Rejected => "rejected",
      InvitationStatus::Expired => "expired",
    }
  }
}

/// Invitation to join a halaka
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Invitation {
  pub id: String,
  pub halaka_id: Option<String>,
  pub halaka_title: String,
  pub sender_name: String,
  pub status: InvitationStatus,
  pub message: Option<String>,
  pub created_at: Option<String>,
}

/// Seat reservation awaiting payment
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Enrollment {
  pub id: String,
  pub halaka_id: String,
  pub status: String,
  pub amount: f64,
  pub currency: String,
}

/// Checkout handle returned when a payment is initiated
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentSession {
  pub reference: String,
  pub payment_url: Option<String>,
  pub status: String,
}
