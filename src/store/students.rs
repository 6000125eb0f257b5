use super::{FetchOutcome, ResourceStore};
use crate::api::types::StudentProfile;
use crate::api::ApiError;

/// Id segment the backend resolves to the authenticated student.
const SELF_ID: &str = "me";

impl ResourceStore<StudentProfile> {
  /// Load the signed-in student's profile into `current`.
  pub async fn fetch_me(&self) -> Result<FetchOutcome, ApiError> {
    self.fetch_one(SELF_ID).await
  }
}
