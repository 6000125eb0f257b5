//! Halaka-specific store actions: enrollment and payment initiation.

use serde_json::json;

use super::{Resource, ResourceStore};
use crate::api::api_types::{reserialize, ApiEnrollment, ApiPaymentSession};
use crate::api::types::{Enrollment, Halaka, PaymentSession};
use crate::api::{ApiError, Envelope};

const PAYMENT_PATH: &str = "/payments/initiate";

impl ResourceStore<Halaka> {
  /// Reserve a seat in a halaka.
  ///
  /// On success the seat count of the matching list and current item is
  /// bumped by one locally; the next real fetch replaces that guess.
  pub async fn enroll(&self, id: &str) -> Result<Enrollment, ApiError> {
    let value = self
      .action(id, "enroll", |state, value| {
        state.patch(id, |halaka| {
          halaka.current_students = halaka.current_students.saturating_add(1);
        });
        value
      })
      .await?;

    let raw = Envelope::parse(value, &[])
      .payload
      .into_single()
      .and_then(|v| reserialize::<ApiEnrollment>(v).ok())
      .unwrap_or_default();
    let enrollment = raw.into_enrollment(id);
    tracing::info!(halaka = id, enrollment = %enrollment.id, "enrolled");
    Ok(enrollment)
  }

  /// Start checkout for a pending enrollment.
  pub async fn initiate_payment(&self, enrollment: &Enrollment) -> Result<PaymentSession, ApiError> {
    let body = json!({
      "enrollmentId": enrollment.id,
      "halakaId": enrollment.halaka_id,
      "amount": enrollment.amount,
      "currency": enrollment.currency,
    });

    let value = self
      .client
      .post(PAYMENT_PATH, body)
      .await
      .inspect_err(|e| tracing::warn!(enrollment = %enrollment.id, error = %e, "payment initiation failed"))?;

    let session = Envelope::parse(value, &[])
      .payload
      .into_single()
      .and_then(|v| reserialize::<ApiPaymentSession>(v).ok())
      .map(PaymentSession::from)
      .ok_or_else(|| ApiError::decode(self.client.messages()))?;

    // A paid enrollment changes seat counts
    self.cache.cache().invalidate_prefix(Halaka::PATH);
    Ok(session)
  }
}
