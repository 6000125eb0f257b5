use super::ResourceStore;
use crate::api::types::{Invitation, InvitationStatus};
use crate::api::ApiError;

impl ResourceStore<Invitation> {
  /// Accept or reject an invitation and update its local status.
  pub async fn respond(&self, id: &str, accept: bool) -> Result<(), ApiError> {
    let (action, status) = if accept {
      ("accept", InvitationStatus::Accepted)
    } else {
      ("reject", InvitationStatus::Rejected)
    };

    self
      .action(id, action, |state, _| {
        state.patch(id, |invitation| invitation.status = status);
      })
      .await
  }

  pub fn pending_count(&self) -> usize {
    self
      .items()
      .iter()
      .filter(|i| i.status == InvitationStatus::Pending)
      .count()
  }
}
