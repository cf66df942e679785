use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Opaque player identity as the server consumes it. Token issuance and
/// verification happen upstream; a verified email arrives already checked.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PlayerIdentity {
    pub id: Uuid,
    pub display_name: String,
    pub email: Option<String>,
}

impl PlayerIdentity {
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            display_name: display_name.into(),
            email: None,
        }
    }

    pub fn with_email(display_name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            display_name: display_name.into(),
            email: Some(email.into()),
        }
    }
}
