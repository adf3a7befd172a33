//! Listener availability and account status enumerations.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The listener's chosen (or call-lifecycle-forced) availability intent.
///
/// Distinct from raw connectivity: a listener can be connected while
/// `Offline`, and the denormalized online flag is true only for
/// `Available` listeners with a live connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "app_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AppStatus {
    /// Listener accepts new calls and chats.
    Available,
    /// Listener is in an active call; set by the call lifecycle.
    Busy,
    /// Listener has switched themselves off.
    Offline,
}

impl AppStatus {
    /// Check whether this status counts as online for presence purposes.
    ///
    /// `Busy` does not count: a listener on a call is connected but must
    /// not surface in matching or admin online counts.
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available)
    }

    /// Return the status as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Busy => "busy",
            Self::Offline => "offline",
        }
    }
}

impl fmt::Display for AppStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AppStatus {
    type Err = solace_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "available" => Ok(Self::Available),
            "busy" => Ok(Self::Busy),
            "offline" => Ok(Self::Offline),
            _ => Err(solace_core::AppError::validation(format!(
                "Invalid app status: '{s}'. Expected one of: available, busy, offline"
            ))),
        }
    }
}

/// Account lifecycle status for a listener.
///
/// Gates which product surface the listener sees; orthogonal to presence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "account_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    /// Application accepted but onboarding incomplete.
    OnboardingRequired,
    /// Application submitted and awaiting review.
    Pending,
    /// Approved and active.
    Active,
    /// Suspended by an admin.
    Suspended,
    /// Application rejected.
    Rejected,
}

impl AccountStatus {
    /// Check whether the account is approved and active.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }

    /// Return the status as a snake_case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OnboardingRequired => "onboarding_required",
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Suspended => "suspended",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AccountStatus {
    type Err = solace_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "onboarding_required" => Ok(Self::OnboardingRequired),
            "pending" => Ok(Self::Pending),
            "active" => Ok(Self::Active),
            "suspended" => Ok(Self::Suspended),
            "rejected" => Ok(Self::Rejected),
            _ => Err(solace_core::AppError::validation(format!(
                "Invalid account status: '{s}'"
            ))),
        }
    }
}
