//! Purchase order approval rules
//!
//! An order starts `pending_approval`. Owners approve anything; managers
//! approve up to the configured threshold and escalate above it. Approved
//! and rejected orders are final.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{HearthError, Result};

/// Purchase order status as stored in `universal_transactions.status`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoStatus {
    PendingApproval,
    Escalated,
    Approved,
    Rejected,
}

impl PoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingApproval => "pending_approval",
            Self::Escalated => "escalated",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Approved and rejected orders cannot change again
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }

    pub fn all() -> &'static [PoStatus] {
        &[
            Self::PendingApproval,
            Self::Escalated,
            Self::Approved,
            Self::Rejected,
        ]
    }
}

impl fmt::Display for PoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PoStatus {
    type Err = HearthError;

    fn from_str(s: &str) -> Result<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| HearthError::validation("status", format!("unknown status '{}'", s)))
    }
}

/// Role of the user acting on an order, read from the user's `role` field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApproverRole {
    Owner,
    Manager,
    Staff,
    Viewer,
}

impl ApproverRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Manager => "manager",
            Self::Staff => "staff",
            Self::Viewer => "viewer",
        }
    }

    /// Whether this role may approve or reject at all
    pub fn can_approve(&self) -> bool {
        matches!(self, Self::Owner | Self::Manager)
    }
}

impl fmt::Display for ApproverRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApproverRole {
    type Err = HearthError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "owner" => Ok(Self::Owner),
            "manager" => Ok(Self::Manager),
            "staff" => Ok(Self::Staff),
            "viewer" => Ok(Self::Viewer),
            other => Err(HearthError::validation(
                "role",
                format!("unknown role '{}' (owner, manager, staff, viewer)", other),
            )),
        }
    }
}

/// Outcome of an approval attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalDecision {
    /// Write the new status
    Transition(PoStatus),
    /// The approver's role cannot approve purchase orders
    NotAuthorized,
}

/// Threshold rule for purchase order approval
#[derive(Debug, Clone, Copy)]
pub struct ApprovalPolicy {
    pub threshold_cents: i64,
}

impl ApprovalPolicy {
    pub fn new(threshold_cents: i64) -> Self {
        Self { threshold_cents }
    }

    /// Decide the status an approval attempt writes.
    ///
    /// # Example
    /// ```
    /// use hearth_core::{ApprovalDecision, ApprovalPolicy, ApproverRole, PoStatus};
    ///
    /// let policy = ApprovalPolicy::new(100_00);
    /// let decision = policy
    ///     .decide(PoStatus::PendingApproval, 250_00, ApproverRole::Manager)
    ///     .unwrap();
    /// assert_eq!(decision, ApprovalDecision::Transition(PoStatus::Escalated));
    /// ```
    pub fn decide(
        &self,
        current: PoStatus,
        total_cents: i64,
        role: ApproverRole,
    ) -> Result<ApprovalDecision> {
        if current.is_final() {
            return Err(HearthError::InvalidTransition {
                from: current.to_string(),
                action: "approve",
            });
        }

        let decision = match role {
            ApproverRole::Staff | ApproverRole::Viewer => ApprovalDecision::NotAuthorized,
            ApproverRole::Owner => ApprovalDecision::Transition(PoStatus::Approved),
            ApproverRole::Manager if total_cents <= self.threshold_cents => {
                ApprovalDecision::Transition(PoStatus::Approved)
            }
            ApproverRole::Manager => ApprovalDecision::Transition(PoStatus::Escalated),
        };

        Ok(decision)
    }

    /// Decide whether a rejection may be written.
    pub fn reject(&self, current: PoStatus, role: ApproverRole) -> Result<ApprovalDecision> {
        if current.is_final() {
            return Err(HearthError::InvalidTransition {
                from: current.to_string(),
                action: "reject",
            });
        }

        if !role.can_approve() {
            return Ok(ApprovalDecision::NotAuthorized);
        }

        Ok(ApprovalDecision::Transition(PoStatus::Rejected))
    }
}

/// Amount of one order line in cents, rounded to the nearest cent
pub fn line_amount(quantity: f64, unit_price_cents: i64) -> i64 {
    (quantity * unit_price_cents as f64).round() as i64
}
