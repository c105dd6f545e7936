//! Server-side session state.
//!
//! The client holds only a signed opaque token; everything here lives in
//! the session store.

use crate::session::flash::FlashQueue;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Account role. The set is closed; a session principal never carries a
/// role outside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    JobSeeker,
    Recruiter,
    Employer,
    #[serde(rename = "admin")]
    Administrator,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::JobSeeker => "jobseeker",
            Self::Recruiter => "recruiter",
            Self::Employer => "employer",
            Self::Administrator => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "jobseeker" => Ok(Self::JobSeeker),
            "recruiter" => Ok(Self::Recruiter),
            "employer" => Ok(Self::Employer),
            "admin" => Ok(Self::Administrator),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summary of the authenticated account stored in the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
    pub name: String,
    pub surname: String,
    pub email: String,
    pub role: Role,
}

/// All state attached to one session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionData {
    pub principal: Option<Principal>,
    /// Path to return to after sign-in, recorded when an anonymous request
    /// hits a protected route.
    pub return_to: Option<String>,
    pub flash: FlashQueue,
    pub created_at: u64,
    pub last_touched_at: u64,
}

impl SessionData {
    #[must_use]
    pub fn new(now: u64) -> Self {
        Self {
            principal: None,
            return_to: None,
            flash: FlashQueue::default(),
            created_at: now,
            last_touched_at: now,
        }
    }

    /// A session with no principal, no pending redirect, and no queued
    /// messages is never worth a store write.
    #[must_use]
    pub fn is_unused(&self) -> bool {
        self.principal.is_none() && self.return_to.is_none() && self.flash.is_empty()
    }
}
