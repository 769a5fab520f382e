//! Domain records for the event-RSVP domain.
//!
//! Semantics:
//! - `Guest.updated_at` advances on every field mutation; the timestamp fields
//!   themselves never bump it.
//! - `RsvpStatus` is a closed enumeration; unrecognized input fails fast with a
//!   message listing the valid values.
//! - A `WeddingEvent` with `id: None` is a synthesized placeholder that was
//!   never persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ServiceError;

const MAX_NAME_LEN: usize = 100;
const MAX_PHONE_LEN: usize = 20;

/// A persisted guest record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guest {
    pub id: u64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub plus_one: bool,
    pub dietary_restrictions: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Guest {
    /// First and last name joined for display.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Overwrite all mutable fields from `details` and advance `updated_at`.
    pub fn apply(&mut self, details: GuestDetails) {
        self.first_name = details.first_name;
        self.last_name = details.last_name;
        self.email = details.email;
        self.phone = details.phone;
        self.address = details.address;
        self.plus_one = details.plus_one;
        self.dietary_restrictions = details.dietary_restrictions;
        self.updated_at = Utc::now();
    }

    /// Case-insensitive substring match against first name, last name, or
    /// email (OR semantics).
    pub fn matches_search(&self, term: &str) -> bool {
        let term = term.to_lowercase();
        self.first_name.to_lowercase().contains(&term)
            || self.last_name.to_lowercase().contains(&term)
            || self.email.to_lowercase().contains(&term)
    }
}

/// Mutable guest fields as accepted on create/update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestDetails {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub plus_one: bool,
    #[serde(default)]
    pub dietary_restrictions: Option<String>,
}

impl GuestDetails {
    /// Minimal constructor for the required fields.
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: email.into(),
            ..Self::default()
        }
    }

    /// Validate field presence, bounds, and email shape.
    pub fn validate(&self) -> Result<(), ServiceError> {
        validate_name("first name", &self.first_name)?;
        validate_name("last name", &self.last_name)?;
        validate_email(&self.email)?;
        if let Some(phone) = &self.phone {
            if phone.chars().count() > MAX_PHONE_LEN {
                return Err(ServiceError::InvalidInput(format!(
                    "phone number must be at most {MAX_PHONE_LEN} characters"
                )));
            }
        }
        Ok(())
    }
}

fn validate_name(field: &str, value: &str) -> Result<(), ServiceError> {
    if value.trim().is_empty() {
        return Err(ServiceError::InvalidInput(format!("{field} is required")));
    }
    if value.chars().count() > MAX_NAME_LEN {
        return Err(ServiceError::InvalidInput(format!(
            "{field} must be at most {MAX_NAME_LEN} characters"
        )));
    }
    Ok(())
}

fn validate_email(value: &str) -> Result<(), ServiceError> {
    if value.trim().is_empty() {
        return Err(ServiceError::InvalidInput("email is required".into()));
    }
    let well_formed = match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    };
    if !well_formed {
        return Err(ServiceError::InvalidInput(format!("'{value}' is not a valid email address")));
    }
    Ok(())
}

/// RSVP response status. Closed set; inputs outside it are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RsvpStatus {
    Attending,
    NotAttending,
    Maybe,
}

impl RsvpStatus {
    /// All valid statuses, in wire order.
    pub const ALL: [RsvpStatus; 3] = [RsvpStatus::Attending, RsvpStatus::NotAttending, RsvpStatus::Maybe];

    /// The wire string for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            RsvpStatus::Attending => "attending",
            RsvpStatus::NotAttending => "not_attending",
            RsvpStatus::Maybe => "maybe",
        }
    }
}

impl fmt::Display for RsvpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RsvpStatus {
    type Err = ServiceError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let lowered = value.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == lowered)
            .ok_or_else(|| {
                ServiceError::InvalidInput(format!(
                    "invalid RSVP status: '{value}'; valid values are: attending, not_attending, maybe"
                ))
            })
    }
}

/// A persisted RSVP. Created once; never updated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rsvp {
    pub id: u64,
    pub guest_id: u64,
    pub status: RsvpStatus,
    pub plus_one_attending: bool,
    pub message: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

/// An RSVP submission as accepted from the request layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RsvpRequest {
    pub guest_id: u64,
    pub status: RsvpStatus,
    #[serde(default)]
    pub plus_one_attending: bool,
    #[serde(default)]
    pub message: Option<String>,
}

impl RsvpRequest {
    pub fn new(guest_id: u64, status: RsvpStatus) -> Self {
        Self { guest_id, status, plus_one_attending: false, message: None }
    }
}

/// The event record surfaced by the detail lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeddingEvent {
    /// `None` for the synthesized default event, which is never persisted.
    pub id: Option<u64>,
    pub name: String,
    pub description: Option<String>,
    pub event_date: DateTime<Utc>,
    pub venue_name: Option<String>,
    pub venue_address: Option<String>,
    pub dress_code: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl WeddingEvent {
    /// A new unpersisted event with the required fields.
    pub fn new(name: impl Into<String>, event_date: DateTime<Utc>) -> Self {
        Self {
            id: None,
            name: name.into(),
            description: None,
            event_date,
            venue_name: None,
            venue_address: None,
            dress_code: None,
            created_at: Utc::now(),
        }
    }
}
