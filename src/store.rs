//! Backing stores for guests, RSVPs, and events.
//!
//! The traits model the external keyed store the services consume: create,
//! read, update, delete, predicate queries, pagination, and counts. Uniqueness
//! rules live here and are authoritative: the services run best-effort
//! fast-fail pre-checks, but a concurrent duplicate that slips past them is
//! still rejected by the store.
//!
//! The in-memory implementations are the reference collaborators the tests
//! exercise; a persistent backend would implement the same traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::seq::IteratorRandom;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crate::error::{ServiceError, ServiceResult};
use crate::model::{Guest, GuestDetails, Rsvp, RsvpRequest, RsvpStatus, WeddingEvent};

/// One page of results plus the total row count behind it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageResult<T> {
    pub items: Vec<T>,
    /// Zero-indexed page number as requested.
    pub page: usize,
    pub page_size: usize,
    /// Total matching rows across all pages.
    pub total: usize,
}

/// Keyed store for guest records. Email uniqueness is enforced here.
#[async_trait]
pub trait GuestStore: Send + Sync {
    /// Persist a new guest, assigning id and timestamps. Rejects a duplicate
    /// email with `Conflict`.
    async fn insert(&self, details: GuestDetails) -> ServiceResult<Guest>;

    async fn get(&self, id: u64) -> ServiceResult<Option<Guest>>;

    /// Case-sensitive exact email match.
    async fn find_by_email(&self, email: &str) -> ServiceResult<Option<Guest>>;

    /// Overwrite all mutable fields of an existing guest. Rejects an email
    /// already held by a different guest.
    async fn update(&self, id: u64, details: GuestDetails) -> ServiceResult<Guest>;

    async fn remove(&self, id: u64) -> ServiceResult<()>;

    /// Paginate guests ordered by id; `search` filters case-insensitively
    /// against first name, last name, or email.
    async fn page(
        &self,
        page: usize,
        page_size: usize,
        search: Option<&str>,
    ) -> ServiceResult<PageResult<Guest>>;

    async fn count(&self) -> ServiceResult<u64>;

    async fn count_plus_one(&self) -> ServiceResult<u64>;

    /// Unordered random subset of at most `n` guests.
    async fn sample(&self, n: usize) -> ServiceResult<Vec<Guest>>;

    /// Deliberately expensive wide scan: materializes the guest table
    /// `fanout` times before sorting and truncating to `limit` rows.
    async fn cross_join_scan(&self, fanout: usize, limit: usize) -> ServiceResult<Vec<Guest>>;
}

/// Keyed store for RSVPs. At most one RSVP per guest, enforced here.
#[async_trait]
pub trait RsvpStore: Send + Sync {
    /// Persist a new RSVP, assigning id and submission time. Rejects a second
    /// RSVP for the same guest with `Conflict`.
    async fn insert(&self, request: RsvpRequest) -> ServiceResult<Rsvp>;

    async fn find_by_guest(&self, guest_id: u64) -> ServiceResult<Option<Rsvp>>;

    async fn count(&self) -> ServiceResult<u64>;

    async fn count_by_status(&self, status: RsvpStatus) -> ServiceResult<u64>;

    async fn count_plus_one_attending(&self) -> ServiceResult<u64>;

    async fn list_by_status(&self, status: RsvpStatus) -> ServiceResult<Vec<Rsvp>>;
}

/// Keyed store for event records.
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn insert(&self, event: WeddingEvent) -> ServiceResult<WeddingEvent>;

    /// The earliest-dated event, if any exist.
    async fn first_by_date(&self) -> ServiceResult<Option<WeddingEvent>>;

    /// All events ordered by event date.
    async fn all_by_date(&self) -> ServiceResult<Vec<WeddingEvent>>;

    /// Events dated strictly after `after`, ordered by event date.
    async fn upcoming(&self, after: DateTime<Utc>) -> ServiceResult<Vec<WeddingEvent>>;

    async fn count(&self) -> ServiceResult<u64>;
}

/// In-memory guest store.
#[derive(Debug, Default)]
pub struct InMemoryGuestStore {
    guests: Mutex<HashMap<u64, Guest>>,
    next_id: AtomicU64,
}

impl InMemoryGuestStore {
    pub fn new() -> Self {
        Self { guests: Mutex::new(HashMap::new()), next_id: AtomicU64::new(1) }
    }
}

#[async_trait]
impl GuestStore for InMemoryGuestStore {
    async fn insert(&self, details: GuestDetails) -> ServiceResult<Guest> {
        let mut guests = self.guests.lock().expect("guest store poisoned");
        // Uniqueness check and insert happen under one lock; this is the
        // authoritative guard against concurrent duplicate creates.
        if guests.values().any(|g| g.email == details.email) {
            return Err(ServiceError::Conflict(format!(
                "guest with email {} already exists",
                details.email
            )));
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let now = Utc::now();
        let guest = Guest {
            id,
            first_name: details.first_name,
            last_name: details.last_name,
            email: details.email,
            phone: details.phone,
            address: details.address,
            plus_one: details.plus_one,
            dietary_restrictions: details.dietary_restrictions,
            created_at: now,
            updated_at: now,
        };
        guests.insert(id, guest.clone());
        Ok(guest)
    }

    async fn get(&self, id: u64) -> ServiceResult<Option<Guest>> {
        let guests = self.guests.lock().expect("guest store poisoned");
        Ok(guests.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> ServiceResult<Option<Guest>> {
        let guests = self.guests.lock().expect("guest store poisoned");
        Ok(guests.values().find(|g| g.email == email).cloned())
    }

    async fn update(&self, id: u64, details: GuestDetails) -> ServiceResult<Guest> {
        let mut guests = self.guests.lock().expect("guest store poisoned");
        if guests.values().any(|g| g.id != id && g.email == details.email) {
            return Err(ServiceError::Conflict(format!(
                "guest with email {} already exists",
                details.email
            )));
        }
        let guest = guests.get_mut(&id).ok_or_else(|| ServiceError::not_found("guest", id))?;
        guest.apply(details);
        Ok(guest.clone())
    }

    async fn remove(&self, id: u64) -> ServiceResult<()> {
        let mut guests = self.guests.lock().expect("guest store poisoned");
        guests.remove(&id).map(|_| ()).ok_or_else(|| ServiceError::not_found("guest", id))
    }

    async fn page(
        &self,
        page: usize,
        page_size: usize,
        search: Option<&str>,
    ) -> ServiceResult<PageResult<Guest>> {
        let guests = self.guests.lock().expect("guest store poisoned");
        let mut matching: Vec<Guest> = guests
            .values()
            .filter(|g| match search {
                Some(term) if !term.trim().is_empty() => g.matches_search(term.trim()),
                _ => true,
            })
            .cloned()
            .collect();
        matching.sort_by_key(|g| g.id);

        let total = matching.len();
        let items = matching
            .into_iter()
            .skip(page.saturating_mul(page_size))
            .take(page_size)
            .collect();
        Ok(PageResult { items, page, page_size, total })
    }

    async fn count(&self) -> ServiceResult<u64> {
        let guests = self.guests.lock().expect("guest store poisoned");
        Ok(guests.len() as u64)
    }

    async fn count_plus_one(&self) -> ServiceResult<u64> {
        let guests = self.guests.lock().expect("guest store poisoned");
        Ok(guests.values().filter(|g| g.plus_one).count() as u64)
    }

    async fn sample(&self, n: usize) -> ServiceResult<Vec<Guest>> {
        let guests = self.guests.lock().expect("guest store poisoned");
        Ok(guests.values().cloned().choose_multiple(&mut rand::rng(), n))
    }

    async fn cross_join_scan(&self, fanout: usize, limit: usize) -> ServiceResult<Vec<Guest>> {
        let snapshot: Vec<Guest> = {
            let guests = self.guests.lock().expect("guest store poisoned");
            guests.values().cloned().collect()
        };
        // Materialize the table `fanout` times to emulate a cross-product
        // scan, then sort the whole widened set before truncating.
        let mut rows: Vec<Guest> = Vec::new();
        for _ in 0..fanout.max(1) {
            rows.extend(snapshot.iter().cloned());
        }
        rows.sort_by_key(|g| g.id);
        rows.dedup_by_key(|g| g.id);
        rows.truncate(limit);
        Ok(rows)
    }
}

/// In-memory RSVP store.
#[derive(Debug, Default)]
pub struct InMemoryRsvpStore {
    rsvps: Mutex<HashMap<u64, Rsvp>>,
    next_id: AtomicU64,
}

impl InMemoryRsvpStore {
    pub fn new() -> Self {
        Self { rsvps: Mutex::new(HashMap::new()), next_id: AtomicU64::new(1) }
    }
}

#[async_trait]
impl RsvpStore for InMemoryRsvpStore {
    async fn insert(&self, request: RsvpRequest) -> ServiceResult<Rsvp> {
        let mut rsvps = self.rsvps.lock().expect("rsvp store poisoned");
        if rsvps.values().any(|r| r.guest_id == request.guest_id) {
            return Err(ServiceError::Conflict(format!(
                "RSVP already exists for guest ID: {}",
                request.guest_id
            )));
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let rsvp = Rsvp {
            id,
            guest_id: request.guest_id,
            status: request.status,
            plus_one_attending: request.plus_one_attending,
            message: request.message,
            submitted_at: Utc::now(),
        };
        rsvps.insert(id, rsvp.clone());
        Ok(rsvp)
    }

    async fn find_by_guest(&self, guest_id: u64) -> ServiceResult<Option<Rsvp>> {
        let rsvps = self.rsvps.lock().expect("rsvp store poisoned");
        Ok(rsvps.values().find(|r| r.guest_id == guest_id).cloned())
    }

    async fn count(&self) -> ServiceResult<u64> {
        let rsvps = self.rsvps.lock().expect("rsvp store poisoned");
        Ok(rsvps.len() as u64)
    }

    async fn count_by_status(&self, status: RsvpStatus) -> ServiceResult<u64> {
        let rsvps = self.rsvps.lock().expect("rsvp store poisoned");
        Ok(rsvps.values().filter(|r| r.status == status).count() as u64)
    }

    async fn count_plus_one_attending(&self) -> ServiceResult<u64> {
        let rsvps = self.rsvps.lock().expect("rsvp store poisoned");
        Ok(rsvps.values().filter(|r| r.plus_one_attending).count() as u64)
    }

    async fn list_by_status(&self, status: RsvpStatus) -> ServiceResult<Vec<Rsvp>> {
        let rsvps = self.rsvps.lock().expect("rsvp store poisoned");
        let mut found: Vec<Rsvp> = rsvps.values().filter(|r| r.status == status).cloned().collect();
        found.sort_by_key(|r| r.id);
        Ok(found)
    }
}

/// In-memory event store.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    events: Mutex<HashMap<u64, WeddingEvent>>,
    next_id: AtomicU64,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self { events: Mutex::new(HashMap::new()), next_id: AtomicU64::new(1) }
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn insert(&self, mut event: WeddingEvent) -> ServiceResult<WeddingEvent> {
        let mut events = self.events.lock().expect("event store poisoned");
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        event.id = Some(id);
        events.insert(id, event.clone());
        Ok(event)
    }

    async fn first_by_date(&self) -> ServiceResult<Option<WeddingEvent>> {
        let events = self.events.lock().expect("event store poisoned");
        Ok(events.values().min_by_key(|e| e.event_date).cloned())
    }

    async fn all_by_date(&self) -> ServiceResult<Vec<WeddingEvent>> {
        let events = self.events.lock().expect("event store poisoned");
        let mut all: Vec<WeddingEvent> = events.values().cloned().collect();
        all.sort_by_key(|e| e.event_date);
        Ok(all)
    }

    async fn upcoming(&self, after: DateTime<Utc>) -> ServiceResult<Vec<WeddingEvent>> {
        let events = self.events.lock().expect("event store poisoned");
        let mut found: Vec<WeddingEvent> =
            events.values().filter(|e| e.event_date > after).cloned().collect();
        found.sort_by_key(|e| e.event_date);
        Ok(found)
    }

    async fn count(&self) -> ServiceResult<u64> {
        let events = self.events.lock().expect("event store poisoned");
        Ok(events.len() as u64)
    }
}
