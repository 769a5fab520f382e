//! Error kinds for service operations.
//!
//! One crate-wide error type covers every operation surface. Business-rule
//! violations (duplicate email, duplicate RSVP, invalid status) always fail
//! loudly with a message naming the offending value. Injected faults share the
//! same shape as organic failures of the same kind so an instrumentation
//! pipeline cannot special-case them.

/// Unified error type for all service operations.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// A lookup missed: the entity does not exist under the given key.
    #[error("{entity} not found: {key}")]
    NotFound {
        /// Entity kind, e.g. `guest` or `rsvp`.
        entity: &'static str,
        /// The key that missed.
        key: String,
    },
    /// A uniqueness rule was violated (duplicate email, duplicate RSVP).
    #[error("conflict: {0}")]
    Conflict(String),
    /// Input failed validation (unknown status value, bad field).
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// A simulated external collaborator failed or timed out.
    #[error("external service unavailable: {0}")]
    ExternalUnavailable(String),
    /// An allocation request could not be satisfied.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),
    /// An explicit error-injection endpoint fired.
    #[error("simulated fault: {0}")]
    SimulatedFault(String),
}

impl ServiceError {
    /// Construct a `NotFound` for an entity kind and key.
    pub fn not_found(entity: &'static str, key: impl std::fmt::Display) -> Self {
        ServiceError::NotFound { entity, key: key.to_string() }
    }

    /// Check if this error is a lookup miss.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this error is a uniqueness conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    /// Check if this error is a validation failure.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }

    /// Check if this error is a (simulated) external-call failure.
    pub fn is_external_unavailable(&self) -> bool {
        matches!(self, Self::ExternalUnavailable(_))
    }

    /// Check if this error is an allocation failure.
    pub fn is_resource_exhausted(&self) -> bool {
        matches!(self, Self::ResourceExhausted(_))
    }

    /// Check if this error came from an error-injection endpoint.
    pub fn is_simulated_fault(&self) -> bool {
        matches!(self, Self::SimulatedFault(_))
    }
}

/// Convenience alias used across the crate.
pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_names_entity_and_key() {
        let err = ServiceError::not_found("guest", 42);
        assert_eq!(err.to_string(), "guest not found: 42");
        assert!(err.is_not_found());
        assert!(!err.is_conflict());
    }

    #[test]
    fn conflict_message_carries_offending_value() {
        let err = ServiceError::Conflict("guest with email a@x.com already exists".into());
        assert!(err.to_string().contains("a@x.com"));
        assert!(err.is_conflict());
    }

    #[test]
    fn predicates_cover_all_variants() {
        assert!(ServiceError::InvalidInput("x".into()).is_invalid_input());
        assert!(ServiceError::ExternalUnavailable("x".into()).is_external_unavailable());
        assert!(ServiceError::ResourceExhausted("x".into()).is_resource_exhausted());
        assert!(ServiceError::SimulatedFault("x".into()).is_simulated_fault());
    }
}
