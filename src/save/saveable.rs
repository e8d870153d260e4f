//! Collaborator contract for saveable game state
//!
//! Game subsystems implement the typed `Saveable` trait. The coordinator only
//! sees the object-safe `SaveDomain` trait, which every `Shared<T>` handle
//! implements, so the game keeps ownership of its state while the coordinator
//! holds a registered handle.

use log::warn;
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::cell::RefCell;
use std::rc::Rc;

use super::error::SaveError;
use super::types::Domain;

/// Shared handle to a piece of game state
pub type Shared<T> = Rc<RefCell<T>>;

pub fn shared<T>(value: T) -> Shared<T> {
    Rc::new(RefCell::new(value))
}

/// Trait for game state that can be saved and restored
///
/// # Example
///
/// ```ignore
/// impl Saveable for PlayerState {
///     type Data = PlayerSaveData;
///     const DOMAIN: Domain = Domain::Player;
///
///     fn to_save_data(&self) -> Result<PlayerSaveData, SaveError> { /* ... */ }
///     fn apply_save_data(&mut self, data: Option<PlayerSaveData>) { /* ... */ }
/// }
/// ```
pub trait Saveable {
    type Data: Serialize + DeserializeOwned;

    const DOMAIN: Domain;

    /// Capture the current state. Must not mutate anything.
    fn to_save_data(&self) -> Result<Self::Data, SaveError>;

    /// Restore state from a save
    ///
    /// `None` means the save carried nothing for this domain; implementations
    /// leave their state as it is.
    fn apply_save_data(&mut self, data: Option<Self::Data>);
}

/// Object-safe view of a collaborator, as registered with the coordinator
pub trait SaveDomain {
    fn domain(&self) -> Domain;

    fn produce_snapshot(&self) -> Result<Value, SaveError>;

    /// Check a payload before any domain is applied
    fn validate_snapshot(&self, _payload: &Value) -> Result<(), SaveError> {
        Ok(())
    }

    fn apply_snapshot(&mut self, payload: Option<&Value>);
}

impl<T: Saveable> SaveDomain for Shared<T> {
    fn domain(&self) -> Domain {
        T::DOMAIN
    }

    fn produce_snapshot(&self) -> Result<Value, SaveError> {
        let state = self
            .try_borrow()
            .map_err(|_| SaveError::capture(T::DOMAIN.key(), "state is mutably borrowed"))?;
        let data = state.to_save_data()?;
        serde_json::to_value(&data).map_err(|e| SaveError::capture(T::DOMAIN.key(), e.to_string()))
    }

    fn validate_snapshot(&self, payload: &Value) -> Result<(), SaveError> {
        <T::Data as Deserialize>::deserialize(payload)
            .map(|_| ())
            .map_err(|e| SaveError::corrupt(format!("{} payload: {}", T::DOMAIN, e)))
    }

    fn apply_snapshot(&mut self, payload: Option<&Value>) {
        let data = payload.and_then(|value| match <T::Data as Deserialize>::deserialize(value) {
            Ok(data) => Some(data),
            Err(e) => {
                warn!("Skipping {} payload that failed to parse: {}", T::DOMAIN, e);
                None
            }
        });
        self.borrow_mut().apply_save_data(data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Default)]
    struct Counter {
        value: u32,
        applied: u32,
    }

    #[derive(Serialize, Deserialize)]
    struct CounterData {
        value: u32,
    }

    impl Saveable for Counter {
        type Data = CounterData;
        const DOMAIN: Domain = Domain::Riddles;

        fn to_save_data(&self) -> Result<CounterData, SaveError> {
            Ok(CounterData { value: self.value })
        }

        fn apply_save_data(&mut self, data: Option<CounterData>) {
            self.applied += 1;
            if let Some(data) = data {
                self.value = data.value;
            }
        }
    }

    #[test]
    fn test_shared_handle_produces_payload() {
        let counter = shared(Counter { value: 4, applied: 0 });
        let payload = counter.produce_snapshot().unwrap();
        assert_eq!(payload, json!({ "value": 4 }));
        assert_eq!(counter.domain(), Domain::Riddles);
    }

    #[test]
    fn test_missing_payload_is_noop() {
        let mut counter = shared(Counter { value: 4, applied: 0 });
        counter.apply_snapshot(None);
        assert_eq!(counter.borrow().value, 4);
        assert_eq!(counter.borrow().applied, 1);
    }

    #[test]
    fn test_validate_rejects_wrong_shape() {
        let counter = shared(Counter::default());
        assert!(counter.validate_snapshot(&json!({ "value": 2 })).is_ok());
        let err = counter.validate_snapshot(&json!({ "value": "two" })).unwrap_err();
        assert!(err.is_corrupt());
    }

    #[test]
    fn test_capture_while_borrowed_fails() {
        let counter = shared(Counter::default());
        let _guard = counter.borrow_mut();
        let err = counter.produce_snapshot().unwrap_err();
        assert!(matches!(err, SaveError::CaptureFailed { .. }));
    }
}
