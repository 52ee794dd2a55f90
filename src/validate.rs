//! Shape gates for untrusted JSON
//!
//! Upstream APIs are third-party and their shape can drift. A `Validator`
//! decides whether a decoded payload is trustworthy and, in the same step,
//! narrows it to the type the caller wants. The same validator is applied to
//! fresh responses and to anything read back from the cache.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::error::ValidationError;

type CheckFn<T> = dyn Fn(&Value) -> Result<T, ValidationError> + Send + Sync;

/// Checks and narrows a decoded JSON payload to `T`
pub struct Validator<T> {
    check: Arc<CheckFn<T>>,
}

impl<T> Clone for Validator<T> {
    fn clone(&self) -> Self {
        Self {
            check: Arc::clone(&self.check),
        }
    }
}

impl<T> fmt::Debug for Validator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator").finish_non_exhaustive()
    }
}

impl<T> Validator<T> {
    /// Wraps an arbitrary parse-or-reject function
    pub fn new<F>(check: F) -> Self
    where
        F: Fn(&Value) -> Result<T, ValidationError> + Send + Sync + 'static,
    {
        Self {
            check: Arc::new(check),
        }
    }

    pub fn check(&self, value: &Value) -> Result<T, ValidationError> {
        (self.check)(value)
    }

    pub fn is_valid(&self, value: &Value) -> bool {
        self.check(value).is_ok()
    }
}

impl Validator<Value> {
    /// Accepts payloads for which `pred` holds and returns them unchanged
    pub fn predicate<P>(reason: &'static str, pred: P) -> Self
    where
        P: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Self::new(move |value| {
            if pred(value) {
                Ok(value.clone())
            } else {
                Err(ValidationError::new(reason))
            }
        })
    }

    /// Accepts any JSON value
    pub fn any() -> Self {
        Self::new(|value| Ok(value.clone()))
    }
}

impl<T: DeserializeOwned + 'static> Validator<T> {
    /// Accepts payloads that deserialize into `T`
    pub fn typed() -> Self {
        Self::new(|value| {
            T::deserialize(value).map_err(|e| ValidationError::new(e.to_string()))
        })
    }

    /// Like [`Validator::typed`], but the payload must also satisfy `pred`
    pub fn typed_with<P>(reason: &'static str, pred: P) -> Self
    where
        P: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Self::new(move |value| {
            if !pred(value) {
                return Err(ValidationError::new(reason));
            }
            T::deserialize(value).map_err(|e| ValidationError::new(e.to_string()))
        })
    }
}

/// Looks up a nested field by a path of object keys
pub fn at_path<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |v, key| v.get(*key))
}

/// True if `path` leads to a JSON array
pub fn has_array(value: &Value, path: &[&str]) -> bool {
    at_path(value, path).is_some_and(Value::is_array)
}
