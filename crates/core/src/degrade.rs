use crate::errors::IntegrationError;

/// A value that is always usable, paired with the failure absorbed to produce it.
///
/// Providers whose contract is total (weather, document retrieval) return this
/// instead of `Result`: the fallback value is part of the type, so callers can
/// log the failure kind without ever having to invent a default themselves.
#[derive(Clone, Debug, PartialEq)]
pub struct Degradable<T> {
    pub value: T,
    pub failure: Option<IntegrationError>,
}

impl<T> Degradable<T> {
    pub fn fresh(value: T) -> Self {
        Self { value, failure: None }
    }

    pub fn is_degraded(&self) -> bool {
        self.failure.is_some()
    }

    pub fn into_value(self) -> T {
        self.value
    }
}

impl<T: Default> Degradable<T> {
    pub fn degraded(failure: IntegrationError) -> Self {
        Self { value: T::default(), failure: Some(failure) }
    }

    /// Collapses a fallible fetch into the documented default.
    pub fn from_result(result: Result<T, IntegrationError>) -> Self {
        match result {
            Ok(value) => Self::fresh(value),
            Err(failure) => Self::degraded(failure),
        }
    }
}
