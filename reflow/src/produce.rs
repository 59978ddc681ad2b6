use crate::ResourceError;

/// Conversion from whatever a producer returns into an attempt outcome.
///
/// Lets producers return a plain value, a `Result`, or an `Option` without
/// wrapping. A producer that fails synchronously (`Err`/`None` before any
/// await) is indistinguishable from one whose future settles with the same
/// outcome.
pub trait ProducerResult<T: Clone> {
    fn into_outcome(self) -> Result<T, ResourceError>;
}

impl<T: Clone> ProducerResult<T> for T {
    fn into_outcome(self) -> Result<T, ResourceError> {
        Ok(self)
    }
}

impl<T: Clone, E> ProducerResult<T> for Result<T, E>
where
    E: ToString,
{
    fn into_outcome(self) -> Result<T, ResourceError> {
        self.map_err(|error| ResourceError::Production(error.to_string()))
    }
}

impl<T: Clone> ProducerResult<T> for Option<T> {
    fn into_outcome(self) -> Result<T, ResourceError> {
        self.ok_or(ResourceError::Empty)
    }
}
