use thiserror::Error;

/// Observable snapshot of an [`crate::AsyncResource`].
///
/// The variant layout carries the invariants: a value is present only in
/// `Resolved` and `Reloading`, an error only in `Error`, and `Idle` holds
/// neither. `Reloading` retains the previous resolved value while a refresh
/// attempt is in flight (stale-while-revalidate).
#[derive(Debug, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ResourceState<T: Clone> {
    Idle,
    Loading,
    Reloading(T),
    Resolved(T),
    Error(ResourceError),
}

/// Field-less mirror of [`ResourceState`] for renderers and assertions that
/// only care about the phase.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Status {
    Idle,
    Loading,
    Reloading,
    Resolved,
    Error,
}

#[derive(Error, Debug, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ResourceError {
    #[error("{0}")]
    Production(String),
    #[error("producer returned no value")]
    Empty,
}

/// Setup-time contract violation in the composition helpers. Never stored in
/// [`ResourceState`]; surfaced synchronously from the constructor that was
/// misused.
#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum ComposeError {
    #[error("composition requires at least one source")]
    NoSources,
    #[error("duplicate key: {0}")]
    DuplicateKey(String),
}

impl ResourceError {
    pub fn production(message: impl Into<String>) -> Self {
        ResourceError::Production(message.into())
    }

    pub fn is_production(&self) -> bool {
        matches!(self, ResourceError::Production(_))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, ResourceError::Empty)
    }
}

impl<T: Clone> ResourceState<T> {
    pub fn status(&self) -> Status {
        match self {
            ResourceState::Idle => Status::Idle,
            ResourceState::Loading => Status::Loading,
            ResourceState::Reloading(_) => Status::Reloading,
            ResourceState::Resolved(_) => Status::Resolved,
            ResourceState::Error(_) => Status::Error,
        }
    }

    /// True while an attempt is in flight, whether or not a stale value is
    /// still being shown.
    pub fn is_loading(&self) -> bool {
        matches!(self, ResourceState::Loading | ResourceState::Reloading(_))
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, ResourceState::Idle)
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, ResourceState::Resolved(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ResourceState::Error(_))
    }

    /// An attempt has settled, successfully or not.
    pub fn is_settled(&self) -> bool {
        matches!(self, ResourceState::Resolved(_) | ResourceState::Error(_))
    }

    pub fn value_ref(&self) -> Option<&T> {
        match self {
            ResourceState::Reloading(value) => Some(value),
            ResourceState::Resolved(value) => Some(value),
            _ => None,
        }
    }

    pub fn value(self) -> Option<T> {
        match self {
            ResourceState::Reloading(value) => Some(value),
            ResourceState::Resolved(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ResourceError> {
        match self {
            ResourceState::Error(error) => Some(error),
            _ => None,
        }
    }

    /// Transition target when a new attempt starts: a currently retained
    /// value survives into `Reloading`, everything else becomes `Loading`.
    pub(crate) fn into_loading(self) -> Self {
        match self {
            ResourceState::Resolved(value) => ResourceState::Reloading(value),
            ResourceState::Reloading(value) => ResourceState::Reloading(value),
            _ => ResourceState::Loading,
        }
    }
}

impl<T: Clone> Default for ResourceState<T> {
    fn default() -> Self {
        ResourceState::Idle
    }
}

impl<T: Clone> From<&ResourceState<T>> for Option<T> {
    fn from(state: &ResourceState<T>) -> Self {
        state.value_ref().cloned()
    }
}
