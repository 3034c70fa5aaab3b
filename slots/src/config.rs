/// What a signal does when a slot is connected under a key that is already registered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// Keep the existing registration and report `SignalError::DuplicateRegistration`
    #[default]
    Reject,
    /// Swap in the new slot at the existing position. Connections handed out for the old
    /// registration stop having any effect.
    Replace,
}

/// Per-signal settings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignalConfig {
    /// Only used to label tracing output
    pub name: Option<String>,
    pub duplicate_policy: DuplicatePolicy,
}

impl SignalConfig {
    pub fn new() -> Self { Self::default() }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }
}
