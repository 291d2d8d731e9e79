use std::fmt;

/// Process-wide identifier of a simulated entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(i64);

impl EntityId {
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    /// Entity id `0` is never assigned to a real entity.
    pub fn is_valid(&self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for EntityId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// Schema-defined component type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(u32);

impl ComponentId {
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque id handed out by the transport for every outgoing request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(i64);

impl RequestId {
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub type FieldId = u32;
pub type CommandIndex = u32;
pub type VirtualWorkerId = u32;
pub type PhysicalWorkerName = String;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Authority {
    NotAuthoritative,
    Authoritative,
    AuthorityLossImminent,
}

impl Authority {
    pub fn is_authoritative(self) -> bool {
        // loss-imminent still holds write access until the follow-up op arrives
        matches!(self, Authority::Authoritative | Authority::AuthorityLossImminent)
    }
}

/// Outcome attached to every response op.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StatusCode {
    Success,
    Timeout,
    NotFound,
    AuthorityLost,
    PermissionDenied,
    ApplicationError(String),
    InternalError(String),
}

impl StatusCode {
    pub fn is_success(&self) -> bool {
        *self == StatusCode::Success
    }

    /// Failures after which re-sending the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StatusCode::Timeout | StatusCode::AuthorityLost)
    }
}
