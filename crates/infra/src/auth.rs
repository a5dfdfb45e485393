use subtle::ConstantTimeEq;

/// Decides whether a presented admin key grants moderator access.
pub trait AdminCredentials: Send + Sync {
    fn verify(&self, presented: &str) -> bool;
}

/// A single shared secret from configuration. An empty secret disables admin
/// access entirely.
#[derive(Clone)]
pub struct StaticAdminSecret {
    secret: Vec<u8>,
}

impl StaticAdminSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into().trim().as_bytes().to_vec(),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.secret.is_empty()
    }
}

impl std::fmt::Debug for StaticAdminSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticAdminSecret")
            .field("configured", &self.is_configured())
            .finish()
    }
}

impl AdminCredentials for StaticAdminSecret {
    fn verify(&self, presented: &str) -> bool {
        if !self.is_configured() {
            return false;
        }
        let presented = presented.as_bytes();
        presented.len() == self.secret.len() && bool::from(presented.ct_eq(&self.secret))
    }
}

/// Compares two keys without an early exit on the first differing byte.
pub fn constant_time_eq(left: &str, right: &str) -> bool {
    left.len() == right.len() && bool::from(left.as_bytes().ct_eq(right.as_bytes()))
}
