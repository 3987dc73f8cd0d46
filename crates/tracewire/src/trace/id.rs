//! Trace and span identifiers.

use std::fmt;

use rand::Rng;

/// 128-bit identifier shared by every span of one trace.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TraceId(u128);

impl TraceId {
    pub(crate) fn generate() -> Self {
        let mut rng = rand::thread_rng();
        loop {
            let id: u128 = rng.r#gen();
            if id != 0 {
                return Self(id);
            }
        }
    }

    pub fn from_u128(value: u128) -> Self {
        Self(value)
    }

    pub fn to_u128(self) -> u128 {
        self.0
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

impl fmt::Debug for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TraceId({:032x})", self.0)
    }
}

/// 64-bit identifier of one span within its trace.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpanId(u64);

impl SpanId {
    pub(crate) fn generate() -> Self {
        let mut rng = rand::thread_rng();
        loop {
            let id: u64 = rng.r#gen();
            if id != 0 {
                return Self(id);
            }
        }
    }

    pub fn from_u64(value: u64) -> Self {
        Self(value)
    }

    pub fn to_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl fmt::Debug for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SpanId({:016x})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_nonzero() {
        for _ in 0..32 {
            assert_ne!(TraceId::generate().to_u128(), 0);
            assert_ne!(SpanId::generate().to_u64(), 0);
        }
    }

    #[test]
    fn test_display_is_fixed_width_hex() {
        assert_eq!(TraceId::from_u128(0xab).to_string().len(), 32);
        assert_eq!(SpanId::from_u64(0xab).to_string().len(), 16);
        assert!(TraceId::from_u128(0xab).to_string().ends_with("ab"));
    }
}
