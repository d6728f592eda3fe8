//! Opaque element tokens handed across the managed boundary.

/// Identity of one buffer element as seen by the far side of the bridge.
///
/// The token is bit-identical to the element's address. Native code never
/// turns a token back into a reference; only the comparator on the other
/// side of the boundary interprets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct ElementToken(u64);

impl ElementToken {
    /// Token naming `element` in place.
    #[must_use]
    #[inline]
    pub fn of(element: &i32) -> Self {
        Self(std::ptr::from_ref(element) as usize as u64)
    }

    /// Rebuild a token from a value previously obtained with [`raw`](Self::raw).
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// The token as a JVM `long`.
    #[must_use]
    #[inline]
    pub const fn as_jlong(self) -> i64 {
        self.0 as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_is_the_element_address() {
        let values = [7_i32, 8, 9];
        let token = ElementToken::of(&values[1]);
        assert_eq!(token.raw(), values.as_ptr() as u64 + 4);
    }

    #[test]
    fn jlong_view_preserves_bits() {
        let token = ElementToken::from_raw(u64::MAX - 3);
        assert_eq!(token.as_jlong() as u64, u64::MAX - 3);
        assert_eq!(ElementToken::from_raw(token.raw()), token);
    }

    #[test]
    fn distinct_elements_have_distinct_tokens() {
        let values = [1_i32, 1];
        assert_ne!(ElementToken::of(&values[0]), ElementToken::of(&values[1]));
    }
}
