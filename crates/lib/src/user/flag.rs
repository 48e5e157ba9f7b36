//! Boolean user fields.

/// A stored boolean field.
///
/// Persisted as the literal strings `"true"` and `"false"`; an absent field is
/// [`Flag::Unset`]. Anything other than `"true"` reads as [`Flag::False`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Flag {
    #[default]
    Unset,
    False,
    True,
}

impl Flag {
    /// Parse a raw field value.
    pub fn from_stored(raw: Option<&str>) -> Self {
        match raw {
            None => Flag::Unset,
            Some("true") => Flag::True,
            Some(_) => Flag::False,
        }
    }

    /// The string written to storage for `value`.
    pub fn stored(value: bool) -> &'static str {
        if value { "true" } else { "false" }
    }

    pub fn is_true(self) -> bool {
        self == Flag::True
    }
}

impl From<bool> for Flag {
    fn from(value: bool) -> Self {
        if value { Flag::True } else { Flag::False }
    }
}
