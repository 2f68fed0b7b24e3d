//! Closed-set token parsing
//!
//! Card values, card suits and action types are all lowercase string tokens
//! on the wire, matched case-insensitively. The [`closed_set!`] macro
//! generates the enum together with its token table, `FromStr`, `Display`
//! and serde implementations so that every such field rejects unknown tokens
//! with the same [`ValidationError::InvalidEnumValue`].

use crate::error::ValidationError;

/// An enum whose values are drawn from a fixed table of string tokens
pub trait ClosedSet: Sized + Copy + 'static {
    /// Field name reported when a token is rejected
    const FIELD: &'static str;

    /// Every variant paired with its canonical token
    const VARIANTS: &'static [(&'static str, Self)];

    /// Canonical token for this value
    fn token(self) -> &'static str;

    /// Parse a token, reporting the default field name on failure
    fn parse_token(token: &str) -> Result<Self, ValidationError> {
        Self::parse_token_for(token, Self::FIELD)
    }

    /// Parse a token, reporting `field` on failure
    fn parse_token_for(token: &str, field: &str) -> Result<Self, ValidationError> {
        Self::VARIANTS
            .iter()
            .find(|(candidate, _)| candidate.eq_ignore_ascii_case(token))
            .map(|(_, value)| *value)
            .ok_or_else(|| ValidationError::InvalidEnumValue {
                field: field.to_string(),
                token: token.to_string(),
            })
    }

    /// All canonical tokens, in declaration order
    fn tokens() -> Vec<&'static str> {
        Self::VARIANTS.iter().map(|(token, _)| *token).collect()
    }
}

/// Declare a closed-set enum backed by lowercase string tokens.
///
/// ```ignore
/// closed_set! {
///     /// Poker action
///     pub enum ActionType: "action type" {
///         Fold => "fold",
///         Call => "call",
///     }
/// }
/// ```
#[macro_export]
macro_rules! closed_set {
    (
        $(#[$meta:meta])*
        pub enum $name:ident : $field:literal {
            $($variant:ident => $token:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $name {
            $($variant),+
        }

        impl $crate::model::token::ClosedSet for $name {
            const FIELD: &'static str = $field;
            const VARIANTS: &'static [(&'static str, Self)] = &[$(($token, $name::$variant)),+];

            fn token(self) -> &'static str {
                match self {
                    $($name::$variant => $token),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::error::ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                <Self as $crate::model::token::ClosedSet>::parse_token(s)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(<Self as $crate::model::token::ClosedSet>::token(*self))
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(<Self as $crate::model::token::ClosedSet>::token(*self))
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let token = <std::borrow::Cow<'de, str> as serde::Deserialize>::deserialize(deserializer)?;
                <Self as $crate::model::token::ClosedSet>::parse_token(&token)
                    .map_err(serde::de::Error::custom)
            }
        }
    };
}
