//! Macro for implementing Display and FromStr for closed string enums
//!
//! Wire-facing enums (message roles, pipeline stages) are rendered as stable
//! lowercase identifiers and parsed case-insensitively.
//!
//! # Example
//!
//! ```rust
//! use calpilot_domain::impl_domain_enum_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Channel {
//!     Voice,
//!     Http,
//! }
//!
//! impl_domain_enum_conversions!(Channel {
//!     Voice => "voice",
//!     Http => "http",
//! });
//!
//! assert_eq!(Channel::Voice.to_string(), "voice");
//! assert_eq!("HTTP".parse::<Channel>(), Ok(Channel::Http));
//! ```

/// Implements Display and FromStr for a fieldless enum.
///
/// Parsing trims surrounding whitespace and ignores case; errors name the
/// enum and echo the rejected input.
#[macro_export]
macro_rules! impl_domain_enum_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl $enum_name {
            /// Stable identifier used on the wire and in logs.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $str,)+
                }
            }
        }

        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}
