//! Macro for implementing string conversions on label enums
//!
//! Label enums (refresh kinds, refresh sources, ministry tags) are stored as
//! TEXT columns and travel over the wire as lowercase strings. This macro
//! keeps the column value, the `Display` output and the `FromStr` parser in
//! one table so they cannot drift apart.
//!
//! # Example
//!
//! ```rust
//! use steeple_domain::impl_label_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Visibility {
//!     Public,
//!     Hidden,
//! }
//!
//! impl_label_conversions!(Visibility {
//!     Public => "public",
//!     Hidden => "hidden",
//! });
//!
//! assert_eq!(Visibility::Hidden.as_str(), "hidden");
//! assert_eq!("PUBLIC".parse::<Visibility>(), Ok(Visibility::Public));
//! ```

/// Implements `as_str`, `Display` and `FromStr` for a label enum
///
/// Parsing is case-insensitive and ignores surrounding whitespace. The error
/// message names the enum so a bad database row is easy to trace.
#[macro_export]
macro_rules! impl_label_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl $enum_name {
            /// Canonical lowercase label
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
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

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}
