//! crates/guroosh_core/src/lib.rs
//!
//! The pure core of the Guroosh backend: entities, typed patches, workflow rules,
//! ledger and portfolio arithmetic, and the storage ports the service implements.

/// Declares a fieldless enum whose variants map one-to-one onto fixed strings.
///
/// The strings are used for JSON, for database columns and for `FromStr`, so the
/// three representations can never drift apart.
macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident { $($variant:ident => $text:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ::serde::Serialize, ::serde::Deserialize)]
        $vis enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = $crate::UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err($crate::UnknownVariant {
                        kind: stringify!($name),
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

pub mod domain;
pub mod ledger;
pub mod portfolio;
pub mod ports;
pub mod workflow;

/// Returned when a stored or submitted string does not name a known enum variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{value}' is not a valid {kind}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Rejects strings that are empty once surrounding whitespace is removed.
pub fn not_blank(value: &str) -> Result<(), validator::ValidationError> {
    if value.trim().is_empty() {
        Err(validator::ValidationError::new("blank"))
    } else {
        Ok(())
    }
}

pub use domain::{
    AdviceRequest, AdvisorProfile, Audience, Availability, ConnectionRequest, ConnectionStatus,
    Meeting, MeetingStatus, Message, Note, Notification, NotificationKind, Participant,
    RequestStatus, Role, Theme, User, UserCredentials, UserSettings,
};
pub use ledger::{Budget, Category, Expense, Goal, Income, Ledger, LedgerEntry};
pub use portfolio::{Investment, InvestmentCategory};
pub use ports::{
    AdvisoryStore, LedgerDocument, LedgerStore, NotificationStore, PortError, PortResult,
    UserStore,
};
pub use workflow::TransitionError;
