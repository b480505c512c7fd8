//! Shared types for the Cofund domain

/// Declares a fieldless enum whose variants map one-to-one onto stable
/// snake_case names used on the wire, in the database and in role files.
macro_rules! named_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident : $err:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $text:literal, )+
        }
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
            serde::Serialize, serde::Deserialize,
        )]
        $vis enum $name {
            $( $(#[$vmeta])* #[serde(rename = $text)] $variant, )+
        }

        impl $name {
            /// Every variant, in declaration order
            pub const ALL: &'static [$name] = &[ $( $name::$variant, )+ ];

            /// Stable snake_case name
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $( $name::$variant => $text, )+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::error::CoreError;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                match s {
                    $( $text => Ok($name::$variant), )+
                    other => Err($crate::error::CoreError::$err(other.to_string())),
                }
            }
        }
    };
}

pub mod details;
pub mod entity;
pub mod permission;
pub mod user;

// Re-export commonly used types
pub use details::{
    field_errors, CashoutDetails, ContributionDetails, EnrollmentDetails, EntityDetails,
    FieldError, HealthClaimDetails, LoanDetails, MemberDetails,
};
pub use entity::{EntityKind, Status, Transition};
pub use permission::{Permission, PermissionSet};
pub use user::ActingUser;

/// User identifier issued by the identity provider
pub type UserId = String;

/// Member identifier (the id of the member's own entity record)
pub type MemberId = uuid::Uuid;

/// Workflow entity identifier
pub type EntityId = uuid::Uuid;
