//! Track lifecycle status and the transition rules the track job obeys.
//!
//! Each variant's discriminant matches the seed data order (1-based) in
//! the `track_statuses` lookup table.

use serde::{Deserialize, Serialize};

/// Status ID type matching SMALLINT/SMALLSERIAL in the database.
pub type StatusId = i16;

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:expr => $label:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $val ),+
        }

        impl $name {
            /// Return the database status ID.
            pub fn id(self) -> StatusId {
                self as StatusId
            }

            /// Resolve a database status ID back into a variant.
            pub fn from_id(id: StatusId) -> Option<Self> {
                match id {
                    $( $val => Some(Self::$variant), )+
                    _ => None,
                }
            }

            /// Lowercase label, identical to the serialized form.
            pub fn as_str(self) -> &'static str {
                match self {
                    $( Self::$variant => $label, )+
                }
            }
        }

        impl From<$name> for StatusId {
            fn from(value: $name) -> Self {
                value as StatusId
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

define_status_enum! {
    /// Track processing status.
    ///
    /// `Obtaining` and `Downloading` are reserved: they exist in the lookup
    /// table but the track job never enters them.
    TrackStatus {
        Submitted = 1 => "submitted",
        Generating = 2 => "generating",
        Obtaining = 3 => "obtaining",
        Extending = 4 => "extending",
        Downloading = 5 => "downloading",
        Finalized = 6 => "finalized",
        Error = 7 => "error",
    }
}

impl TrackStatus {
    /// `Finalized` and `Error` admit no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finalized | Self::Error)
    }

    /// Whether the track job may move from `self` to `next`.
    ///
    /// - Nothing leaves a terminal status.
    /// - `Error` is reachable from every non-terminal status.
    /// - `Generating` and `Extending` alternate freely once generation began.
    /// - `Finalized` requires a generation to have happened.
    pub fn can_transition_to(self, next: TrackStatus) -> bool {
        use TrackStatus::*;

        if self.is_terminal() {
            return false;
        }
        match next {
            Error => true,
            Generating => matches!(self, Submitted | Generating | Extending),
            Extending => matches!(self, Generating | Extending),
            Finalized => matches!(self, Generating | Extending),
            Submitted | Obtaining | Downloading => false,
        }
    }
}
