//! Status helper enums mapping to SMALLINT lookup tables.
//!
//! Each enum variant's discriminant matches the seed data order (1-based)
//! in the corresponding `*_statuses` database table.

use benchyard_core::error::CoreError;

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
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $val ),+
        }

        impl $name {
            /// All variants in discriminant order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Return the database status ID.
            pub fn id(self) -> StatusId {
                self as StatusId
            }

            /// Lowercase name as stored in the lookup table.
            pub fn name(self) -> &'static str {
                match self {
                    $( $name::$variant => $label ),+
                }
            }

            /// Resolve a database status ID.
            pub fn from_id(id: StatusId) -> Option<Self> {
                Self::ALL.iter().copied().find(|s| s.id() == id)
            }

            /// Resolve a lookup-table name (case-insensitive).
            pub fn from_name(name: &str) -> Option<Self> {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|s| s.name().eq_ignore_ascii_case(name))
            }
        }

        impl From<$name> for StatusId {
            fn from(value: $name) -> Self {
                value as StatusId
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

define_status_enum! {
    /// Benchmark run lifecycle status.
    RunStatus {
        Pending = 1 => "pending",
        Running = 2 => "running",
        Success = 3 => "success",
        Fail = 4 => "fail",
        Finished = 5 => "finished",
    }
}

impl RunStatus {
    /// Statuses that block a new run from starting.
    pub const BUSY: [RunStatus; 3] = [RunStatus::Running, RunStatus::Success, RunStatus::Fail];

    /// Statuses whose infrastructure still has to be destroyed.
    pub const AWAITING_TEARDOWN: [RunStatus; 2] = [RunStatus::Success, RunStatus::Fail];

    /// Whether moving from `self` to `next` is a legal lifecycle step.
    pub fn can_transition_to(self, next: RunStatus) -> bool {
        use RunStatus::*;
        matches!(
            (self, next),
            (Pending, Running)
                | (Running, Success)
                | (Running, Fail)
                | (Success, Fail)
                | (Success, Finished)
                | (Fail, Fail)
                | (Fail, Finished)
        )
    }

    /// Validate a lifecycle step, producing a transition the store can apply.
    pub fn transition_to(self, next: RunStatus) -> Result<StatusTransition, CoreError> {
        if self.can_transition_to(next) {
            Ok(StatusTransition {
                from: self,
                to: next,
            })
        } else {
            Err(CoreError::InvalidTransition {
                from: self.name(),
                to: next.name(),
            })
        }
    }
}

/// A validated `from -> to` status change.
///
/// Only constructible through [`RunStatus::transition_to`], so the store
/// never receives an illegal step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusTransition {
    from: RunStatus,
    to: RunStatus,
}

impl StatusTransition {
    pub fn from(self) -> RunStatus {
        self.from
    }

    pub fn to(self) -> RunStatus {
        self.to
    }
}
