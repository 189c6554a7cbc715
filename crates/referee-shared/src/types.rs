use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseEnumError;

/// Declares a closed, string-backed enum with its canonical wire name.
///
/// The canonical name is what gets persisted and what serde reads and writes,
/// so an unrecognised value is an error everywhere rather than a silently
/// dropped field.
macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal {
            $( $(#[$vmeta:meta])* $variant:ident => $wire:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $wire)] $variant ),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $( $name::$variant => $wire ),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $wire => Ok($name::$variant), )+
                    other => Err(ParseEnumError::new($kind, other)),
                }
            }
        }
    };
}

string_enum! {
    /// Overall lifecycle state of a manuscript revision.
    DraftStatus, "draft status" {
        New => "NEW",
        Draft => "DRAFT",
        Pending => "PENDING",
        Denied => "DENIED",
        Confirmed => "CONFIRMED",
        Published => "PUBLISHED",
        BackForCorrection => "BACK_FOR_CORRECTION",
    }
}

string_enum! {
    /// Which actor currently owns a manuscript.
    Step, "step" {
        Author => "AUTHOR",
        Editor => "EDITOR",
        Reviewer => "REVIEWER",
    }
}

string_enum! {
    /// Outcome of an editor check.
    CheckStatus, "check status" {
        New => "NEW",
        Pending => "PENDING",
        Rejected => "REJECTED",
        RejectedWithCorrection => "REJECTED_WITH_CORRECTION",
        Approved => "APPROVED",
        ApprovedWithCorrection => "APPROVED_WITH_CORRECTION",
    }
}

string_enum! {
    /// Channel an editor check was recorded on.
    CheckType, "check type" {
        Editor => "EDITOR",
        Reviewer => "REVIEWER",
    }
}

string_enum! {
    /// State of a reviewer assignment.
    ReviewStatus, "review status" {
        Pending => "PENDING",
        Approved => "APPROVED",
        Rejected => "REJECTED",
    }
}

string_enum! {
    /// Content section a file (or a comment on a file) belongs to.
    FileKind, "file kind" {
        Manuscript => "MANUSCRIPT",
        CoverLetter => "COVER_LETTER",
        Supplemental => "SUPPLEMENTAL",
        Other => "OTHER",
    }
}

string_enum! {
    /// Journal-scoped role held by a user.
    Role, "role" {
        Author => "AUTHOR",
        Editor => "EDITOR",
        Reviewer => "REVIEWER",
    }
}

impl Default for DraftStatus {
    fn default() -> Self {
        Self::New
    }
}

impl Default for CheckType {
    fn default() -> Self {
        Self::Editor
    }
}
