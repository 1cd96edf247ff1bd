//! Caller identity
//!
//! A caller is known to the service only by the numeric uid the kernel
//! attached to the IPC transaction. The platform maps that uid back to
//! the package (or packages, under a shared uid) it was assigned to.

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// OS-assigned process identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Uid(pub u32);

impl From<u32> for Uid {
    fn from(raw: u32) -> Self {
        Uid(raw)
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Uid {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Uid)
    }
}

/// Maps a uid to the packages that run under it
pub trait CallerResolver {
    /// Package names for `uid`, `None` if the platform knows no package for it.
    ///
    /// More than one name is returned only for shared uids.
    fn packages_for_uid(&self, uid: Uid) -> Option<Vec<String>>;
}

/// Source of the uid of the process currently calling into the service
pub trait CallingUid {
    fn calling_uid(&self) -> Uid;
}

impl CallingUid for Uid {
    fn calling_uid(&self) -> Uid {
        *self
    }
}

impl<T: CallerResolver + ?Sized> CallerResolver for &T {
    fn packages_for_uid(&self, uid: Uid) -> Option<Vec<String>> {
        (**self).packages_for_uid(uid)
    }
}

impl<T: CallerResolver + ?Sized> CallerResolver for Arc<T> {
    fn packages_for_uid(&self, uid: Uid) -> Option<Vec<String>> {
        (**self).packages_for_uid(uid)
    }
}

impl<T: CallingUid + ?Sized> CallingUid for &T {
    fn calling_uid(&self) -> Uid {
        (**self).calling_uid()
    }
}
