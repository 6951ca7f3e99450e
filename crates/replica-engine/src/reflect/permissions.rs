//! Field access permissions
//!
//! Permission flags describe what a [`FieldGrant`](super::FieldGrant) may
//! do with the field it names. Grants handed out by the class registry carry
//! [`ReflectionPermission::FULL_ACCESS`]; callers may narrow them before
//! passing them on.

use std::fmt;
use std::str::FromStr;

use crate::object::Visibility;

/// Field permission flags (bitflags)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReflectionPermission(u8);

impl ReflectionPermission {
    /// No access
    pub const NONE: Self = Self(0x00);
    /// Read public fields
    pub const READ_PUBLIC: Self = Self(0x01);
    /// Read hidden fields
    pub const READ_PRIVATE: Self = Self(0x02);
    /// Write public fields
    pub const WRITE_PUBLIC: Self = Self(0x04);
    /// Write hidden fields
    pub const WRITE_PRIVATE: Self = Self(0x08);

    // Common combinations
    /// READ_PUBLIC | READ_PRIVATE
    pub const READ_ALL: Self = Self(0x03);
    /// WRITE_PUBLIC | WRITE_PRIVATE
    pub const WRITE_ALL: Self = Self(0x0C);
    /// READ_PUBLIC | WRITE_PUBLIC
    pub const PUBLIC_ONLY: Self = Self(0x05);
    /// Read and write everything
    pub const FULL_ACCESS: Self = Self(0x0F);

    /// Create from raw bits
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & Self::FULL_ACCESS.0)
    }

    /// Get raw bits
    pub const fn bits(&self) -> u8 {
        self.0
    }

    /// Check if permission contains a flag
    pub const fn contains(&self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    /// Union of permissions
    pub const fn union(&self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Intersection of permissions
    pub const fn intersection(&self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    /// Flag needed to read a field of the given visibility
    pub const fn read_flag(visibility: Visibility) -> Self {
        match visibility {
            Visibility::Public => Self::READ_PUBLIC,
            Visibility::Hidden => Self::READ_PRIVATE,
        }
    }

    /// Flag needed to write a field of the given visibility
    pub const fn write_flag(visibility: Visibility) -> Self {
        match visibility {
            Visibility::Public => Self::WRITE_PUBLIC,
            Visibility::Hidden => Self::WRITE_PRIVATE,
        }
    }

    /// Parse combined flags from pipe-separated string (e.g., "READ_PUBLIC|WRITE_PUBLIC")
    pub fn from_combined_str(s: &str) -> Option<Self> {
        s.split('|')
            .map(|part| part.trim().parse::<Self>().ok())
            .try_fold(Self::NONE, |acc, perm| perm.map(|p| acc.union(p)))
    }

    fn name(&self) -> Option<&'static str> {
        Some(match *self {
            Self::NONE => "NONE",
            Self::READ_PUBLIC => "READ_PUBLIC",
            Self::READ_PRIVATE => "READ_PRIVATE",
            Self::WRITE_PUBLIC => "WRITE_PUBLIC",
            Self::WRITE_PRIVATE => "WRITE_PRIVATE",
            Self::READ_ALL => "READ_ALL",
            Self::WRITE_ALL => "WRITE_ALL",
            Self::PUBLIC_ONLY => "PUBLIC_ONLY",
            Self::FULL_ACCESS => "FULL_ACCESS",
            _ => return None,
        })
    }
}

impl Default for ReflectionPermission {
    fn default() -> Self {
        Self::PUBLIC_ONLY
    }
}

impl FromStr for ReflectionPermission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "NONE" => Ok(Self::NONE),
            "READ_PUBLIC" => Ok(Self::READ_PUBLIC),
            "READ_PRIVATE" => Ok(Self::READ_PRIVATE),
            "WRITE_PUBLIC" => Ok(Self::WRITE_PUBLIC),
            "WRITE_PRIVATE" => Ok(Self::WRITE_PRIVATE),
            "READ_ALL" => Ok(Self::READ_ALL),
            "WRITE_ALL" => Ok(Self::WRITE_ALL),
            "PUBLIC_ONLY" => Ok(Self::PUBLIC_ONLY),
            "FULL_ACCESS" => Ok(Self::FULL_ACCESS),
            _ => {
                // Try parsing as hex or decimal
                let parsed = match s.strip_prefix("0x") {
                    Some(hex) => u8::from_str_radix(hex, 16).ok(),
                    None => s.parse::<u8>().ok(),
                };
                parsed
                    .map(Self::from_bits)
                    .ok_or_else(|| format!("unknown permission `{}`", s))
            }
        }
    }
}

impl fmt::Display for ReflectionPermission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "0x{:02X}", self.0),
        }
    }
}
