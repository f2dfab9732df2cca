//! Domain/code taxonomy, flags, and default-flag policy.
//!
//! Numeric values are frozen once shipped: any downstream tool that persists
//! or compares raw `Domain`/`Code`/flag values depends on this layout not
//! changing.

use std::fmt;

/// Coarse category of a failure.
///
/// Numeric discriminants are part of the external contract — do not reorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Domain {
    /// No error.
    Ok = 0,
    /// Unclassified.
    Generic = 1,
    /// Allocator failure.
    Allocator = 2,
    /// Git-port operation failure.
    Git = 3,
    /// Policy enforcement failure.
    Policy = 4,
    /// Trust/verification failure.
    Trust = 5,
    /// I/O failure.
    Io = 6,
    /// Configuration failure.
    Config = 7,
}

impl Domain {
    /// Stable symbolic name. `"UNKNOWN"` is never returned for a valid enum
    /// value, but callers that reconstruct a `Domain` from an untrusted
    /// numeric value should treat anything not covered by `from_u8` as
    /// unknown.
    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            Domain::Ok => "OK",
            Domain::Generic => "GENERIC",
            Domain::Allocator => "ALLOCATOR",
            Domain::Git => "GIT",
            Domain::Policy => "POLICY",
            Domain::Trust => "TRUST",
            Domain::Io => "IO",
            Domain::Config => "CONFIG",
        }
    }

    /// Reconstruct a `Domain` from its frozen numeric value.
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Domain::Ok),
            1 => Some(Domain::Generic),
            2 => Some(Domain::Allocator),
            3 => Some(Domain::Git),
            4 => Some(Domain::Policy),
            5 => Some(Domain::Trust),
            6 => Some(Domain::Io),
            7 => Some(Domain::Config),
            _ => None,
        }
    }
}

impl Default for Domain {
    fn default() -> Self {
        Domain::Generic
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Fine-grained failure kind within the taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Code {
    /// No error.
    Ok = 0,
    /// Unclassified.
    Unknown = 1,
    /// Out of memory.
    Oom = 2,
    /// Invalid argument supplied by the caller.
    InvalidArgument = 3,
    /// Requested object not found.
    NotFound = 4,
    /// Conflicting state.
    Conflict = 5,
    /// Permission denied.
    PermissionDenied = 6,
    /// Policy violation.
    PolicyViolation = 7,
    /// Trust violation.
    TrustViolation = 8,
    /// I/O error.
    IoError = 9,
    /// A required dependency is missing.
    DependencyMissing = 10,
}

impl Code {
    /// Stable symbolic name.
    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            Code::Ok => "OK",
            Code::Unknown => "UNKNOWN",
            Code::Oom => "OOM",
            Code::InvalidArgument => "INVALID_ARGUMENT",
            Code::NotFound => "NOT_FOUND",
            Code::Conflict => "CONFLICT",
            Code::PermissionDenied => "PERMISSION_DENIED",
            Code::PolicyViolation => "POLICY_VIOLATION",
            Code::TrustViolation => "TRUST_VIOLATION",
            Code::IoError => "IO_ERROR",
            Code::DependencyMissing => "DEPENDENCY_MISSING",
        }
    }

    /// Reconstruct a `Code` from its frozen numeric value.
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Code::Ok),
            1 => Some(Code::Unknown),
            2 => Some(Code::Oom),
            3 => Some(Code::InvalidArgument),
            4 => Some(Code::NotFound),
            5 => Some(Code::Conflict),
            6 => Some(Code::PermissionDenied),
            7 => Some(Code::PolicyViolation),
            8 => Some(Code::TrustViolation),
            9 => Some(Code::IoError),
            10 => Some(Code::DependencyMissing),
            _ => None,
        }
    }
}

impl Default for Code {
    fn default() -> Self {
        Code::Unknown
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Orthogonal error attributes, combined as a bitset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Flags(u8);

impl Flags {
    /// The failure may succeed if retried.
    pub const RETRYABLE: Flags = Flags(1 << 0);
    /// The failure will never succeed if retried unchanged.
    pub const PERMANENT: Flags = Flags(1 << 1);
    /// The failure relates to authentication/authorization.
    pub const AUTH: Flags = Flags(1 << 2);
    /// No flags set.
    pub const NONE: Flags = Flags(0);

    /// The fixed emission order used by `FormatFlags` and the JSON renderer.
    const ORDERED: [(Flags, &'static str); 3] = [
        (Flags::RETRYABLE, "RETRYABLE"),
        (Flags::PERMANENT, "PERMANENT"),
        (Flags::AUTH, "AUTH"),
    ];

    /// Combine two flag sets.
    #[inline]
    pub const fn union(self, other: Flags) -> Flags {
        Flags(self.0 | other.0)
    }

    /// Whether `flag` is set.
    #[inline]
    pub const fn contains(self, flag: Flags) -> bool {
        self.0 & flag.0 == flag.0
    }

    /// Iterate over set flags in the fixed emission order.
    pub fn iter_names(self) -> impl Iterator<Item = &'static str> {
        Flags::ORDERED
            .into_iter()
            .filter(move |(flag, _)| self.contains(*flag))
            .map(|(_, name)| name)
    }

    /// Write `"NAME|NAME"` (pipe-joined, fixed order) into `buffer`, writing
    /// at most `capacity - 1` bytes plus a terminating NUL, and return the
    /// number of bytes the full, unbounded rendering would require
    /// (excluding the terminating NUL).
    ///
    /// If `capacity` is zero, nothing is written but the required size is
    /// still computed.
    pub fn format_into(self, buffer: Option<&mut [u8]>, capacity: usize) -> usize {
        let mut rendered = String::new();
        for (i, name) in self.iter_names().enumerate() {
            if i > 0 {
                rendered.push('|');
            }
            rendered.push_str(name);
        }
        let required = rendered.len();

        if let Some(buffer) = buffer {
            if capacity > 0 {
                let writable = rendered.len().min(capacity - 1);
                buffer[..writable].copy_from_slice(&rendered.as_bytes()[..writable]);
                buffer[writable] = 0;
            }
        }
        required
    }
}

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for name in self.iter_names() {
            if !first {
                f.write_str("|")?;
            }
            first = false;
            f.write_str(name)?;
        }
        Ok(())
    }
}

/// Compute the default flag set for a domain/code pair per the first-match
/// policy table in the spec.
pub const fn default_flags(domain: Domain, code: Code) -> Flags {
    match domain {
        Domain::Io => return Flags::RETRYABLE,
        Domain::Policy | Domain::Trust => return Flags::PERMANENT,
        _ => {}
    }
    match code {
        Code::Oom | Code::IoError => Flags::RETRYABLE,
        Code::PolicyViolation | Code::TrustViolation | Code::InvalidArgument => Flags::PERMANENT,
        _ => Flags::NONE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_names_round_trip() {
        for value in 0u8..=7 {
            let domain = Domain::from_u8(value).unwrap();
            assert_eq!(Domain::from_u8(domain as u8), Some(domain));
        }
    }

    #[test]
    fn default_flags_follow_policy_table() {
        assert_eq!(default_flags(Domain::Io, Code::Unknown), Flags::RETRYABLE);
        assert_eq!(default_flags(Domain::Policy, Code::Unknown), Flags::PERMANENT);
        assert_eq!(default_flags(Domain::Trust, Code::Unknown), Flags::PERMANENT);
        assert_eq!(default_flags(Domain::Generic, Code::Oom), Flags::RETRYABLE);
        assert_eq!(default_flags(Domain::Generic, Code::IoError), Flags::RETRYABLE);
        assert_eq!(
            default_flags(Domain::Generic, Code::PolicyViolation),
            Flags::PERMANENT
        );
        assert_eq!(
            default_flags(Domain::Generic, Code::TrustViolation),
            Flags::PERMANENT
        );
        assert_eq!(
            default_flags(Domain::Generic, Code::InvalidArgument),
            Flags::PERMANENT
        );
        assert_eq!(default_flags(Domain::Generic, Code::NotFound), Flags::NONE);
        // IO domain takes priority over code-level PERMANENT-implying codes.
        assert_eq!(
            default_flags(Domain::Io, Code::InvalidArgument),
            Flags::RETRYABLE
        );
    }

    #[test]
    fn format_flags_matches_scenario_f() {
        let flags = Flags::PERMANENT.union(Flags::AUTH);
        let mut buffer = [0u8; 32];
        let required = flags.format_into(Some(&mut buffer), 32);
        assert_eq!(required, 14);
        let text = std::str::from_utf8(&buffer[..13]).unwrap();
        assert_eq!(text, "PERMANENT|AUT");
        assert_eq!(&buffer[..15], b"PERMANENT|AUTH\0");
    }

    #[test]
    fn empty_flags_display_as_nothing() {
        assert_eq!(Flags::NONE.to_string(), "");
    }
}
