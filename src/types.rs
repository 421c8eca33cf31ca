//! Shared wire types
//!
//! Status-like fields are open-ended on the provider side, so they are
//! modelled as string newtypes with named constants for the values known
//! today. Unknown values round-trip unchanged and equality ignores case.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;

macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$const_meta:meta])* $konst:ident = $value:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Cow<'static, str>);

        impl $name {
            $(
                $(#[$const_meta])*
                pub const $konst: $name = $name(Cow::Borrowed($value));
            )+

            /// Values known to this client
            pub const KNOWN: &'static [&'static str] = &[$($value),+];

            pub fn new(value: impl Into<String>) -> Self {
                Self(Cow::Owned(value.into()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Whether this is one of the named constants
            pub fn is_known(&self) -> bool {
                Self::KNOWN.iter().any(|k| k.eq_ignore_ascii_case(&self.0))
            }
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                self.0.eq_ignore_ascii_case(&other.0)
            }
        }

        impl Eq for $name {}

        impl std::hash::Hash for $name {
            fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
                for byte in self.0.bytes() {
                    state.write_u8(byte.to_ascii_lowercase());
                }
                state.write_u8(0xff);
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self::new(value)
            }
        }
    };
}

string_enum! {
    /// Zone lifecycle state
    ZoneStatus {
        INITIALIZING = "initializing",
        PENDING = "pending",
        ACTIVE = "active",
        MOVED = "moved",
    }
}

string_enum! {
    /// Zone setup type
    ZoneType {
        FULL = "full",
        PARTIAL = "partial",
        SECONDARY = "secondary",
    }
}

string_enum! {
    DnsRecordType {
        A = "A",
        AAAA = "AAAA",
        CNAME = "CNAME",
        MX = "MX",
        TXT = "TXT",
        NS = "NS",
        SRV = "SRV",
        CAA = "CAA",
        PTR = "PTR",
        HTTPS = "HTTPS",
        SVCB = "SVCB",
    }
}

string_enum! {
    /// Account membership state
    MemberStatus {
        ACCEPTED = "accepted",
        PENDING = "pending",
        REJECTED = "rejected",
    }
}

string_enum! {
    /// R2 storage class
    StorageClass {
        STANDARD = "Standard",
        INFREQUENT_ACCESS = "InfrequentAccess",
    }
}

string_enum! {
    /// Placement hint for R2 buckets and D1 databases
    LocationHint {
        /// Western North America
        WNAM = "wnam",
        /// Eastern North America
        ENAM = "enam",
        /// Western Europe
        WEUR = "weur",
        /// Eastern Europe
        EEUR = "eeur",
        /// Asia-Pacific
        APAC = "apac",
        /// Oceania
        OC = "oc",
    }
}
