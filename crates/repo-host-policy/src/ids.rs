//! Actor and resource identifiers.
//!
//! Both are opaque strings. The only rule is that they are not blank, so an
//! evaluator never sees an empty actor or resource.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::PolicyError;

macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Result<Self, PolicyError> {
                let id = id.into();
                if id.trim().is_empty() {
                    return Err(PolicyError::InvalidIdentifier {
                        kind: $kind,
                        reason: "must not be empty".to_string(),
                    });
                }
                Ok(Self(id))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = PolicyError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

identifier!(
    /// An authenticated identity making a request (e.g. a username).
    ActorId,
    "actor"
);

identifier!(
    /// A named repository, the unit roles are attached to.
    ResourceId,
    "resource"
);
