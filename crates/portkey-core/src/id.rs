use serde::{Deserialize, Serialize};
use std::fmt::Display;

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

numeric_id!(
    /// Primary key of a [`ShortUrl`](crate::ShortUrl).
    UrlId
);

numeric_id!(
    /// Primary key of a [`ClickEvent`](crate::ClickEvent).
    ClickId
);

numeric_id!(
    /// Identifier of an account, as issued by the external auth service.
    OwnerId
);
