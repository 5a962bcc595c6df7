use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Customer data (names, emails) that must not leak into logs.
///
/// `Debug` prints a fixed mask, `Display` prints a partial form that is
/// still useful when correlating support requests. Serialization writes the
/// real value because API responses need it.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Masked<T>(pub T);

impl<T> Masked<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }

    pub fn expose(&self) -> &T {
        &self.0
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T: AsRef<str>> fmt::Debug for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "********")
    }
}

impl<T: AsRef<str>> fmt::Display for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&partial(self.0.as_ref()))
    }
}

impl<T: Serialize> Serialize for Masked<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl From<String> for Masked<String> {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// `jane@example.com` -> `j***@example.com`, `Jane Doe` -> `J***`.
fn partial(value: &str) -> String {
    let first = match value.chars().next() {
        Some(c) => c,
        None => return String::new(),
    };
    match value.split_once('@') {
        Some((_, domain)) => format!("{}***@{}", first, domain),
        None => format!("{}***", first),
    }
}
