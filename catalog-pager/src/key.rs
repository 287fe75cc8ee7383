use core::fmt;

/// Identity of a cached query: the operation name followed by its parameters.
///
/// Two keys are equal when every segment is equal, so `["category", "fire"]` and
/// `["category", "water"]` are cached independently.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QueryKey(Vec<String>);

impl QueryKey {
    pub fn new(operation: impl Into<String>) -> Self {
        Self(vec![operation.into()])
    }

    /// Appends a parameter segment.
    pub fn with(mut self, param: impl ToString) -> Self {
        self.0.push(param.to_string());
        self
    }

    pub fn operation(&self) -> &str {
        self.0.first().map_or("", String::as_str)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

impl<const N: usize> From<[&str; N]> for QueryKey {
    fn from(segments: [&str; N]) -> Self {
        Self(segments.iter().map(|s| (*s).to_owned()).collect())
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{segment:?}")?;
        }
        f.write_str("]")
    }
}

impl fmt::Debug for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QueryKey{self}")
    }
}
