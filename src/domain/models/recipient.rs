use serde::{Deserialize, Serialize};

/// A recipient argument: one identifier or an arbitrarily nested collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    One(String),
    Many(Vec<Target>),
}

impl Target {
    /// Depth-first flattening, preserving order.
    pub fn flatten(self) -> Vec<String> {
        let mut out = Vec::new();
        self.flatten_into(&mut out);
        out
    }

    fn flatten_into(self, out: &mut Vec<String>) {
        match self {
            Target::One(id) => out.push(id),
            Target::Many(targets) => {
                for target in targets {
                    target.flatten_into(out);
                }
            }
        }
    }
}

impl From<&str> for Target {
    fn from(value: &str) -> Self {
        Target::One(value.to_string())
    }
}

impl From<String> for Target {
    fn from(value: String) -> Self {
        Target::One(value)
    }
}

impl<T: Into<Target>> From<Vec<T>> for Target {
    fn from(values: Vec<T>) -> Self {
        Target::Many(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Target>, const N: usize> From<[T; N]> for Target {
    fn from(values: [T; N]) -> Self {
        Target::Many(values.into_iter().map(Into::into).collect())
    }
}

/// Consecutive slice of recipients addressed by one send call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecipientGroup(pub Vec<String>);

impl RecipientGroup {
    pub fn members(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn display(&self) -> String {
        self.0.join(", ")
    }
}
