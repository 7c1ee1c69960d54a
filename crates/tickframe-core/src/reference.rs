use std::fmt::{Display, Formatter};

/// Address of a series inside a [`Dataset`](crate::Dataset).
///
/// Features and ratios name their inputs through this type; the dataset
/// resolves each reference once the referenced member is ready.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SeriesRef {
    /// A registered column of a registered symbol.
    Column { symbol: String, column: String },
    /// A registered feature.
    Feature(String),
    /// A registered ratio.
    Ratio(String),
}

impl SeriesRef {
    pub fn column(symbol: impl Into<String>, column: impl Into<String>) -> Self {
        Self::Column {
            symbol: symbol.into(),
            column: column.into(),
        }
    }

    pub fn feature(name: impl Into<String>) -> Self {
        Self::Feature(name.into())
    }

    pub fn ratio(name: impl Into<String>) -> Self {
        Self::Ratio(name.into())
    }

    /// Whether this reference points at a feature or ratio.
    pub const fn is_derived(&self) -> bool {
        !matches!(self, Self::Column { .. })
    }
}

impl Display for SeriesRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Column { symbol, column } => write!(f, "{symbol}.{column}"),
            Self::Feature(name) => write!(f, "feature:{name}"),
            Self::Ratio(name) => write!(f, "ratio:{name}"),
        }
    }
}
