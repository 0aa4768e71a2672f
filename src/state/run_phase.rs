use std::fmt;

/// Phase of an audit run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunPhase {
    /// Robots and sitemaps are being resolved
    Discovering,

    /// A batch of pages is being analyzed
    Analyzing,

    /// No batch in flight; remaining pages wait for the next scan
    Idle,
}

impl RunPhase {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Discovering => "DISCOVERING",
            Self::Analyzing => "ANALYZING",
            Self::Idle => "IDLE",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "DISCOVERING" => Some(Self::Discovering),
            "ANALYZING" => Some(Self::Analyzing),
            "IDLE" => Some(Self::Idle),
            _ => None,
        }
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
