/// Page state definitions for tracking analysis progress
use std::fmt;

/// Represents the current state of a page in an audit run
///
/// Transitions are `Pending → Analyzing → {Analyzed | Failed}`. Terminal pages
/// only return to `Pending` through an explicit reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageStatus {
    /// Page has been discovered and is waiting for analysis
    Pending,

    /// Page has been claimed by a batch
    Analyzing,

    /// Page was fetched, extracted and scored
    Analyzed,

    /// Fetch, extraction or analyzer call failed
    Failed,
}

impl PageStatus {
    /// Checks whether the state machine allows moving to `next`
    ///
    /// Resetting to `Pending` is allowed from every state except `Pending` itself.
    pub fn can_transition_to(&self, next: PageStatus) -> bool {
        match (self, next) {
            (Self::Pending, Self::Analyzing) => true,
            (Self::Analyzing, Self::Analyzed | Self::Failed) => true,
            (Self::Analyzing | Self::Analyzed | Self::Failed, Self::Pending) => true,
            _ => false,
        }
    }

    /// Converts the status to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Analyzing => "ANALYZING",
            Self::Analyzed => "ANALYZED",
            Self::Failed => "FAILED",
        }
    }

    /// Parses a status from its database string representation
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(Self::Pending),
            "ANALYZING" => Some(Self::Analyzing),
            "ANALYZED" => Some(Self::Analyzed),
            "FAILED" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Returns all page statuses in state machine order
    pub fn all() -> [Self; 4] {
        [Self::Pending, Self::Analyzing, Self::Analyzed, Self::Failed]
    }
}

impl fmt::Display for PageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

/// Outcome of fetching and extracting a page's HTML
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchStatus {
    NotFetched,
    Fetched,
    FetchFailed,
}

impl FetchStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::NotFetched => "NOT_FETCHED",
            Self::Fetched => "FETCHED",
            Self::FetchFailed => "FETCH_FAILED",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "NOT_FETCHED" => Some(Self::NotFetched),
            "FETCHED" => Some(Self::Fetched),
            "FETCH_FAILED" => Some(Self::FetchFailed),
            _ => None,
        }
    }
}

/// Outcome of the analyzer call for a page
///
/// Kept apart from `FetchStatus` so a page whose HTML was fetched (and whose
/// link/asset/performance rows exist) is distinguishable from one that was
/// never reachable, even though both end up `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalysisStatus {
    NotAttempted,
    Analyzed,
    AnalysisFailed,
}

impl AnalysisStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::NotAttempted => "NOT_ATTEMPTED",
            Self::Analyzed => "ANALYZED",
            Self::AnalysisFailed => "ANALYSIS_FAILED",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "NOT_ATTEMPTED" => Some(Self::NotAttempted),
            "ANALYZED" => Some(Self::Analyzed),
            "ANALYSIS_FAILED" => Some(Self::AnalysisFailed),
            _ => None,
        }
    }
}
