//! Roles, pages, and the page access table.
//!
//! `access_rule` is the only place that says which role may see which page.
//! Both the per-page dispatch in `gate::evaluate` and the declarative route
//! table in `gate::routes` read from it.

use serde::{Deserialize, Serialize};

/// User category chosen at login
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Researcher,
    Policymaker,
    Conservationist,
    Admin,
}

impl Role {
    pub const ALL: [Role; 4] = [
        Role::Researcher,
        Role::Policymaker,
        Role::Conservationist,
        Role::Admin,
    ];

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "researcher" => Some(Self::Researcher),
            "policymaker" | "policy-maker" | "policy_maker" => Some(Self::Policymaker),
            "conservationist" => Some(Self::Conservationist),
            "admin" | "administrator" => Some(Self::Admin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Researcher => "researcher",
            Self::Policymaker => "policymaker",
            Self::Conservationist => "conservationist",
            Self::Admin => "admin",
        }
    }

    /// Landing page after login for this role
    pub fn dashboard(&self) -> Page {
        match self {
            Self::Researcher => Page::ResearcherDashboard,
            Self::Policymaker => Page::PolicymakerDashboard,
            Self::Conservationist => Page::ConservationistDashboard,
            Self::Admin => Page::AdminDashboard,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every screen the portal can show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Page {
    Landing,
    Login,
    ResearcherDashboard,
    PolicymakerDashboard,
    PolicyTools,
    ConservationistDashboard,
    ConservationTools,
    AdminDashboard,
    MarineCrimeDetection,
    DataExplorer,
    Analytics,
    Reports,
    OtolithViewer,
    EdnaLab,
    Settings,
    Profile,
    AiQuery,
    ExploreFeatures,
    EnvironmentalFishPrediction,
    FishImageIdentification,
    OtolithImageComparison,
    DigitalTwin,
    DynamicAnalytics,
    MarineMap,
    DataUpload,
    MarineAi,
    MlPredictions,
    ReportGenerator,
}

impl Page {
    pub const ALL: [Page; 28] = [
        Page::Landing,
        Page::Login,
        Page::ResearcherDashboard,
        Page::PolicymakerDashboard,
        Page::PolicyTools,
        Page::ConservationistDashboard,
        Page::ConservationTools,
        Page::AdminDashboard,
        Page::MarineCrimeDetection,
        Page::DataExplorer,
        Page::Analytics,
        Page::Reports,
        Page::OtolithViewer,
        Page::EdnaLab,
        Page::Settings,
        Page::Profile,
        Page::AiQuery,
        Page::ExploreFeatures,
        Page::EnvironmentalFishPrediction,
        Page::FishImageIdentification,
        Page::OtolithImageComparison,
        Page::DigitalTwin,
        Page::DynamicAnalytics,
        Page::MarineMap,
        Page::DataUpload,
        Page::MarineAi,
        Page::MlPredictions,
        Page::ReportGenerator,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Landing => "landing",
            Self::Login => "login",
            Self::ResearcherDashboard => "researcher-dashboard",
            Self::PolicymakerDashboard => "policymaker-dashboard",
            Self::PolicyTools => "policy-tools",
            Self::ConservationistDashboard => "conservationist-dashboard",
            Self::ConservationTools => "conservation-tools",
            Self::AdminDashboard => "admin-dashboard",
            Self::MarineCrimeDetection => "marine-crime-detection",
            Self::DataExplorer => "data-explorer",
            Self::Analytics => "analytics",
            Self::Reports => "reports",
            Self::OtolithViewer => "otolith-viewer",
            Self::EdnaLab => "edna-lab",
            Self::Settings => "settings",
            Self::Profile => "profile",
            Self::AiQuery => "ai-query",
            Self::ExploreFeatures => "explore-features",
            Self::EnvironmentalFishPrediction => "environmental-fish-prediction",
            Self::FishImageIdentification => "fish-image-identification",
            Self::OtolithImageComparison => "otolith-image-comparison",
            Self::DigitalTwin => "digital-twin",
            Self::DynamicAnalytics => "dynamic-analytics",
            Self::MarineMap => "marine-map",
            Self::DataUpload => "data-upload",
            Self::MarineAi => "marine-ai",
            Self::MlPredictions => "ml-predictions",
            Self::ReportGenerator => "report-generator",
        }
    }

    /// Look up a page by identifier. Unknown names fall back to the landing page.
    pub fn parse(name: &str) -> Self {
        Self::lookup(name).unwrap_or(Page::Landing)
    }

    /// Exact lookup, for callers that need to tell "unknown" apart from "landing"
    pub fn lookup(name: &str) -> Option<Self> {
        let name = name.trim().to_lowercase();
        Self::ALL.iter().copied().find(|p| p.as_str() == name)
    }

    /// Canonical URL path, e.g. `/policy-tools`
    pub fn path(&self) -> String {
        format!("/{}", self.as_str())
    }

    /// Accepts `/policy-tools`, `policy-tools`, or `/`
    pub fn from_path(path: &str) -> Self {
        let trimmed = path.trim().trim_start_matches('/').trim_end_matches('/');
        if trimmed.is_empty() {
            return Page::Landing;
        }
        Self::parse(trimmed)
    }
}

impl std::fmt::Display for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who may view a page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessRule {
    /// No session required
    Public,
    /// Any logged-in user
    Authenticated,
    /// Only this exact role
    RequiresRole(Role),
    /// Any logged-in user except this role
    ExcludesRole(Role),
}

impl AccessRule {
    /// `role` is `None` when nobody is logged in
    pub fn permits(&self, role: Option<Role>) -> bool {
        match (self, role) {
            (AccessRule::Public, _) => true,
            (_, None) => false,
            (AccessRule::Authenticated, Some(_)) => true,
            (AccessRule::RequiresRole(required), Some(r)) => *required == r,
            (AccessRule::ExcludesRole(excluded), Some(r)) => *excluded != r,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            AccessRule::Public => "public".to_string(),
            AccessRule::Authenticated => "any logged-in user".to_string(),
            AccessRule::RequiresRole(r) => format!("role = {}", r),
            AccessRule::ExcludesRole(r) => format!("role != {}", r),
        }
    }
}

/// The page access table
pub fn access_rule(page: Page) -> AccessRule {
    match page {
        Page::Landing | Page::Login => AccessRule::Public,
        Page::ResearcherDashboard => AccessRule::RequiresRole(Role::Researcher),
        Page::PolicymakerDashboard | Page::PolicyTools => {
            AccessRule::RequiresRole(Role::Policymaker)
        }
        Page::ConservationistDashboard | Page::ConservationTools => {
            AccessRule::RequiresRole(Role::Conservationist)
        }
        Page::AdminDashboard => AccessRule::RequiresRole(Role::Admin),
        Page::MarineCrimeDetection => AccessRule::ExcludesRole(Role::Researcher),
        Page::DataExplorer
        | Page::Analytics
        | Page::Reports
        | Page::OtolithViewer
        | Page::EdnaLab
        | Page::Settings
        | Page::Profile
        | Page::AiQuery
        | Page::ExploreFeatures
        | Page::EnvironmentalFishPrediction
        | Page::FishImageIdentification
        | Page::OtolithImageComparison
        | Page::DigitalTwin
        | Page::DynamicAnalytics
        | Page::MarineMap
        | Page::DataUpload
        | Page::MarineAi
        | Page::MlPredictions
        | Page::ReportGenerator => AccessRule::Authenticated,
    }
}
