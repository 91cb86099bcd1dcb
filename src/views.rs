//! Screens.
//!
//! A view gets the session user (always present for protected pages) and the
//! language, and produces a `Frame`: a title, body lines, and the pages it
//! links to. Links are the only way a view asks for a page change; the shell
//! turns a chosen link into `Event::Navigate`. Figures on analytic screens
//! are simulated.

use crate::i18n::{t, Language};
use crate::role::{access_rule, Page, Role};
use crate::session::User;
use rand::Rng;

pub struct ViewContext<'a> {
    pub user: Option<&'a User>,
    pub language: Language,
}

/// A rendered screen
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub page: Page,
    pub title: String,
    pub lines: Vec<String>,
    pub links: Vec<Page>,
}

/// A simulated reading: label, low, high, unit
type Metric = (&'static str, f64, f64, &'static str);

struct ViewSpec {
    summary: &'static str,
    links: &'static [Page],
    metrics: &'static [Metric],
}

fn view_spec(page: Page) -> ViewSpec {
    use Page::*;
    match page {
        Landing => ViewSpec {
            summary: "Integrated oceanographic, fisheries and biodiversity data for India's EEZ.",
            links: &[Login, ExploreFeatures],
            metrics: &[],
        },
        Login => ViewSpec {
            summary: "Choose your role and sign in to continue.",
            links: &[Landing],
            metrics: &[],
        },
        ResearcherDashboard => ViewSpec {
            summary: "Survey datasets, species records and lab pipelines.",
            links: &[
                DataExplorer,
                OtolithViewer,
                EdnaLab,
                MarineMap,
                AiQuery,
                DataUpload,
                Analytics,
                Profile,
            ],
            metrics: &[
                ("Active datasets", 120.0, 180.0, ""),
                ("Species records", 24_000.0, 31_000.0, ""),
                ("eDNA samples queued", 5.0, 40.0, ""),
            ],
        },
        PolicymakerDashboard => ViewSpec {
            summary: "Stock status, regulation impact and compliance overview.",
            links: &[
                PolicyTools,
                MarineCrimeDetection,
                Reports,
                ReportGenerator,
                DynamicAnalytics,
                MarineMap,
                Profile,
            ],
            metrics: &[
                ("Stocks assessed as sustainable", 55.0, 75.0, "%"),
                ("Open compliance cases", 8.0, 30.0, ""),
            ],
        },
        PolicyTools => ViewSpec {
            summary: "Scenario modelling for catch limits and seasonal closures.",
            links: &[PolicymakerDashboard, ReportGenerator],
            metrics: &[
                ("Projected biomass change", -8.0, 12.0, "%"),
                ("Projected landings change", -15.0, 5.0, "%"),
            ],
        },
        ConservationistDashboard => ViewSpec {
            summary: "Protected areas, threatened species and restoration work.",
            links: &[
                ConservationTools,
                MarineCrimeDetection,
                MarineMap,
                EdnaLab,
                Reports,
                Profile,
            ],
            metrics: &[
                ("Coral cover", 18.0, 42.0, "%"),
                ("Threatened species sighted", 3.0, 19.0, ""),
            ],
        },
        ConservationTools => ViewSpec {
            summary: "Habitat health scoring and protected-area planning.",
            links: &[ConservationistDashboard, MarineMap],
            metrics: &[("Habitat health index", 0.4, 0.9, "")],
        },
        AdminDashboard => ViewSpec {
            summary: "Platform users, ingestion jobs and system health.",
            links: &[
                DataUpload,
                Settings,
                MarineCrimeDetection,
                Analytics,
                Reports,
                Profile,
            ],
            metrics: &[
                ("Registered users", 300.0, 900.0, ""),
                ("Ingestion jobs today", 10.0, 60.0, ""),
                ("Storage used", 40.0, 85.0, "%"),
            ],
        },
        MarineCrimeDetection => ViewSpec {
            summary: "Vessel tracks flagged for possible illegal fishing.",
            links: &[MarineMap, Reports],
            metrics: &[
                ("AIS gaps over 6h", 2.0, 25.0, ""),
                ("Vessels inside closed zones", 0.0, 9.0, ""),
            ],
        },
        DataExplorer => ViewSpec {
            summary: "Browse oceanographic, fisheries and molecular datasets.",
            links: &[Analytics, DataUpload],
            metrics: &[("Records matching filters", 1_000.0, 50_000.0, "")],
        },
        Analytics => ViewSpec {
            summary: "Cross-dataset trends and correlations.",
            links: &[DynamicAnalytics, Reports],
            metrics: &[
                ("SST vs catch correlation", -0.6, 0.6, ""),
                ("Mean chlorophyll-a", 0.1, 2.5, "mg/m3"),
            ],
        },
        Reports => ViewSpec {
            summary: "Published and draft reports.",
            links: &[ReportGenerator],
            metrics: &[],
        },
        OtolithViewer => ViewSpec {
            summary: "Otolith morphometrics and age estimates.",
            links: &[OtolithImageComparison],
            metrics: &[
                ("Estimated age", 1.0, 12.0, "years"),
                ("Otolith length", 3.0, 18.0, "mm"),
            ],
        },
        EdnaLab => ViewSpec {
            summary: "Environmental DNA samples and detected taxa.",
            links: &[DataUpload, Analytics],
            metrics: &[
                ("Taxa detected", 12.0, 140.0, ""),
                ("Read depth", 20_000.0, 250_000.0, ""),
            ],
        },
        Settings => ViewSpec {
            summary: "Language and display preferences.",
            links: &[Profile],
            metrics: &[],
        },
        Profile => ViewSpec {
            summary: "Your account.",
            links: &[Settings],
            metrics: &[],
        },
        AiQuery => ViewSpec {
            summary: "Ask questions about the portal's datasets in plain language.",
            links: &[MarineAi],
            metrics: &[],
        },
        ExploreFeatures => ViewSpec {
            summary: "A tour of the portal's tools.",
            links: &[
                EnvironmentalFishPrediction,
                FishImageIdentification,
                OtolithImageComparison,
                DigitalTwin,
                DynamicAnalytics,
                MlPredictions,
            ],
            metrics: &[],
        },
        EnvironmentalFishPrediction => ViewSpec {
            summary: "Species occurrence likelihood from ocean conditions.",
            links: &[MlPredictions, MarineMap],
            metrics: &[
                ("Sea surface temperature", 24.0, 31.0, "C"),
                ("Occurrence probability", 0.05, 0.95, ""),
            ],
        },
        FishImageIdentification => ViewSpec {
            summary: "Identify species from a photograph.",
            links: &[MarineAi],
            metrics: &[("Top match confidence", 0.55, 0.99, "")],
        },
        OtolithImageComparison => ViewSpec {
            summary: "Compare otolith outlines against reference shapes.",
            links: &[OtolithViewer],
            metrics: &[("Shape similarity", 0.6, 0.98, "")],
        },
        DigitalTwin => ViewSpec {
            summary: "Simulated ocean state for the Arabian Sea.",
            links: &[DynamicAnalytics, MarineMap],
            metrics: &[
                ("Mixed layer depth", 10.0, 80.0, "m"),
                ("Surface current", 0.1, 1.2, "m/s"),
            ],
        },
        DynamicAnalytics => ViewSpec {
            summary: "Live-updating indicators.",
            links: &[Analytics],
            metrics: &[
                ("Dissolved oxygen", 3.5, 7.5, "mg/L"),
                ("Salinity", 33.0, 36.5, "PSU"),
            ],
        },
        MarineMap => ViewSpec {
            summary: "Survey stations, vessel tracks and protected areas.",
            links: &[DataExplorer],
            metrics: &[("Stations reporting", 40.0, 120.0, "")],
        },
        DataUpload => ViewSpec {
            summary: "Upload CSV, NetCDF or FASTA files for ingestion.",
            links: &[DataExplorer],
            metrics: &[],
        },
        MarineAi => ViewSpec {
            summary: "Model-assisted insights across datasets.",
            links: &[AiQuery, MlPredictions],
            metrics: &[],
        },
        MlPredictions => ViewSpec {
            summary: "Forecasts for catch, biomass and spawning.",
            links: &[EnvironmentalFishPrediction],
            metrics: &[
                ("Next-season catch forecast", 40_000.0, 90_000.0, "t"),
                ("Model skill", 0.5, 0.9, ""),
            ],
        },
        ReportGenerator => ViewSpec {
            summary: "Assemble a report from saved analyses.",
            links: &[Reports],
            metrics: &[],
        },
    }
}

fn format_value(value: f64, unit: &str) -> String {
    let number = if value.abs() >= 100.0 {
        format!("{:.0}", value)
    } else {
        format!("{:.2}", value)
    };
    match unit {
        "" => number,
        "%" => format!("{}%", number),
        _ => format!("{} {}", number, unit),
    }
}

fn role_label(role: Role, lang: Language) -> &'static str {
    match role {
        Role::Researcher => t("role.researcher", lang),
        Role::Policymaker => t("role.policymaker", lang),
        Role::Conservationist => t("role.conservationist", lang),
        Role::Admin => t("role.admin", lang),
    }
}

pub fn title(page: Page, lang: Language) -> String {
    let key = format!("page.{}", page.as_str());
    t(&key, lang).to_string()
}

pub fn render<R: Rng>(page: Page, ctx: &ViewContext<'_>, rng: &mut R) -> Frame {
    let lang = ctx.language;
    let spec = view_spec(page);
    let mut lines = Vec::new();

    if let Some(user) = ctx.user {
        lines.push(format!("{}, {}", t("greeting", lang), user.display_name()));
    }
    lines.push(spec.summary.to_string());

    match page {
        Page::Login => {
            lines.push(format!("{}:", t("role", lang)));
            for role in Role::ALL {
                lines.push(format!("  {} ({})", role_label(role, lang), role.as_str()));
            }
        }
        Page::Profile => {
            if let Some(user) = ctx.user {
                lines.push(format!("{}: {}", t("email", lang), user.email));
                lines.push(format!("{}: {}", t("role", lang), role_label(user.role, lang)));
                lines.push(format!("ID: {}", user.id));
            }
        }
        Page::Settings => {
            lines.push(format!("Language: {}", lang.as_str()));
        }
        _ => {}
    }

    for &(label, low, high, unit) in spec.metrics {
        let value = rng.gen_range(low..=high);
        lines.push(format!("{}: {}", label, format_value(value, unit)));
    }

    // Only offer links the current user can actually open
    let role = ctx.user.map(|u| u.role);
    let links = spec
        .links
        .iter()
        .copied()
        .filter(|p| access_rule(*p).permits(role))
        .collect();

    Frame {
        page,
        title: title(page, lang),
        lines,
        links,
    }
}
