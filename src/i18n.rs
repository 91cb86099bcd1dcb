//! Display language and string lookup.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Ml,
}

impl Language {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "en" | "english" => Some(Self::En),
            "ml" | "malayalam" => Some(Self::Ml),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Ml => "ml",
        }
    }

    pub fn toggle(self) -> Self {
        match self {
            Self::En => Self::Ml,
            Self::Ml => Self::En,
        }
    }
}

// (key, english, malayalam)
const STRINGS: &[(&str, &str, &str)] = &[
    ("app.title", "Marine Research Portal", "സമുദ്ര ഗവേഷണ പോർട്ടൽ"),
    ("greeting", "Welcome", "സ്വാഗതം"),
    ("login", "Login", "ലോഗിൻ"),
    ("logout", "Logout", "ലോഗൗട്ട്"),
    ("email", "Email", "ഇമെയിൽ"),
    ("password", "Password", "പാസ്‌വേഡ്"),
    ("role", "Role", "പങ്ക്"),
    ("dashboard", "Dashboard", "ഡാഷ്ബോർഡ്"),
    ("quick_links", "Quick links", "പെട്ടെന്നുള്ള ലിങ്കുകൾ"),
    ("role.researcher", "Researcher", "ഗവേഷകൻ"),
    ("role.policymaker", "Policymaker", "നയരൂപകർത്താവ്"),
    ("role.conservationist", "Conservationist", "സംരക്ഷകൻ"),
    ("role.admin", "Administrator", "അഡ്മിനിസ്ട്രേറ്റർ"),
    ("page.landing", "Home", "ഹോം"),
    ("page.login", "Sign in", "സൈൻ ഇൻ"),
    ("page.researcher-dashboard", "Researcher Dashboard", "ഗവേഷക ഡാഷ്ബോർഡ്"),
    ("page.policymaker-dashboard", "Policymaker Dashboard", "നയരൂപകർത്താവ് ഡാഷ്ബോർഡ്"),
    ("page.policy-tools", "Policy Tools", "നയ ഉപകരണങ്ങൾ"),
    (
        "page.conservationist-dashboard",
        "Conservationist Dashboard",
        "സംരക്ഷക ഡാഷ്ബോർഡ്",
    ),
    ("page.conservation-tools", "Conservation Tools", "സംരക്ഷണ ഉപകരണങ്ങൾ"),
    ("page.admin-dashboard", "Admin Dashboard", "അഡ്മിൻ ഡാഷ്ബോർഡ്"),
    ("page.marine-crime-detection", "Marine Crime Detection", ""),
    ("page.data-explorer", "Data Explorer", "ഡാറ്റ എക്സ്പ്ലോറർ"),
    ("page.analytics", "Analytics", "വിശകലനം"),
    ("page.reports", "Reports", "റിപ്പോർട്ടുകൾ"),
    ("page.otolith-viewer", "Otolith Viewer", ""),
    ("page.edna-lab", "eDNA Lab", ""),
    ("page.settings", "Settings", "ക്രമീകരണങ്ങൾ"),
    ("page.profile", "Profile", "പ്രൊഫൈൽ"),
    ("page.ai-query", "AI Query", ""),
    ("page.explore-features", "Explore Features", ""),
    (
        "page.environmental-fish-prediction",
        "Environmental Fish Prediction",
        "",
    ),
    ("page.fish-image-identification", "Fish Image Identification", ""),
    ("page.otolith-image-comparison", "Otolith Image Comparison", ""),
    ("page.digital-twin", "Ocean Digital Twin", ""),
    ("page.dynamic-analytics", "Dynamic Analytics", ""),
    ("page.marine-map", "Marine Map", "സമുദ്ര ഭൂപടം"),
    ("page.data-upload", "Data Upload", "ഡാറ്റ അപ്‌ലോഡ്"),
    ("page.marine-ai", "Marine AI", ""),
    ("page.ml-predictions", "ML Predictions", ""),
    ("page.report-generator", "Report Generator", "റിപ്പോർട്ട് ജനറേറ്റർ"),
];

static TABLE: Lazy<HashMap<&'static str, (&'static str, &'static str)>> = Lazy::new(|| {
    STRINGS
        .iter()
        .map(|(key, en, ml)| (*key, (*en, *ml)))
        .collect()
});

/// Translate `key`. Missing Malayalam text falls back to English; unknown keys
/// come back unchanged.
pub fn t<'a>(key: &'a str, lang: Language) -> &'a str {
    match TABLE.get(key) {
        Some(&(en, ml)) => match lang {
            Language::Ml if !ml.is_empty() => ml,
            _ => en,
        },
        None => key,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::role::Page;

    #[test]
    fn test_language_parse_and_toggle() {
        assert_eq!(Language::from_str("ML"), Some(Language::Ml));
        assert_eq!(Language::from_str("english"), Some(Language::En));
        assert_eq!(Language::from_str("fr"), None);
        assert_eq!(Language::En.toggle(), Language::Ml);
        assert_eq!(Language::En.toggle().toggle(), Language::En);
        assert_eq!(Language::default(), Language::En);
    }

    #[test]
    fn test_lookup() {
        assert_eq!(t("greeting", Language::En), "Welcome");
        assert_eq!(t("greeting", Language::Ml), "സ്വാഗതം");
        assert_eq!(t("page.edna-lab", Language::Ml), "eDNA Lab");
        assert_eq!(t("no.such.key", Language::Ml), "no.such.key");
    }

    #[test]
    fn test_every_page_has_a_title() {
        for page in Page::ALL {
            let key = format!("page.{}", page.as_str());
            assert_ne!(t(&key, Language::En), key.as_str(), "missing {}", key);
        }
    }
}
