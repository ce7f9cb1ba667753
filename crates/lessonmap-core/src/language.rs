//! Content language and the handful of labels the core synthesizes itself.

use serde::{Deserialize, Serialize};

/// Language of the lesson content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Arabic,
    #[default]
    English,
}

impl Language {
    /// Title of the synthetic root created when merging chunk maps.
    pub fn comprehensive_title(&self) -> &'static str {
        match self {
            Self::Arabic => "خريطة شاملة",
            Self::English => "Comprehensive Mind Map",
        }
    }

    /// Root label of the single-shot fallback placeholder.
    pub fn placeholder_root(&self) -> &'static str {
        match self {
            Self::Arabic => "محتوى تعليمي",
            Self::English => "Educational Content",
        }
    }

    /// Branch label of the single-shot fallback placeholder.
    pub fn placeholder_branch(&self) -> &'static str {
        match self {
            Self::Arabic => "نقطة رئيسية",
            Self::English => "Main Point",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Arabic => write!(f, "arabic"),
            Self::English => write!(f, "english"),
        }
    }
}

impl std::str::FromStr for Language {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "arabic" | "ar" => Ok(Self::Arabic),
            "english" | "en" => Ok(Self::English),
            other => Err(crate::Error::Config(format!("Unsupported language: {}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_language() {
        assert_eq!("ar".parse::<Language>().unwrap(), Language::Arabic);
        assert_eq!("English".parse::<Language>().unwrap(), Language::English);
        assert!("klingon".parse::<Language>().is_err());
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&Language::Arabic).unwrap();
        assert_eq!(json, "\"arabic\"");
        let back: Language = serde_json::from_str("\"english\"").unwrap();
        assert_eq!(back, Language::English);
    }
}
