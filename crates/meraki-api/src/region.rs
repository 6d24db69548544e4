use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Dashboard region hosting an organization.
///
/// Each region has its own API host; keys and organizations do not cross
/// regions. The base URLs are the only ones accepted by config validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Region {
    #[default]
    Global,
    Canada,
    China,
    India,
    UsGovernment,
}

impl Region {
    pub const ALL: [Self; 5] = [
        Self::Global,
        Self::Canada,
        Self::China,
        Self::India,
        Self::UsGovernment,
    ];

    /// API base URL, including the `/api/v1` suffix.
    pub fn base_url(self) -> &'static str {
        match self {
            Self::Global => "https://api.meraki.com/api/v1",
            Self::Canada => "https://api.meraki.ca/api/v1",
            Self::China => "https://api.meraki.cn/api/v1",
            Self::India => "https://api.meraki.in/api/v1",
            Self::UsGovernment => "https://api.gov-meraki.com/api/v1",
        }
    }

    /// Human-readable label shown in pickers and diagnostics.
    pub fn label(self) -> &'static str {
        match self {
            Self::Global => "Global",
            Self::Canada => "Canada",
            Self::China => "China",
            Self::India => "India",
            Self::UsGovernment => "US Government",
        }
    }

    /// Dashboard web UI origin (base URL without `/api/v1`).
    pub fn dashboard_origin(self) -> &'static str {
        self.base_url().trim_end_matches("/api/v1")
    }

    /// Reverse lookup from an exact base URL.
    pub fn from_base_url(url: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.base_url() == url)
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Region {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace(['_', ' '], "-").as_str() {
            "global" => Ok(Self::Global),
            "canada" | "ca" => Ok(Self::Canada),
            "china" | "cn" => Ok(Self::China),
            "india" | "in" => Ok(Self::India),
            "us-government" | "us-gov" | "gov" => Ok(Self::UsGovernment),
            other => Err(format!("unknown Dashboard region: {other}")),
        }
    }
}
