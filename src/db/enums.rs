use std::fmt;
use std::str::FromStr;

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum ReleaseType {
    #[sea_orm(string_value = "Single")]
    Single,
    #[sea_orm(string_value = "Album")]
    Album,
    #[sea_orm(string_value = "EP")]
    #[serde(rename = "EP")]
    Ep,
    #[sea_orm(string_value = "Mixtape")]
    Mixtape,
}

impl ReleaseType {
    pub const ALLOWED: [&'static str; 4] = ["Single", "Album", "EP", "Mixtape"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Single => "Single",
            Self::Album => "Album",
            Self::Ep => "EP",
            Self::Mixtape => "Mixtape",
        }
    }
}

impl FromStr for ReleaseType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Single" => Ok(Self::Single),
            "Album" => Ok(Self::Album),
            "EP" => Ok(Self::Ep),
            "Mixtape" => Ok(Self::Mixtape),
            other => Err(format!(
                "`{}` is not a valid release type (expected one of {})",
                other,
                Self::ALLOWED.join(", ")
            )),
        }
    }
}

impl fmt::Display for ReleaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ReleaseType> for String {
    fn from(release_type: ReleaseType) -> String {
        release_type.as_str().to_string()
    }
}
