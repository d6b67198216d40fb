//! Location resolution for the requester.
//!
//! [`resolver::GeoResolver`] walks an ordered fallback chain: the edge info
//! endpoint ([`edge`]), then device coordinates ([`device`]) reverse-geocoded
//! through [`geocode`], then the static [`GeoResult::fallback`]. Every step's
//! failure is absorbed; resolution itself never fails.

pub mod device;
pub mod edge;
pub mod geocode;
pub mod resolver;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::era::Era;

/// Failure of a single resolution step. Logged, never surfaced to callers.
#[derive(Debug, Error)]
pub enum GeoError {
    #[error("edge lookup timed out")]
    EdgeTimeout,

    #[error("edge lookup failed: {0}")]
    Edge(String),

    #[error("geolocation permission denied")]
    PermissionDenied,

    #[error("geolocation unavailable")]
    Unavailable,

    #[error("geolocation timed out")]
    DeviceTimeout,

    #[error("reverse geocoding failed: {0}")]
    Geocode(String),
}

/// A suggested story for a place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub era: Era,
    pub title: String,
    pub description: String,
}

/// WGS84 coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Where the requester is, plus story suggestions for that place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoResult {
    pub ip: String,
    pub country_code: String,
    pub country_name: String,
    pub region: String,
    pub city: String,
    #[serde(default, deserialize_with = "lenient_coordinate")]
    pub latitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient_coordinate")]
    pub longitude: Option<f64>,
    pub timezone: String,
    pub edge_node: String,
    pub recommendations: Vec<Recommendation>,
}

pub const DEFAULT_COUNTRY_CODE: &str = "CN";
pub const DEFAULT_TIMEZONE: &str = "Asia/Shanghai";
pub const FALLBACK_EDGE_NODE: &str = "Default";

impl GeoResult {
    /// Result used when every resolution step has failed.
    pub fn fallback() -> Self {
        Self {
            ip: "unknown".into(),
            country_code: DEFAULT_COUNTRY_CODE.into(),
            country_name: country_name(DEFAULT_COUNTRY_CODE),
            region: String::new(),
            city: String::new(),
            latitude: None,
            longitude: None,
            timezone: DEFAULT_TIMEZONE.into(),
            edge_node: FALLBACK_EDGE_NODE.into(),
            recommendations: recommendations_for(""),
        }
    }

    /// Best human-readable place name: city, then region, then country.
    pub fn place_name(&self) -> &str {
        [&self.city, &self.region, &self.country_name]
            .into_iter()
            .find(|s| !s.is_empty())
            .map(String::as_str)
            .unwrap_or("")
    }
}

const COUNTRY_NAMES: &[(&str, &str)] = &[
    ("CN", "中国"),
    ("US", "美国"),
    ("JP", "日本"),
    ("KR", "韩国"),
    ("GB", "英国"),
    ("DE", "德国"),
    ("FR", "法国"),
    ("SG", "新加坡"),
    ("HK", "香港"),
    ("TW", "台湾"),
];

/// Display name for an ISO country code; unknown codes are returned as-is.
pub fn country_name(code: &str) -> String {
    COUNTRY_NAMES
        .iter()
        .find(|(c, _)| c.eq_ignore_ascii_case(code))
        .map(|(_, name)| (*name).to_string())
        .unwrap_or_else(|| code.to_string())
}

type RecommendationRow = (Era, &'static str, &'static str);

/// City-keyed suggestions, matched in declaration order.
const CITY_RECOMMENDATIONS: &[(&str, &[RecommendationRow])] = &[
    (
        "北京",
        &[
            (Era::Imperial, "紫禁城的故事", "探索明清两代皇宫的辉煌历史"),
            (Era::Modern, "五四运动", "1919年改变中国命运的学生运动"),
        ],
    ),
    (
        "上海",
        &[
            (Era::Modern, "十里洋场", "感受民国时期的繁华与动荡"),
            (Era::Contemporary, "浦东开发", "见证中国改革开放的奇迹"),
        ],
    ),
    (
        "西安",
        &[
            (Era::Ancient, "秦始皇陵", "探索千古一帝的地下王国"),
            (Era::Imperial, "大唐盛世", "重温长安城的繁华岁月"),
        ],
    ),
    (
        "杭州",
        &[
            (Era::Imperial, "南宋临安", "感受\"暖风熏得游人醉\"的繁华"),
            (Era::Imperial, "白娘子传说", "西湖边流传千年的爱情故事"),
        ],
    ),
    (
        "南京",
        &[
            (Era::Imperial, "六朝古都", "探索金陵的千年沧桑"),
            (Era::Modern, "民国首都", "见证中华民国的兴衰"),
        ],
    ),
];

const DEFAULT_RECOMMENDATIONS: &[RecommendationRow] =
    &[(Era::Imperial, "华夏文明", "探索这片土地的历史记忆")];

/// Suggestions for a place. A table key matches when `place` contains it, so
/// "北京市" and "Beijing 北京" both hit 北京; the first matching key wins.
pub fn recommendations_for(place: &str) -> Vec<Recommendation> {
    let rows = if place.is_empty() {
        DEFAULT_RECOMMENDATIONS
    } else {
        CITY_RECOMMENDATIONS
            .iter()
            .find(|(city, _)| place.contains(city))
            .map(|(_, rows)| *rows)
            .unwrap_or(DEFAULT_RECOMMENDATIONS)
    };

    rows.iter()
        .map(|(era, title, description)| Recommendation {
            era: *era,
            title: (*title).to_string(),
            description: (*description).to_string(),
        })
        .collect()
}

/// Accepts a number, a numeric string, an empty string, or null.
fn lenient_coordinate<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Number(n)) => Some(n),
        Some(Raw::Text(s)) => s.trim().parse().ok(),
        None => None,
    })
}
