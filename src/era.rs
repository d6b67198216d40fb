//! Historical era definitions.
//!
//! Defines [`Era`] (the five selectable periods) and the static
//! [`EraDescriptor`] table that drives prompts and era listings. Eras parse
//! from either their machine id (`"imperial"`) or display name (`"帝国时代"`).

use serde::{Deserialize, Serialize};

/// The five selectable historical periods.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Era {
    /// 3000 BC to 221 BC: Xia, Shang and Zhou.
    Ancient,
    /// 221 BC to 1912: Qin unification to the fall of the Qing.
    #[default]
    Imperial,
    /// 1912 to 1949: Republic era.
    Modern,
    /// 1949 to 2000.
    Contemporary,
    /// 2000 to present.
    Recent,
}

/// Static reference data for one era.
#[derive(Debug, Clone, Serialize)]
pub struct EraDescriptor {
    pub id: Era,
    pub display_name: &'static str,
    pub date_range: &'static str,
    /// Long-form description interpolated into story prompts.
    pub description: &'static str,
    /// One-line summary for listings.
    pub summary: &'static str,
    pub icon: &'static str,
    pub color_theme: &'static str,
    pub features: &'static [&'static str],
    pub figures: &'static [&'static str],
}

pub const ERAS: &[EraDescriptor] = &[
    EraDescriptor {
        id: Era::Ancient,
        display_name: "远古时代",
        date_range: "公元前3000年-公元前221年",
        description: "公元前3000年至公元前221年，这是华夏文明的起源时期，包括夏商周三代",
        summary: "华夏文明的起源，青铜与礼乐的时代",
        icon: "🏛️",
        color_theme: "from-amber-600 to-yellow-700",
        features: &["青铜器", "甲骨文", "礼乐制度", "诸子百家"],
        figures: &["大禹", "周公", "孔子", "老子"],
    },
    EraDescriptor {
        id: Era::Imperial,
        display_name: "帝国时代",
        date_range: "公元前221年-公元1912年",
        description: "公元前221年至1912年，从秦始皇统一六国到清朝灭亡，历经两千多年的帝制时代",
        summary: "两千年帝制，王朝更迭与盛世繁华",
        icon: "👑",
        color_theme: "from-red-700 to-rose-800",
        features: &["郡县制", "丝绸之路", "科举制度", "四大发明"],
        figures: &["秦始皇", "汉武帝", "唐太宗", "康熙"],
    },
    EraDescriptor {
        id: Era::Modern,
        display_name: "近代",
        date_range: "1912年-1949年",
        description: "1912年至1949年，从辛亥革命到新中国成立，这是中国历史上最动荡的时期之一",
        summary: "革命与救亡，新旧交替的动荡年代",
        icon: "🏭",
        color_theme: "from-slate-600 to-gray-700",
        features: &["辛亥革命", "新文化运动", "五四运动", "民族工业"],
        figures: &["孙中山", "鲁迅", "蔡元培", "梁启超"],
    },
    EraDescriptor {
        id: Era::Contemporary,
        display_name: "当代",
        date_range: "1949年-2000年",
        description: "1949年至2000年，新中国成立后的社会主义建设时期",
        summary: "新中国的建设与改革开放",
        icon: "🌆",
        color_theme: "from-blue-600 to-indigo-700",
        features: &["开国大典", "两弹一星", "改革开放", "经济特区"],
        figures: &["钱学森", "袁隆平", "邓稼先", "焦裕禄"],
    },
    EraDescriptor {
        id: Era::Recent,
        display_name: "近年",
        date_range: "2000年-至今",
        description: "2000年至今，中国快速发展的现代化时期",
        summary: "高速发展的数字与全球化时代",
        icon: "🌐",
        color_theme: "from-emerald-500 to-teal-600",
        features: &["北京奥运", "高铁网络", "移动互联网", "航天探索"],
        figures: &["杨利伟", "屠呦呦", "莫言", "王亚平"],
    },
];

impl Era {
    pub const ALL: [Era; 5] = [
        Era::Ancient,
        Era::Imperial,
        Era::Modern,
        Era::Contemporary,
        Era::Recent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ancient => "ancient",
            Self::Imperial => "imperial",
            Self::Modern => "modern",
            Self::Contemporary => "contemporary",
            Self::Recent => "recent",
        }
    }

    pub fn descriptor(&self) -> &'static EraDescriptor {
        // ERAS is declared in the same order as Era::ALL
        &ERAS[*self as usize]
    }

    pub fn display_name(&self) -> &'static str {
        self.descriptor().display_name
    }

    /// Parse an era from its id or display name. Returns `None` for anything else.
    pub fn lookup(s: &str) -> Option<Self> {
        let s = s.trim();
        ERAS.iter()
            .find(|d| d.id.as_str() == s || d.display_name == s)
            .map(|d| d.id)
    }
}

impl std::fmt::Display for Era {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Era {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Era::lookup(s).ok_or_else(|| format!("unknown era: {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_order_matches_enum() {
        for era in Era::ALL {
            assert_eq!(era.descriptor().id, era);
        }
    }

    #[test]
    fn parses_id_and_display_name() {
        assert_eq!("imperial".parse::<Era>().unwrap(), Era::Imperial);
        assert_eq!("帝国时代".parse::<Era>().unwrap(), Era::Imperial);
        assert_eq!("近年".parse::<Era>().unwrap(), Era::Recent);
        assert_eq!(" ancient ".parse::<Era>().unwrap(), Era::Ancient);
        assert!("medieval".parse::<Era>().is_err());
    }

    #[test]
    fn serde_uses_snake_case_ids() {
        let json = serde_json::to_string(&Era::Contemporary).unwrap();
        assert_eq!(json, "\"contemporary\"");
    }
}
