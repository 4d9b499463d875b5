//! Term normalizer: informal and localized tokens to catalog identifiers.
//!
//! Each parameter key has a fixed alias table built once per process. A
//! token is folded (trimmed, whitespace collapsed, lower-cased) and matched
//! exactly; on a miss, one retry strips a trailing locality word such as
//! "region" or "區域". Instance types are not aliased: they pass through when
//! they already look like catalog syntax.

use crate::params::ParamKey;
use pricelens_core::error::ErrorKind;
use regex_lite::Regex;
use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;

/// Why a token failed to normalize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissReason {
    /// Not in the vocabulary
    Unknown,
    /// Names more than one canonical id (e.g. "japan")
    Ambiguous,
    /// Not in catalog instance-type syntax
    InvalidSyntax,
}

impl std::fmt::Display for MissReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Unknown => "unknown",
            Self::Ambiguous => "ambiguous",
            Self::InvalidSyntax => "invalid syntax",
        })
    }
}

/// A token that has no canonical identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot normalize {key} '{token}': {reason}")]
pub struct NormalizationMiss {
    pub key: ParamKey,
    pub token: String,
    pub reason: MissReason,
}

impl NormalizationMiss {
    fn new(key: ParamKey, token: &str, reason: MissReason) -> Self {
        Self {
            key,
            token: token.to_string(),
            reason,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        ErrorKind::NormalizationMiss
    }
}

/// Map `raw` to the canonical identifier for `key`.
pub fn normalize(key: ParamKey, raw: &str) -> Result<String, NormalizationMiss> {
    let folded = fold(raw);
    if folded.is_empty() {
        return Err(NormalizationMiss::new(key, raw, MissReason::Unknown));
    }

    let table = match key {
        ParamKey::InstanceType => {
            return if is_instance_type(&folded) {
                Ok(folded)
            } else {
                Err(NormalizationMiss::new(key, raw, MissReason::InvalidSyntax))
            };
        }
        ParamKey::Region => &*REGIONS,
        ParamKey::Os => &*OPERATING_SYSTEMS,
        ParamKey::Service => &*SERVICES,
    };

    let resolution = table.lookup(&folded).or_else(|| {
        strip_locality_suffix(&folded).and_then(|stripped| table.lookup(stripped))
    });

    match resolution {
        Some(Resolution::Canonical(id)) => Ok(id.to_string()),
        Some(Resolution::Ambiguous) => Err(NormalizationMiss::new(key, raw, MissReason::Ambiguous)),
        None => Err(NormalizationMiss::new(key, raw, MissReason::Unknown)),
    }
}

/// Whether `token` (already folded) is in catalog instance-type syntax.
pub fn is_instance_type(token: &str) -> bool {
    INSTANCE_TYPE.is_match(token)
}

/// Every canonical region code, sorted.
pub fn region_codes() -> Vec<&'static str> {
    REGIONS.canonical_ids()
}

/// Every canonical operating-system name, sorted.
pub fn os_names() -> Vec<&'static str> {
    OPERATING_SYSTEMS.canonical_ids()
}

/// Trim, collapse internal whitespace, lower-case.
fn fold(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

const LOCALITY_SUFFIXES: &[&str] = &["region", "區域", "区域", "地區", "地区", "市", "リージョン"];

fn strip_locality_suffix(folded: &str) -> Option<&str> {
    LOCALITY_SUFFIXES.iter().find_map(|suffix| {
        folded
            .strip_suffix(suffix)
            .map(str::trim_end)
            .filter(|rest| !rest.is_empty())
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resolution {
    Canonical(&'static str),
    Ambiguous,
}

struct AliasTable {
    aliases: HashMap<String, Resolution>,
}

impl AliasTable {
    /// Every canonical id is registered as an alias of itself.
    fn build(entries: &[(&'static str, &[&str])]) -> Self {
        let mut aliases: HashMap<String, Resolution> = HashMap::new();
        for (canonical, names) in entries {
            for name in std::iter::once(canonical).chain(names.iter()) {
                let alias = fold(name);
                let resolution = match aliases.get(&alias) {
                    Some(Resolution::Canonical(existing)) if existing != canonical => {
                        Resolution::Ambiguous
                    }
                    Some(Resolution::Ambiguous) => Resolution::Ambiguous,
                    _ => Resolution::Canonical(*canonical),
                };
                aliases.insert(alias, resolution);
            }
        }
        Self { aliases }
    }

    fn lookup(&self, folded: &str) -> Option<Resolution> {
        self.aliases.get(folded).copied()
    }

    fn canonical_ids(&self) -> Vec<&'static str> {
        self.aliases
            .values()
            .filter_map(|r| match r {
                Resolution::Canonical(id) => Some(*id),
                Resolution::Ambiguous => None,
            })
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

static INSTANCE_TYPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z][a-z0-9-]*[0-9][a-z0-9-]*\.[0-9]*[a-z]+(-[0-9a-z]+)?$")
        .expect("instance type pattern compiles")
});

// Region aliases: English, Traditional and Simplified Chinese, Japanese,
// Korean, then the catalog's location name.
static REGIONS: LazyLock<AliasTable> = LazyLock::new(|| {
    AliasTable::build(&[
        ("us-east-1", &["n. virginia", "north virginia", "virginia", "維吉尼亞", "北維吉尼亞", "弗吉尼亚", "北弗吉尼亚", "バージニア", "버지니아", "US East (N. Virginia)", "usa", "united states", "美國", "美国", "アメリカ", "미국"]),
        ("us-east-2", &["ohio", "俄亥俄", "オハイオ", "오하이오", "US East (Ohio)", "usa", "united states", "美國", "美国", "アメリカ", "미국"]),
        ("us-west-1", &["n. california", "north california", "california", "加州", "北加州", "加利福尼亚", "カリフォルニア", "캘리포니아", "US West (N. California)", "usa", "united states", "美國", "美国", "アメリカ", "미국"]),
        ("us-west-2", &["oregon", "俄勒岡", "俄勒冈", "オレゴン", "오레곤", "US West (Oregon)", "usa", "united states", "美國", "美国", "アメリカ", "미국"]),
        ("af-south-1", &["cape town", "south africa", "開普敦", "开普敦", "南非", "ケープタウン", "케이프타운", "Africa (Cape Town)"]),
        ("ap-east-1", &["hong kong", "hongkong", "hk", "香港", "ホンコン", "홍콩", "Asia Pacific (Hong Kong)"]),
        ("ap-south-1", &["mumbai", "india", "孟買", "孟买", "印度", "ムンバイ", "インド", "뭄바이", "인도", "Asia Pacific (Mumbai)"]),
        ("ap-northeast-1", &["tokyo", "東京", "东京", "とうきょう", "トウキョウ", "도쿄", "Asia Pacific (Tokyo)", "japan", "日本", "일본"]),
        ("ap-northeast-2", &["seoul", "korea", "south korea", "首爾", "首尔", "韓國", "韩国", "ソウル", "韓国", "서울", "한국", "Asia Pacific (Seoul)"]),
        ("ap-northeast-3", &["osaka", "大阪", "おおさか", "오사카", "Asia Pacific (Osaka)", "japan", "日本", "일본"]),
        ("ap-southeast-1", &["singapore", "新加坡", "星加坡", "シンガポール", "싱가포르", "Asia Pacific (Singapore)"]),
        ("ap-southeast-2", &["sydney", "australia", "雪梨", "悉尼", "澳洲", "澳大利亚", "シドニー", "オーストラリア", "시드니", "호주", "Asia Pacific (Sydney)"]),
        ("ca-central-1", &["canada", "montreal", "加拿大", "蒙特婁", "蒙特利尔", "カナダ", "캐나다", "Canada (Central)"]),
        ("eu-central-1", &["frankfurt", "germany", "法蘭克福", "法兰克福", "德國", "德国", "フランクフルト", "ドイツ", "프랑크푸르트", "독일", "EU (Frankfurt)", "Europe (Frankfurt)"]),
        ("eu-west-1", &["ireland", "dublin", "愛爾蘭", "爱尔兰", "都柏林", "アイルランド", "아일랜드", "EU (Ireland)", "Europe (Ireland)"]),
        ("eu-west-2", &["london", "uk", "united kingdom", "倫敦", "伦敦", "英國", "英国", "ロンドン", "イギリス", "런던", "영국", "EU (London)", "Europe (London)"]),
        ("eu-west-3", &["paris", "france", "巴黎", "法國", "法国", "パリ", "フランス", "파리", "프랑스", "EU (Paris)", "Europe (Paris)"]),
        ("eu-south-1", &["milan", "italy", "米蘭", "米兰", "義大利", "意大利", "ミラノ", "イタリア", "밀라노", "EU (Milan)", "Europe (Milan)"]),
        ("eu-north-1", &["stockholm", "sweden", "斯德哥爾摩", "斯德哥尔摩", "瑞典", "ストックホルム", "스톡홀름", "EU (Stockholm)", "Europe (Stockholm)"]),
        ("me-south-1", &["bahrain", "巴林", "バーレーン", "바레인", "Middle East (Bahrain)"]),
        ("sa-east-1", &["são paulo", "sao paulo", "brazil", "聖保羅", "圣保罗", "巴西", "サンパウロ", "ブラジル", "상파울루", "South America (Sao Paulo)"]),
    ])
});

static OPERATING_SYSTEMS: LazyLock<AliasTable> = LazyLock::new(|| {
    AliasTable::build(&[
        ("Linux", &["linux/unix", "unix", "amazon linux", "amazon linux 2", "amazon linux 2023", "al2", "al2023", "ubuntu", "debian", "centos", "リナックス", "리눅스"]),
        ("Windows", &["win", "windows server", "microsoft windows", "視窗", "微軟", "微软", "ウィンドウズ", "윈도우"]),
        ("RHEL", &["red hat", "redhat", "red hat enterprise linux", "紅帽", "红帽", "レッドハット"]),
        ("SUSE", &["sles", "suse linux", "suse linux enterprise server", "opensuse"]),
        ("Red Hat Enterprise Linux with HA", &["rhel ha", "rhel with ha", "rhel high availability", "red hat ha", "red hat enterprise linux ha"]),
        ("Ubuntu Pro", &["ubuntu pro linux", "ubuntu advantage"]),
    ])
});

static SERVICES: LazyLock<AliasTable> = LazyLock::new(|| {
    AliasTable::build(&[(
        "EC2",
        &["amazon ec2", "amazonec2", "aws ec2", "elastic compute cloud", "amazon elastic compute cloud", "compute", "vm", "virtual machine", "instance", "虛擬機", "虚拟机", "雲端主機", "云主机", "仮想マシン", "インスタンス", "가상 머신", "인스턴스"],
    )])
});
