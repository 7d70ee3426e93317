//! Static vocabulary of the KODV (Korea Drought Vulnerability) graph.
//!
//! The generator renders this descriptor into its prompt so the oracle only
//! ever emits property IRIs, region names and hierarchy relations that exist
//! in the graph. Everything here is built once at start and shared read-only.

/// Indicator group a property belongs to (mirrors the vulnerability index
/// decomposition: exposure, sensitivity, adaptive capacity).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PropertyCategory {
    BasicInfo,
    Exposure,
    Sensitivity,
    AuxiliaryWater,
    ResponseCapacity,
    Vulnerability,
}

impl PropertyCategory {
    pub fn title(self) -> &'static str {
        match self {
            Self::BasicInfo => "Basic Info",
            Self::Exposure => "Exposure",
            Self::Sensitivity => "Sensitivity",
            Self::AuxiliaryWater => "Auxiliary Water",
            Self::ResponseCapacity => "Response Capacity",
            Self::Vulnerability => "Vulnerability Results",
        }
    }

    pub const ALL: [PropertyCategory; 6] = [
        Self::BasicInfo,
        Self::Exposure,
        Self::Sensitivity,
        Self::AuxiliaryWater,
        Self::ResponseCapacity,
        Self::Vulnerability,
    ];
}

/// A human-facing keyword mapped onto a graph property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyEntry {
    pub category: PropertyCategory,
    /// Korean keyword users type.
    pub keyword: &'static str,
    /// English gloss shown next to the keyword.
    pub label: &'static str,
    /// Prefixed property IRI, e.g. `kodv:population`.
    pub property: &'static str,
    /// Canonical result variable (without `?`) used in the region lookup.
    pub variable: &'static str,
}

/// Abbreviated province name and the canonical label stored in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionAlias {
    pub short: &'static str,
    pub canonical: &'static str,
    pub romanized: &'static str,
}

/// Rating concept for a numeric vulnerability grade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatingConcept {
    pub grade: u8,
    pub roman: &'static str,
    pub concept: &'static str,
}

#[derive(Debug, Clone)]
pub struct Vocabulary {
    pub properties: Vec<PropertyEntry>,
    pub region_aliases: Vec<RegionAlias>,
    pub ancestor_relations: Vec<&'static str>,
    pub ratings: Vec<RatingConcept>,
    /// Classes per administrative level (L1 province, L2 city/county/district,
    /// L3 eup/myeon/dong).
    pub levels: Vec<(u8, Vec<&'static str>)>,
}

/// Result variable carrying the Wikidata counterpart of a local entity.
pub const CROSS_REFERENCE_VAR: &str = "wikiURI";

/// Property linking an administrative division to its code.
pub const DIVISION_CODE_PROPERTY: &str = "koad:divisionCode";

/// Base IRI of KODV instance identifiers.
pub const KODV_ID_BASE: &str = "https://knowledgemap.kr/kodv/id/";

impl Default for Vocabulary {
    fn default() -> Self {
        Self::kodv()
    }
}

impl Vocabulary {
    /// The KODV descriptor.
    pub fn kodv() -> Self {
        use PropertyCategory::*;

        let p = |category, keyword, label, property, variable| PropertyEntry {
            category,
            keyword,
            label,
            property,
            variable,
        };

        let properties = vec![
            p(BasicInfo, "인구", "Population", "kodv:population", "pop"),
            p(BasicInfo, "급수율", "Water Supply Rate", "kodv:waterSupplyRate", "supplyRate"),
            p(BasicInfo, "급수인구", "Supply Population", "kodv:waterSupplyPopulation", "supplyPop"),
            p(Exposure, "평균 가뭄 심도", "Avg Drought Severity", "kodv:droughtSeverityAvg", "severity"),
            p(Exposure, "가뭄 빈도", "Drought Frequency", "kodv:droughtFrequency", "freq"),
            p(Exposure, "가뭄 노출도", "Exposure Score", "kodv:droughtExposureScore", "exposure"),
            p(Exposure, "노출도 계수", "Exposure Coeff", "kodv:exposureCoefficient", "exposureCoeff"),
            p(Sensitivity, "생활용수 이용량", "Domestic Water Usage", "kodv:domesticWaterUsage", "domesticUsage"),
            p(Sensitivity, "공업용수 이용량", "Industrial Water Usage", "kodv:industrialWaterUsage", "industrialUsage"),
            p(Sensitivity, "생공용수 / 총 이용량", "Total Usage", "kodv:domesticIndustrialWaterUsage", "totalUsage"),
            p(Sensitivity, "민감도 계수", "Sensitivity Coeff", "kodv:sensitivityCoefficient", "sensitivityCoeff"),
            p(AuxiliaryWater, "저수지 용량", "Reservoir Capacity", "kodv:reservoirCapacity", "reservoir"),
            p(AuxiliaryWater, "지하수 개발가능량", "Groundwater Available", "kodv:groundwaterAvailable", "groundwater"),
            p(AuxiliaryWater, "보조수원 능력", "Aux Water Capacity", "kodv:auxWaterSourceCapacity", "auxCapacity"),
            p(AuxiliaryWater, "보조수원 계수", "Aux Water Coeff", "kodv:auxWaterSourceCoefficient", "auxCoeff"),
            p(ResponseCapacity, "용수공급 가능일수", "Supply Days", "kodv:waterSupplyAvailableDays", "supplyDays"),
            p(ResponseCapacity, "대응능력 계수", "Response Coeff", "kodv:responseCapacityCoefficient", "responseCoeff"),
            p(Vulnerability, "취약성 점수", "Vulnerability Score", "kodv:vulnerabilityScore", "vulScore"),
            p(Vulnerability, "취약성 등급 (Numeric 1~5)", "Vulnerability Grade", "kodv:vulnerabilityRatingNumeric", "gradeNumeric"),
            p(Vulnerability, "취약성 등급 (URI Concept)", "Vulnerability Rating", "kodv:vulnerabilityRating", "gradeURI"),
        ];

        let alias = |short, canonical, romanized| RegionAlias {
            short,
            canonical,
            romanized,
        };
        let region_aliases = vec![
            alias("서울", "서울특별시", "Seoul"),
            alias("경기", "경기도", "Gyeonggi"),
            alias("충남", "충청남도", "Chungnam"),
            alias("충북", "충청북도", "Chungbuk"),
            alias("전남", "전라남도", "Jeonnam"),
            alias("전북", "전북특별자치도", "Jeonbuk"),
            alias("강원", "강원특별자치도", "Gangwon"),
            alias("경남", "경상남도", "Gyeongnam"),
            alias("경북", "경상북도", "Gyeongbuk"),
            alias("제주", "제주특별자치도", "Jeju"),
        ];

        let ratings = ["I", "II", "III", "IV", "V"]
            .into_iter()
            .zip([
                "kodvid:Rating_I",
                "kodvid:Rating_II",
                "kodvid:Rating_III",
                "kodvid:Rating_IV",
                "kodvid:Rating_V",
            ])
            .enumerate()
            .map(|(i, (roman, concept))| RatingConcept {
                grade: (i + 1) as u8,
                roman,
                concept,
            })
            .collect();

        Self {
            properties,
            region_aliases,
            ancestor_relations: vec![
                "koad:isNeighborhoodOf",
                "koad:isTownOf",
                "koad:isTownshipOf",
                "koad:isDistrictOf",
                "koad:isCityOf",
                "koad:isCountyOf",
            ],
            ratings,
            levels: vec![
                (1, vec!["koad:Province"]),
                (2, vec!["koad:City", "koad:County", "koad:District"]),
                (3, vec!["koad:Eup", "koad:Myeon", "koad:Dong"]),
            ],
        }
    }

    /// Finds the property for a keyword. Exact keyword match wins; otherwise
    /// the longest keyword contained in `text` is returned, so "급수인구"
    /// resolves to the supply population rather than the supply rate.
    pub fn property_for(&self, text: &str) -> Option<&PropertyEntry> {
        let text = text.trim();
        if let Some(exact) = self.properties.iter().find(|p| p.keyword == text) {
            return Some(exact);
        }
        self.properties
            .iter()
            .filter(|p| text.contains(p.keyword))
            .max_by_key(|p| p.keyword.chars().count())
    }

    /// `(koad:isNeighborhoodOf|...|koad:isCountyOf)+`
    pub fn ancestor_path(&self) -> String {
        format!("({})+", self.ancestor_relations.join("|"))
    }
}
