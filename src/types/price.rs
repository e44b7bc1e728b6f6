use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 价格查询，由调用方创建，创建后不再修改
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceQuery {
    /// 设备型号，例如 "iPhone 15"
    pub device_model: String,
    /// 目标地区代码，为空时使用全局默认地区
    #[serde(default)]
    pub regions: Vec<String>,
    /// 可选的商家过滤列表
    #[serde(default)]
    pub vendors: Option<Vec<String>>,
}

impl PriceQuery {
    pub fn new(device_model: impl Into<String>) -> Self {
        Self {
            device_model: device_model.into(),
            regions: Vec::new(),
            vendors: None,
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.regions.push(region.into());
        self
    }

    pub fn with_regions<I, S>(mut self, regions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.regions.extend(regions.into_iter().map(Into::into));
        self
    }

    pub fn with_vendors<I, S>(mut self, vendors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.vendors = Some(vendors.into_iter().map(Into::into).collect());
        self
    }
}

/// 抓取目标，由PlanningAgent生成
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScrapeTarget {
    /// 站点标识，例如 "amazon.com"
    pub site_id: String,
    /// 搜索URL模板，`{query}` 会被替换为编码后的设备型号
    pub url_template: String,
    pub region: String,
    pub device_model: String,
    /// 排名，从1开始
    pub priority: u32,
    /// 成功率评分
    pub score: f64,
    #[serde(default)]
    pub last_success_at: Option<DateTime<Utc>>,
}

impl ScrapeTarget {
    /// 生成实际请求的URL
    pub fn url(&self) -> String {
        self.url_template
            .replace("{query}", &urlencoding::encode(&self.device_model))
    }

    /// 用于日志与状态记录的目标标识
    pub fn label(&self) -> String {
        format!("{}@{}", self.site_id, self.region)
    }
}

/// 原始负载
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", content = "body", rename_all = "lowercase")]
pub enum RawPayload {
    Html(String),
    Json(serde_json::Value),
}

impl RawPayload {
    pub fn is_empty(&self) -> bool {
        match self {
            RawPayload::Html(body) => body.trim().is_empty(),
            RawPayload::Json(value) => match value {
                serde_json::Value::Null => true,
                serde_json::Value::Array(items) => items.is_empty(),
                serde_json::Value::Object(map) => map.is_empty(),
                serde_json::Value::String(s) => s.trim().is_empty(),
                _ => false,
            },
        }
    }
}

/// 单个目标的原始抓取结果，仅在一次流水线运行中存在
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawScrapeResult {
    pub site_id: String,
    pub region: String,
    pub source_url: String,
    pub raw_payload: RawPayload,
    pub fetched_at: DateTime<Utc>,
    /// HTTP状态码
    pub status: u16,
}

/// 货币（ISO 4217）
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Usd,
    Gbp,
    Eur,
    Cad,
    Aud,
    Inr,
    Brl,
    Jpy,
    Cny,
}

impl Currency {
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Gbp => "GBP",
            Currency::Eur => "EUR",
            Currency::Cad => "CAD",
            Currency::Aud => "AUD",
            Currency::Inr => "INR",
            Currency::Brl => "BRL",
            Currency::Jpy => "JPY",
            Currency::Cny => "CNY",
        }
    }

    /// 地区的默认货币
    pub fn for_region(region: &str) -> Option<Self> {
        match region.trim().to_ascii_uppercase().as_str() {
            "US" => Some(Currency::Usd),
            "UK" | "GB" => Some(Currency::Gbp),
            "EU" | "DE" | "FR" | "IT" | "ES" | "NL" => Some(Currency::Eur),
            "CA" => Some(Currency::Cad),
            "AU" => Some(Currency::Aud),
            "IN" => Some(Currency::Inr),
            "BR" => Some(Currency::Brl),
            "JP" => Some(Currency::Jpy),
            "CN" => Some(Currency::Cny),
            _ => None,
        }
    }

    /// 根据价格文本中的符号识别货币
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Self::from_symbol_in_region(symbol, None)
    }

    /// 根据符号识别货币，多义符号优先取地区默认货币
    ///
    /// "¥" 在中国地区是人民币，"$" 在加拿大和澳大利亚地区是当地元。
    pub fn from_symbol_in_region(symbol: &str, region_currency: Option<Currency>) -> Option<Self> {
        match (symbol.trim(), region_currency) {
            ("¥", Some(Currency::Cny)) => Some(Currency::Cny),
            ("$", Some(local @ (Currency::Cad | Currency::Aud))) => Some(local),
            (symbol, _) => Self::from_unambiguous_symbol(symbol),
        }
    }

    fn from_unambiguous_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "R$" => Some(Currency::Brl),
            "US$" | "$" => Some(Currency::Usd),
            "C$" | "CA$" => Some(Currency::Cad),
            "A$" | "AU$" => Some(Currency::Aud),
            "£" => Some(Currency::Gbp),
            "€" => Some(Currency::Eur),
            "₹" => Some(Currency::Inr),
            "¥" => Some(Currency::Jpy),
            other => other.parse().ok(),
        }
    }
}

impl Display for Currency {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USD" => Ok(Currency::Usd),
            "GBP" => Ok(Currency::Gbp),
            "EUR" => Ok(Currency::Eur),
            "CAD" => Ok(Currency::Cad),
            "AUD" => Ok(Currency::Aud),
            "INR" => Ok(Currency::Inr),
            "BRL" => Ok(Currency::Brl),
            "JPY" => Ok(Currency::Jpy),
            "CNY" | "RMB" => Ok(Currency::Cny),
            _ => Err(format!("Unknown currency code: {}", s)),
        }
    }
}

/// 价格记录不满足不变量
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RecordError {
    #[error("price must be a finite non-negative number, got {0}")]
    InvalidPrice(f64),
    #[error("observation time {0} lies in the future")]
    FutureObservation(DateTime<Utc>),
    #[error("device model must not be empty")]
    EmptyDeviceModel,
}

/// 标准化后的价格记录
///
/// 构造时保证 `price >= 0`、货币为已知ISO代码、`observed_at <= now`。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CanonicalPriceRecord {
    pub device_model: String,
    pub vendor: String,
    pub region: String,
    pub price: f64,
    pub currency: Currency,
    pub observed_at: DateTime<Utc>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub source_url: Option<String>,
}

impl CanonicalPriceRecord {
    pub fn new(
        device_model: impl Into<String>,
        vendor: impl Into<String>,
        region: impl Into<String>,
        price: f64,
        currency: Currency,
        observed_at: DateTime<Utc>,
    ) -> Result<Self, RecordError> {
        let device_model = device_model.into();
        if device_model.trim().is_empty() {
            return Err(RecordError::EmptyDeviceModel);
        }
        if !price.is_finite() || price < 0.0 {
            return Err(RecordError::InvalidPrice(price));
        }
        if observed_at > Utc::now() {
            return Err(RecordError::FutureObservation(observed_at));
        }

        Ok(Self {
            device_model,
            vendor: vendor.into(),
            region: region.into().to_ascii_uppercase(),
            price,
            currency,
            observed_at,
            title: None,
            source_url: None,
        })
    }

    pub fn with_title(mut self, title: Option<String>) -> Self {
        self.title = title;
        self
    }

    pub fn with_source_url(mut self, source_url: Option<String>) -> Self {
        self.source_url = source_url;
        self
    }
}

/// 抓取错误分类
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ScrapeErrorKind {
    Transient,
    SiteStructureChanged,
    Blocked,
    Unknown,
}

impl Display for ScrapeErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ScrapeErrorKind::Transient => "transient",
            ScrapeErrorKind::SiteStructureChanged => "site_structure_changed",
            ScrapeErrorKind::Blocked => "blocked",
            ScrapeErrorKind::Unknown => "unknown",
        };
        write!(f, "{}", name)
    }
}

/// 单个目标的最终结果
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TargetOutcome {
    Succeeded,
    Failed,
    /// 运行超时时尚未完成的目标
    Cancelled,
}

/// 单个目标的状态记录
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TargetStatus {
    pub site_id: String,
    pub region: String,
    pub outcome: TargetOutcome,
    pub attempts: u32,
    pub records: usize,
    #[serde(default)]
    pub error_kind: Option<ScrapeErrorKind>,
    #[serde(default)]
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl TargetStatus {
    pub fn is_success(&self) -> bool {
        self.outcome == TargetOutcome::Succeeded
    }
}
