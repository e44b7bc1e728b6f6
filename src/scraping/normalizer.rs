//! 将各站点的异构抓取结果转换为标准价格记录

use std::collections::HashSet;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;

use crate::types::{CanonicalPriceRecord, Currency, RawPayload, RawScrapeResult};

/// 标准化失败原因
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NormalizationError {
    #[error("unexpected HTTP status {0}")]
    HttpStatus(u16),
    #[error("payload is empty")]
    EmptyPayload,
    #[error("page is a bot challenge ({0})")]
    BotChallenge(String),
    #[error("unrecognized payload shape: {0}")]
    UnrecognizedShape(String),
    #[error("no usable price found in payload")]
    NoPriceFound,
}

static PRICE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(R\$|US\$|CA\$|AU\$|C\$|A\$|\$|£|€|₹|¥|USD|EUR|GBP|BRL|INR|CAD|AUD|JPY)?\s*(\d[\d.,\x{a0}\x{202f}]*\d|\d)\s*(USD|EUR|GBP|BRL|INR|CAD|AUD|JPY|€)?",
    )
    .expect("price pattern is valid")
});

const BOT_MARKERS: &[&str] = &[
    "captcha",
    "robot check",
    "are you a robot",
    "unusual traffic",
    "access denied",
];

/// 型号变体词，标题中出现而查询中没有时视为其他机型
const VARIANT_TOKENS: &[&str] = &["pro", "max", "plus", "ultra", "mini", "lite", "fe"];

/// 配件关键词
const ACCESSORY_TOKENS: &[&str] = &[
    "case",
    "cover",
    "charger",
    "protector",
    "cable",
    "adapter",
];

fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid built-in selector {}: {:?}", css, e))
}

static CONTAINER_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    selector(
        "[data-component-type='s-search-result'], .product-item, .product-card, .product-container, .sku-item, li.product",
    )
});
static TITLE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| selector("h2, h3, .product-title, .product-name, .title, .name"));
static PRICE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    selector(".a-price .a-offscreen, [itemprop='price'], .price, .product-price, .current-price, .sale-price")
});
static LINK_SELECTOR: LazyLock<Selector> = LazyLock::new(|| selector("a[href]"));
static HEADING_SELECTOR: LazyLock<Selector> = LazyLock::new(|| selector("h1"));
static PAGE_TITLE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| selector("title"));
static CHALLENGE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| selector("img[src], form[action]"));

/// 从载荷中识别出的候选报价
#[derive(Debug, Clone, PartialEq)]
struct Candidate {
    title: Option<String>,
    price: f64,
    currency: Option<Currency>,
    url: Option<String>,
    vendor: Option<String>,
    observed_at: Option<DateTime<Utc>>,
}

/// 结果标准化器
#[derive(Debug, Clone, Default)]
pub struct ResultNormalizer;

impl ResultNormalizer {
    pub fn new() -> Self {
        Self
    }

    /// 将原始抓取结果转换为标准价格记录，至少产出一条记录才算成功
    pub fn normalize(
        &self,
        device_model: &str,
        raw: &RawScrapeResult,
    ) -> Result<Vec<CanonicalPriceRecord>, NormalizationError> {
        if !(200..300).contains(&raw.status) {
            return Err(NormalizationError::HttpStatus(raw.status));
        }
        if raw.raw_payload.is_empty() {
            return Err(NormalizationError::EmptyPayload);
        }

        let region_currency = Currency::for_region(&raw.region);
        let candidates = match &raw.raw_payload {
            RawPayload::Json(value) => json_candidates(value, region_currency)?,
            RawPayload::Html(body) => html_candidates(body, &raw.source_url, region_currency)?,
        };

        let now = Utc::now();
        let default_currency = region_currency.unwrap_or(Currency::Usd);
        let mut seen_urls = HashSet::new();
        let mut records = Vec::new();

        for candidate in candidates {
            if let Some(title) = &candidate.title
                && !is_relevant(title, device_model)
            {
                tracing::debug!(site_id = %raw.site_id, title = %title, "跳过不相关的商品");
                continue;
            }
            if let Some(url) = &candidate.url
                && !seen_urls.insert(url.clone())
            {
                continue;
            }

            let observed_at = candidate
                .observed_at
                .unwrap_or(raw.fetched_at)
                .min(raw.fetched_at)
                .min(now);

            match CanonicalPriceRecord::new(
                device_model,
                candidate.vendor.unwrap_or_else(|| raw.site_id.clone()),
                raw.region.clone(),
                candidate.price,
                candidate.currency.unwrap_or(default_currency),
                observed_at,
            ) {
                Ok(record) => records.push(
                    record
                        .with_title(candidate.title)
                        .with_source_url(candidate.url.or_else(|| Some(raw.source_url.clone()))),
                ),
                Err(e) => {
                    tracing::debug!(site_id = %raw.site_id, "丢弃无效价格记录: {}", e);
                }
            }
        }

        if records.is_empty() {
            return Err(NormalizationError::NoPriceFound);
        }
        Ok(records)
    }
}

fn json_candidates(
    value: &Value,
    region_currency: Option<Currency>,
) -> Result<Vec<Candidate>, NormalizationError> {
    let items: Vec<&Value> = match value {
        Value::Array(items) => items.iter().collect(),
        Value::Object(map) => {
            let list = ["results", "items", "data", "products", "offers"]
                .iter()
                .find_map(|key| map.get(*key).and_then(Value::as_array));
            match list {
                Some(items) => items.iter().collect(),
                None if map.contains_key("price") => vec![value],
                None => {
                    return Err(NormalizationError::UnrecognizedShape(
                        "object without a product list or price".to_string(),
                    ));
                }
            }
        }
        _ => {
            return Err(NormalizationError::UnrecognizedShape(
                "expected a JSON array or object".to_string(),
            ));
        }
    };

    Ok(items
        .into_iter()
        .filter_map(|item| json_candidate(item, region_currency))
        .collect())
}

fn json_candidate(item: &Value, region_currency: Option<Currency>) -> Option<Candidate> {
    let obj = item.as_object()?;
    let (price, symbol_currency) = match obj.get("price")? {
        Value::Number(n) => (n.as_f64()?, None),
        Value::String(s) => parse_price_in_region(s, region_currency)?,
        Value::Object(inner) => {
            let amount = inner.get("amount").or_else(|| inner.get("value"))?;
            let price = match amount {
                Value::Number(n) => n.as_f64()?,
                Value::String(s) => parse_price_in_region(s, region_currency)?.0,
                _ => return None,
            };
            let currency = inner
                .get("currency")
                .and_then(Value::as_str)
                .and_then(|c| c.parse().ok());
            (price, currency)
        }
        _ => return None,
    };

    let text = |keys: &[&str]| {
        keys.iter()
            .find_map(|key| obj.get(*key).and_then(Value::as_str))
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    };

    let currency = text(&["currency"])
        .and_then(|c| c.parse::<Currency>().ok())
        .or(symbol_currency);

    Some(Candidate {
        title: text(&["title", "product", "name"]),
        price,
        currency,
        url: text(&["url", "link"]),
        vendor: text(&["store", "vendor", "seller", "source"]),
        observed_at: text(&["observed_at", "date", "timestamp"]).and_then(|s| parse_timestamp(&s)),
    })
}

fn html_candidates(
    body: &str,
    source_url: &str,
    region_currency: Option<Currency>,
) -> Result<Vec<Candidate>, NormalizationError> {
    let document = Html::parse_document(body);
    let mut candidates: Vec<Candidate> = document
        .select(&CONTAINER_SELECTOR)
        .filter_map(|container| html_candidate(container, source_url, region_currency))
        .collect();

    if !candidates.is_empty() {
        return Ok(candidates);
    }

    if let Some(marker) = challenge_marker(&document) {
        return Err(NormalizationError::BotChallenge(marker));
    }

    // 单商品详情页：没有列表容器时取页面标题和首个价格
    if let Some(price_el) = document.select(&PRICE_SELECTOR).next()
        && let Some((price, currency)) = element_price(price_el, region_currency)
    {
        candidates.push(Candidate {
            title: document.select(&HEADING_SELECTOR).next().map(element_text),
            price,
            currency,
            url: None,
            vendor: None,
            observed_at: None,
        });
    }

    Ok(candidates)
}

/// 只看页面标题和验证码图片/表单，正文里的脚本或页脚文字不算
fn challenge_marker(document: &Html) -> Option<String> {
    if let Some(title) = document.select(&PAGE_TITLE_SELECTOR).next() {
        let title = element_text(title).to_lowercase();
        if let Some(marker) = BOT_MARKERS.iter().find(|m| title.contains(**m)) {
            return Some(marker.to_string());
        }
    }

    document.select(&CHALLENGE_SELECTOR).find_map(|el| {
        let attr = el.value().attr("src").or_else(|| el.value().attr("action"))?;
        attr.to_lowercase()
            .contains("captcha")
            .then(|| format!("captcha {}", el.value().name()))
    })
}

fn html_candidate(
    container: ElementRef<'_>,
    source_url: &str,
    region_currency: Option<Currency>,
) -> Option<Candidate> {
    let (price, currency) = container
        .select(&PRICE_SELECTOR)
        .find_map(|el| element_price(el, region_currency))?;
    let title = container
        .select(&TITLE_SELECTOR)
        .next()
        .map(element_text)
        .filter(|t| !t.is_empty());
    let url = container
        .select(&LINK_SELECTOR)
        .next()
        .and_then(|a| a.value().attr("href"))
        .and_then(|href| resolve_url(source_url, href));

    Some(Candidate {
        title,
        price,
        currency,
        url,
        vendor: None,
        observed_at: None,
    })
}

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn element_price(
    element: ElementRef<'_>,
    region_currency: Option<Currency>,
) -> Option<(f64, Option<Currency>)> {
    if let Some(content) = element.value().attr("content")
        && let Some(parsed) = parse_price_in_region(content, region_currency)
    {
        return Some(parsed);
    }
    parse_price_in_region(&element_text(element), region_currency)
}

fn resolve_url(base: &str, href: &str) -> Option<String> {
    match reqwest::Url::parse(href) {
        Ok(url) => Some(url.to_string()),
        Err(_) => reqwest::Url::parse(base)
            .ok()?
            .join(href)
            .ok()
            .map(|u| u.to_string()),
    }
}

fn words(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// 商品标题需包含设备型号中的全部关键词
///
/// 查询里没有的变体词（Pro、Max等）说明是另一款机型，配件词说明不是手机本身。
pub(crate) fn is_relevant(title: &str, device_model: &str) -> bool {
    let title_words = words(title);
    let model_words = words(device_model);
    if model_words.is_empty() || !model_words.is_subset(&title_words) {
        return false;
    }

    let foreign = |token: &&str| title_words.contains(*token) && !model_words.contains(*token);
    !VARIANT_TOKENS.iter().any(foreign) && !ACCESSORY_TOKENS.iter().any(foreign)
}

fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// 解析价格文本，例如 "$1,049.99"、"R$ 4.999,00"、"899 €"
///
/// 文本中有多个数字时，优先取带货币标记的那个。
pub fn parse_price_text(text: &str) -> Option<(f64, Option<Currency>)> {
    parse_price_in_region(text, None)
}

/// 同 [`parse_price_text`]，"$"、"¥" 这类多义符号按地区默认货币解释
pub fn parse_price_in_region(
    text: &str,
    region_currency: Option<Currency>,
) -> Option<(f64, Option<Currency>)> {
    let mut first_plain = None;
    for caps in PRICE_PATTERN.captures_iter(text) {
        let Some(amount) = caps.get(2).and_then(|m| parse_amount(m.as_str())) else {
            continue;
        };
        let currency = caps
            .get(1)
            .or_else(|| caps.get(3))
            .and_then(|m| {
                Currency::from_symbol_in_region(&m.as_str().to_ascii_uppercase(), region_currency)
            });
        if currency.is_some() {
            return Some((amount, currency));
        }
        first_plain.get_or_insert((amount, None));
    }
    first_plain
}

/// 按千分位与小数点习惯解析数字
fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();

    let normalized = match (cleaned.rfind('.'), cleaned.rfind(',')) {
        (Some(dot), Some(comma)) => {
            if comma > dot {
                cleaned.replace('.', "").replace(',', ".")
            } else {
                cleaned.replace(',', "")
            }
        }
        (None, Some(comma)) => {
            let decimals = cleaned.len() - comma - 1;
            if decimals <= 2 && cleaned.matches(',').count() == 1 {
                cleaned.replace(',', ".")
            } else {
                cleaned.replace(',', "")
            }
        }
        (Some(dot), None) => {
            let decimals = cleaned.len() - dot - 1;
            if cleaned.matches('.').count() > 1 || decimals == 3 {
                cleaned.replace('.', "")
            } else {
                cleaned
            }
        }
        (None, None) => cleaned,
    };

    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}
