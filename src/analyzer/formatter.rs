use std::collections::{BTreeMap, HashSet};

use crate::types::{AnalysisInput, CanonicalPriceRecord};

const HEADER: &str = "Price Data:\n";

/// 格式化后的价格数据
#[derive(Debug, Clone, PartialEq)]
pub struct FormattedPrices {
    pub text: String,
    /// 写入文本的记录数
    pub included: usize,
    /// 因超出预算被省略的较早记录数
    pub omitted: usize,
}

/// 将价格记录渲染为用于提示词的紧凑文本，超出字符预算时优先丢弃最早的记录
#[derive(Debug, Clone)]
pub struct PriceFormatter {
    max_chars: usize,
}

impl PriceFormatter {
    pub fn new(max_chars: usize) -> Self {
        Self { max_chars }
    }

    pub fn format(&self, input: &AnalysisInput) -> FormattedPrices {
        let records = input.chronological();
        let total = records.len();
        let footer_reserve = omitted_footer(total).len();

        // 从最新的记录开始装入预算
        let mut used = HEADER.len();
        let mut regions_started: HashSet<&str> = HashSet::new();
        let mut kept: Vec<&CanonicalPriceRecord> = Vec::new();
        for record in records.iter().rev() {
            let mut cost = record_line(record).len();
            if !regions_started.contains(record.region.as_str()) {
                cost += region_header(&record.region).len();
            }
            let reserve = if kept.len() + 1 < total { footer_reserve } else { 0 };
            if used + cost + reserve > self.max_chars {
                break;
            }
            used += cost;
            regions_started.insert(record.region.as_str());
            kept.push(record);
        }

        let mut by_region: BTreeMap<&str, Vec<&CanonicalPriceRecord>> = BTreeMap::new();
        for record in kept.iter().rev() {
            by_region.entry(record.region.as_str()).or_default().push(record);
        }

        let mut text = String::from(HEADER);
        for (region, group) in &by_region {
            text.push_str(&region_header(region));
            for record in group {
                text.push_str(&record_line(record));
            }
        }

        let omitted = total - kept.len();
        if omitted > 0 {
            text.push_str(&omitted_footer(omitted));
        }

        FormattedPrices {
            text,
            included: kept.len(),
            omitted,
        }
    }
}

fn region_header(region: &str) -> String {
    format!("[{}]\n", region)
}

fn record_line(record: &CanonicalPriceRecord) -> String {
    format!(
        "- {} {}: {:.2} {}\n",
        record.observed_at.format("%Y-%m-%d %H:%M"),
        record.vendor,
        record.price,
        record.currency
    )
}

fn omitted_footer(omitted: usize) -> String {
    format!("({} older observations omitted)\n", omitted)
}
