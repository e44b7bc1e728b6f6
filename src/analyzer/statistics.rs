use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use chrono::NaiveDate;

use crate::types::{AnalysisInput, BestOffer, CanonicalPriceRecord, Currency, PriceStatistics};

/// 与同币种最低价相差不超过该比例时视为最低价
const NEAR_LOWEST_PCT: f64 = 1.5;
const MAX_VALUE_SCORE: f64 = 50.0;

/// 记录数最多的货币，数量相同时取代码靠前者
pub fn dominant_currency<'a>(
    records: impl IntoIterator<Item = &'a CanonicalPriceRecord>,
) -> Option<Currency> {
    let mut counts: HashMap<Currency, usize> = HashMap::new();
    for record in records {
        *counts.entry(record.currency).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .max_by(|(ca, na), (cb, nb)| na.cmp(nb).then_with(|| cb.cmp(ca)))
        .map(|(currency, _)| currency)
}

fn buckets_in(
    records: &[&CanonicalPriceRecord],
    currency: Currency,
) -> BTreeMap<NaiveDate, Vec<f64>> {
    let mut buckets: BTreeMap<NaiveDate, Vec<f64>> = BTreeMap::new();
    for record in records.iter().filter(|r| r.currency == currency) {
        buckets
            .entry(record.observed_at.date_naive())
            .or_default()
            .push(record.price);
    }
    buckets
}

/// 按观测日期（UTC）分组的价格，仅包含主要货币
pub fn daily_buckets(input: &AnalysisInput) -> (Option<Currency>, BTreeMap<NaiveDate, Vec<f64>>) {
    let records = input.chronological();
    match dominant_currency(records.iter().copied()) {
        Some(currency) => (Some(currency), buckets_in(&records, currency)),
        None => (None, BTreeMap::new()),
    }
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn summarize(records: &[&CanonicalPriceRecord]) -> Option<PriceStatistics> {
    let currency = dominant_currency(records.iter().copied())?;
    let buckets = buckets_in(records, currency);
    let prices: Vec<f64> = buckets.values().flatten().copied().collect();
    if prices.is_empty() {
        return None;
    }

    let avg = mean(&prices);
    let min = prices.iter().copied().fold(f64::INFINITY, f64::min);
    let max = prices.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let std_dev = if prices.len() > 1 {
        let variance = prices.iter().map(|p| (p - avg).powi(2)).sum::<f64>()
            / (prices.len() - 1) as f64;
        variance.sqrt()
    } else {
        0.0
    };
    let latest = buckets
        .values()
        .next_back()
        .map(|day| mean(day))
        .unwrap_or(avg);

    let matching: Vec<&CanonicalPriceRecord> = records
        .iter()
        .copied()
        .filter(|r| r.currency == currency)
        .collect();
    let vendor_count = matching
        .iter()
        .map(|r| r.vendor.as_str())
        .collect::<HashSet<_>>()
        .len();
    let regions: BTreeSet<&str> = matching.iter().map(|r| r.region.as_str()).collect();

    Some(PriceStatistics {
        currency,
        count: prices.len(),
        mean: avg,
        min,
        max,
        latest,
        std_dev,
        vendor_count,
        regions: regions.into_iter().map(str::to_string).collect(),
    })
}

/// 计算价格统计，`latest` 为最近一天的平均价格
///
/// 只统计主要货币的记录，`regions` 记录了这些记录来自哪些地区。
pub fn compute_statistics(input: &AnalysisInput) -> Option<PriceStatistics> {
    summarize(&input.chronological())
}

/// 按地区分别统计，每个地区使用自己的主要货币
pub fn regional_statistics(input: &AnalysisInput) -> BTreeMap<String, PriceStatistics> {
    input
        .regions
        .iter()
        .filter_map(|(region, group)| {
            let records: Vec<&CanonicalPriceRecord> = group.iter().collect();
            summarize(&records).map(|stats| (region.clone(), stats))
        })
        .collect()
}

fn value_score(price: f64, lowest: f64) -> f64 {
    let diff_pct = (price - lowest) / (lowest + 0.01) * 100.0;
    let score = if diff_pct < NEAR_LOWEST_PCT {
        MAX_VALUE_SCORE
    } else {
        MAX_VALUE_SCORE * (1.0 - (diff_pct / 20.0).min(0.9))
    };
    (score * 100.0).round() / 100.0
}

/// 每个商家在每个地区的最低报价，按性价比排序
///
/// 评分只在同一货币内比较：接近该货币最低价得满分，价差每多1%扣2.5分，最低5分。
/// 主要货币的报价排在前面，其余货币按代码分组。
pub fn best_offers(input: &AnalysisInput) -> Vec<BestOffer> {
    let mut lowest: BTreeMap<(&str, &str), &CanonicalPriceRecord> = BTreeMap::new();
    for record in input.regions.values().flatten() {
        lowest
            .entry((record.vendor.as_str(), record.region.as_str()))
            .and_modify(|best| {
                if record.price < best.price {
                    *best = record;
                }
            })
            .or_insert(record);
    }

    let mut floors: HashMap<Currency, f64> = HashMap::new();
    for record in lowest.values() {
        let floor = floors.entry(record.currency).or_insert(record.price);
        *floor = floor.min(record.price);
    }

    let dominant = dominant_currency(input.regions.values().flatten());
    let mut offers: Vec<BestOffer> = lowest
        .into_values()
        .map(|record| {
            let floor = floors.get(&record.currency).copied().unwrap_or(record.price);
            BestOffer {
                vendor: record.vendor.clone(),
                region: record.region.clone(),
                price: record.price,
                currency: record.currency,
                url: record.source_url.clone(),
                value_score: value_score(record.price, floor),
            }
        })
        .collect();

    offers.sort_by(|a, b| {
        (Some(a.currency) != dominant)
            .cmp(&(Some(b.currency) != dominant))
            .then_with(|| a.currency.cmp(&b.currency))
            .then_with(|| b.value_score.total_cmp(&a.value_score))
            .then_with(|| a.price.total_cmp(&b.price))
            .then_with(|| a.vendor.cmp(&b.vendor))
            .then_with(|| a.region.cmp(&b.region))
    });
    offers
}
