use chrono::{DateTime, Utc};

use crate::config::{PlanningConfig, ScoringPolicy};
use crate::error::PlanningError;
use crate::history::{HistoryStore, SiteHistory};
use crate::scraping::SiteCatalog;
use crate::scraping::catalog::url_template;
use crate::types::{PriceQuery, ScrapeTarget};

/// 抓取目标规划
///
/// 根据设备型号解析品牌与候选站点，结合历史成功率排序。
/// 历史存储在运行期间只读。
pub struct PlanningAgent {
    catalog: SiteCatalog,
    config: PlanningConfig,
}

impl PlanningAgent {
    pub fn new(catalog: SiteCatalog, config: PlanningConfig) -> Self {
        Self { catalog, config }
    }

    pub fn catalog(&self) -> &SiteCatalog {
        &self.catalog
    }

    pub async fn execute(
        &self,
        query: &PriceQuery,
        history: &dyn HistoryStore,
    ) -> Result<Vec<ScrapeTarget>, PlanningError> {
        let device_model = query.device_model.trim();
        if device_model.is_empty() {
            return Err(PlanningError::EmptyDeviceModel);
        }

        let brand = self
            .catalog
            .resolve_brand(device_model)
            .ok_or_else(|| PlanningError::UnknownDevice(device_model.to_string()))?;

        let regions = self.effective_regions(query);
        tracing::info!(
            device_model,
            brand = brand.as_str(),
            "🧭 规划抓取目标，地区：{}",
            regions.join("、")
        );

        let vendor_filter: Option<Vec<String>> = query.vendors.as_ref().and_then(|vendors| {
            let normalized: Vec<String> = vendors
                .iter()
                .map(|v| v.trim().to_lowercase())
                .filter(|v| !v.is_empty())
                .collect();
            (!normalized.is_empty()).then_some(normalized)
        });

        let now = Utc::now();
        let mut targets = Vec::new();
        for region in &regions {
            for site_id in self.catalog.sites_for(brand, region) {
                if let Some(filter) = &vendor_filter {
                    let site = site_id.to_lowercase();
                    if !filter.iter().any(|vendor| site.contains(vendor.as_str())) {
                        continue;
                    }
                }

                let site_history = history.site_history(&site_id).await;
                let score = score_site(&self.config.scoring, site_history.as_ref(), now);
                targets.push(ScrapeTarget {
                    url_template: url_template(&site_id),
                    site_id,
                    region: region.clone(),
                    device_model: device_model.to_string(),
                    priority: 0,
                    score,
                    last_success_at: site_history.and_then(|h| h.last_success_at),
                });
            }
        }

        if targets.is_empty() {
            return Err(match vendor_filter {
                Some(_) => PlanningError::NoVendorSources {
                    device_model: device_model.to_string(),
                    vendors: query.vendors.clone().unwrap_or_default(),
                },
                None => PlanningError::UnknownDevice(device_model.to_string()),
            });
        }

        rank_targets(&mut targets);
        if let Some(max_targets) = self.config.max_targets {
            targets.truncate(max_targets.max(1));
        }
        for (index, target) in targets.iter_mut().enumerate() {
            target.priority = index as u32 + 1;
        }

        tracing::info!(
            device_model,
            "📋 共规划 {} 个抓取目标：{}",
            targets.len(),
            targets
                .iter()
                .map(|t| t.label())
                .collect::<Vec<_>>()
                .join("、")
        );
        Ok(targets)
    }

    /// 查询未指定地区时使用默认地区，统一为大写并去重
    fn effective_regions(&self, query: &PriceQuery) -> Vec<String> {
        let source = if query.regions.iter().any(|r| !r.trim().is_empty()) {
            &query.regions
        } else {
            &self.config.default_regions
        };

        let mut regions: Vec<String> = Vec::new();
        for region in source {
            let region = region.trim().to_ascii_uppercase();
            if !region.is_empty() && !regions.contains(&region) {
                regions.push(region);
            }
        }
        regions
    }
}

/// 站点评分，无历史数据时恰好为中性成功率
pub fn score_site(
    policy: &ScoringPolicy,
    history: Option<&SiteHistory>,
    now: DateTime<Utc>,
) -> f64 {
    let neutral = policy.neutral_success_rate;
    let Some(history) = history else {
        return neutral;
    };

    let rate = history.success_rate.clamp(0.0, 1.0);
    let n = history.attempts as f64;
    let k = policy.prior_weight.max(0.0);
    let shrunk = if n + k > 0.0 {
        (rate * n + neutral * k) / (n + k)
    } else {
        rate
    };

    let recency = match history.last_success_at {
        Some(at) if policy.recency_half_life_hours > 0.0 => {
            let age_hours = (now - at).num_seconds().max(0) as f64 / 3600.0;
            0.5f64.powf(age_hours / policy.recency_half_life_hours)
        }
        _ => 0.0,
    };

    let w = policy.recency_weight.clamp(0.0, 1.0);
    (1.0 - w) * shrunk + w * recency
}

/// 按评分降序排列，评分相同时最近成功者优先，稳定排序保持目录顺序
fn rank_targets(targets: &mut [ScrapeTarget]) {
    targets.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| match (a.last_success_at, b.last_success_at) {
                (Some(x), Some(y)) => y.cmp(&x),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            })
    });
}
