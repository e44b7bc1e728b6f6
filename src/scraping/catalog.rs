//! 商家站点目录：各地区的零售商、品牌官网以及搜索URL模板

/// 品牌
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Brand {
    Apple,
    Samsung,
    Google,
    Xiaomi,
    Huawei,
    OnePlus,
    Motorola,
}

impl Brand {
    pub fn as_str(&self) -> &'static str {
        match self {
            Brand::Apple => "apple",
            Brand::Samsung => "samsung",
            Brand::Google => "google",
            Brand::Xiaomi => "xiaomi",
            Brand::Huawei => "huawei",
            Brand::OnePlus => "oneplus",
            Brand::Motorola => "motorola",
        }
    }
}

/// 产品类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductCategory {
    Phone,
    Tablet,
    Laptop,
    Wearable,
}

impl ProductCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductCategory::Phone => "smartphone",
            ProductCategory::Tablet => "tablet",
            ProductCategory::Laptop => "laptop",
            ProductCategory::Wearable => "wearable",
        }
    }
}

/// 品牌关键词，按匹配优先级排列
const BRAND_KEYWORDS: &[(Brand, &[&str])] = &[
    (Brand::Apple, &["iphone", "ipad", "macbook", "imac", "apple"]),
    (Brand::Samsung, &["galaxy", "samsung"]),
    (Brand::Google, &["pixel", "google"]),
    (Brand::Xiaomi, &["xiaomi", "redmi", "poco", "mi"]),
    (Brand::Huawei, &["huawei", "mate", "nova"]),
    (Brand::OnePlus, &["oneplus", "nord"]),
    (Brand::Motorola, &["motorola", "moto", "razr"]),
];

const CATEGORY_KEYWORDS: &[(ProductCategory, &[&str])] = &[
    (ProductCategory::Tablet, &["ipad", "tab", "tablet"]),
    (ProductCategory::Laptop, &["macbook", "laptop", "notebook", "chromebook"]),
    (ProductCategory::Wearable, &["watch", "band", "buds", "airpods"]),
];

/// 各国主流零售商
fn country_sites(region: &str) -> Option<&'static [&'static str]> {
    let sites: &'static [&'static str] = match region {
        "US" => &[
            "amazon.com",
            "bestbuy.com",
            "walmart.com",
            "target.com",
            "bhphotovideo.com",
        ],
        "UK" | "GB" => &["amazon.co.uk", "currys.co.uk", "argos.co.uk", "johnlewis.com"],
        "CA" => &["amazon.ca", "bestbuy.ca", "walmart.ca"],
        "AU" => &["amazon.com.au", "jbhifi.com.au", "harveynorman.com.au"],
        "IN" => &["amazon.in", "flipkart.com", "croma.com"],
        "BR" => &[
            "amazon.com.br",
            "magazineluiza.com.br",
            "americanas.com.br",
            "kabum.com.br",
        ],
        "EU" | "DE" => &["amazon.de", "mediamarkt.de", "saturn.de", "otto.de"],
        _ => return None,
    };
    Some(sites)
}

/// 未知地区使用的国际站点
const INTERNATIONAL_SITES: &[&str] = &["amazon.com", "ebay.com"];

/// 品牌官网，按地区区分
fn brand_sites(brand: Brand, region: &str) -> Vec<String> {
    let domain = match brand {
        Brand::Apple => "apple.com",
        Brand::Samsung => "samsung.com",
        Brand::Google => "google.com/store",
        Brand::Xiaomi => "mi.com",
        Brand::Huawei => "consumer.huawei.com",
        Brand::OnePlus => "oneplus.com",
        Brand::Motorola => "motorola.com",
    };

    match region {
        "US" => vec![domain.to_string()],
        "UK" | "GB" | "CA" | "AU" | "IN" | "BR" | "DE" => {
            vec![format!("{}/{}", domain, region.to_ascii_lowercase())]
        }
        "EU" => vec![format!("{}/de", domain)],
        _ => vec![domain.to_string()],
    }
}

/// 站点搜索URL模板
pub fn url_template(site_id: &str) -> String {
    match site_id {
        "amazon.com" => "https://www.amazon.com/s?k={query}".to_string(),
        "bestbuy.com" => "https://www.bestbuy.com/site/searchpage.jsp?st={query}".to_string(),
        "walmart.com" => "https://www.walmart.com/search?q={query}".to_string(),
        "target.com" => "https://www.target.com/s?searchTerm={query}".to_string(),
        "amazon.com.br" => "https://www.amazon.com.br/s?k={query}".to_string(),
        "magazineluiza.com.br" => "https://www.magazineluiza.com.br/busca/{query}/".to_string(),
        "americanas.com.br" => "https://www.americanas.com.br/busca/{query}".to_string(),
        "kabum.com.br" => "https://www.kabum.com.br/busca/{query}".to_string(),
        "amazon.de" => "https://www.amazon.de/s?k={query}".to_string(),
        "mediamarkt.de" => "https://www.mediamarkt.de/de/search.html?query={query}".to_string(),
        "saturn.de" => "https://www.saturn.de/de/search.html?query={query}".to_string(),
        "otto.de" => "https://www.otto.de/suche/{query}/".to_string(),
        site if site.starts_with("amazon.") => format!("https://www.{}/s?k={{query}}", site),
        site => format!("https://www.{}/search?q={{query}}", site),
    }
}

/// 商家站点目录
#[derive(Debug, Clone, Default)]
pub struct SiteCatalog;

impl SiteCatalog {
    pub fn new() -> Self {
        Self
    }

    /// 根据设备型号识别品牌
    pub fn resolve_brand(&self, device_model: &str) -> Option<Brand> {
        let tokens = tokenize(device_model);
        BRAND_KEYWORDS
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|kw| matches_keyword(&tokens, kw)))
            .map(|(brand, _)| *brand)
    }

    /// 识别产品类别，默认为手机
    pub fn product_category(&self, device_model: &str) -> ProductCategory {
        let tokens = tokenize(device_model);
        CATEGORY_KEYWORDS
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|kw| matches_keyword(&tokens, kw)))
            .map(|(category, _)| *category)
            .unwrap_or(ProductCategory::Phone)
    }

    /// 指定地区下某品牌设备的候选站点，按目录顺序排列且不重复
    pub fn sites_for(&self, brand: Brand, region: &str) -> Vec<String> {
        let region = region.trim().to_ascii_uppercase();
        let retailers = country_sites(&region).unwrap_or(INTERNATIONAL_SITES);

        let mut sites: Vec<String> = Vec::new();
        for site in retailers
            .iter()
            .map(|s| s.to_string())
            .chain(brand_sites(brand, &region))
        {
            if !sites.contains(&site) {
                sites.push(site);
            }
        }
        sites
    }

    pub fn is_known_region(&self, region: &str) -> bool {
        country_sites(&region.trim().to_ascii_uppercase()).is_some()
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

/// 短关键词必须完全匹配，较长关键词允许作为前缀（如 "iphone15"）
fn matches_keyword(tokens: &[String], keyword: &str) -> bool {
    tokens.iter().any(|token| {
        if keyword.len() <= 3 {
            token == keyword
        } else {
            token.starts_with(keyword)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_brand() {
        let catalog = SiteCatalog::new();
        assert_eq!(catalog.resolve_brand("iPhone 15 Pro"), Some(Brand::Apple));
        assert_eq!(catalog.resolve_brand("Galaxy S24 Ultra"), Some(Brand::Samsung));
        assert_eq!(catalog.resolve_brand("Pixel 8"), Some(Brand::Google));
        assert_eq!(catalog.resolve_brand("Redmi Note 13"), Some(Brand::Xiaomi));
        assert_eq!(catalog.resolve_brand("Mi 14"), Some(Brand::Xiaomi));
        assert_eq!(catalog.resolve_brand("Nokia 3310"), None);
        assert_eq!(catalog.resolve_brand(""), None);
    }

    #[test]
    fn test_product_category() {
        let catalog = SiteCatalog::new();
        assert_eq!(catalog.product_category("iPad Air"), ProductCategory::Tablet);
        assert_eq!(catalog.product_category("Galaxy Watch 6"), ProductCategory::Wearable);
        assert_eq!(catalog.product_category("iPhone 15"), ProductCategory::Phone);
    }

    #[test]
    fn test_sites_for_region_include_brand_store() {
        let catalog = SiteCatalog::new();
        let us = catalog.sites_for(Brand::Apple, "us");
        assert_eq!(us.first().map(String::as_str), Some("amazon.com"));
        assert!(us.contains(&"apple.com".to_string()));

        let uk = catalog.sites_for(Brand::Samsung, "UK");
        assert!(uk.contains(&"samsung.com/uk".to_string()));

        let unknown = catalog.sites_for(Brand::Google, "ZZ");
        assert_eq!(unknown, vec!["amazon.com", "ebay.com", "google.com/store"]);
        assert!(!catalog.is_known_region("ZZ"));
    }

    #[test]
    fn test_url_templates() {
        assert_eq!(url_template("amazon.com"), "https://www.amazon.com/s?k={query}");
        assert_eq!(url_template("amazon.co.uk"), "https://www.amazon.co.uk/s?k={query}");
        assert_eq!(
            url_template("apple.com/uk"),
            "https://www.apple.com/uk/search?q={query}"
        );
    }
}
