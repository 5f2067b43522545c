//! Shared arguments: where the data comes from and which segment to look at.

use std::path::{Path, PathBuf};

use clap::Args;
use serde_json::json;
use souq_core::{
    AppState, Category, Channel, City, DefectRates, GeneratorConfig, LogCategory, Scope,
    SegmentFilter, TableKind,
};

use crate::config::AppConfig;
use crate::output;

/// Synthetic generation overrides. Unset flags fall back to the config file.
#[derive(Args, Debug, Clone, Default)]
pub struct GenerateArgs {
    /// Random seed; the same seed always produces the same tables
    #[arg(long)]
    pub seed: Option<u64>,

    /// Number of sales rows before duplicates are injected
    #[arg(long)]
    pub sales: Option<usize>,

    /// Number of products
    #[arg(long)]
    pub products: Option<usize>,

    /// Number of stores
    #[arg(long)]
    pub stores: Option<usize>,

    /// Number of campaigns
    #[arg(long)]
    pub campaigns: Option<usize>,

    /// Length of the sales history in days
    #[arg(long)]
    pub days: Option<u32>,

    /// Generate clean data with no injected defects
    #[arg(long)]
    pub no_defects: bool,
}

impl GenerateArgs {
    pub fn apply(&self, base: &GeneratorConfig) -> GeneratorConfig {
        let mut config = base.clone();
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(sales) = self.sales {
            config.num_sales = sales;
        }
        if let Some(products) = self.products {
            config.num_products = products;
        }
        if let Some(stores) = self.stores {
            config.num_stores = stores;
        }
        if let Some(campaigns) = self.campaigns {
            config.num_campaigns = campaigns;
        }
        if let Some(days) = self.days {
            config.days_of_data = days;
        }
        if self.no_defects {
            config.defects = DefectRates::none();
        }
        config
    }
}

/// Input selection: a directory of table files, or synthetic data.
#[derive(Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// Directory holding products/stores/sales/inventory/campaigns as .csv, .xlsx, .xls or .ods.
    /// Without it, a synthetic dataset is generated.
    #[arg(long, value_name = "DIR")]
    pub data: Option<PathBuf>,

    #[command(flatten)]
    pub generate: GenerateArgs,
}

/// Segment selection; each dimension defaults to All.
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// City (Dubai, Abu Dhabi, Sharjah, or any known spelling such as DXB)
    #[arg(long, value_parser = parse_city)]
    pub city: Option<Scope<City>>,

    /// Channel (App, Web, Marketplace)
    #[arg(long, value_parser = parse_channel)]
    pub channel: Option<Scope<Channel>>,

    /// Product category (Electronics, Fashion, Grocery, "Home & Garden", Beauty, Sports)
    #[arg(long, value_parser = parse_category)]
    pub category: Option<Scope<Category>>,
}

impl FilterArgs {
    pub fn filter(&self) -> SegmentFilter {
        SegmentFilter {
            city: self.city.unwrap_or_default(),
            channel: self.channel.unwrap_or_default(),
            category: self.category.unwrap_or_default(),
        }
    }
}

fn parse_city(raw: &str) -> Result<Scope<City>, String> {
    Scope::parse_with(raw, City::lookup).ok_or_else(|| format!("unknown city '{raw}'"))
}

fn parse_channel(raw: &str) -> Result<Scope<Channel>, String> {
    Scope::parse_with(raw, Channel::from_label).ok_or_else(|| format!("unknown channel '{raw}'"))
}

fn parse_category(raw: &str) -> Result<Scope<Category>, String> {
    Scope::parse_with(raw, Category::from_label).ok_or_else(|| format!("unknown category '{raw}'"))
}

/// Fill `state` from the selected source.
pub fn load(state: &mut AppState, source: &SourceArgs, config: &AppConfig) -> anyhow::Result<()> {
    match &source.data {
        Some(dir) => load_dir(state, dir),
        None => {
            state.generate(&source.generate.apply(&config.generator))?;
            Ok(())
        }
    }
}

fn load_dir(state: &mut AppState, dir: &Path) -> anyhow::Result<()> {
    let outcome = souq_io::load_dir(dir)?;

    for failure in &outcome.failures {
        output::warn(format!(
            "{} ({}): {}",
            failure.table,
            failure.path.display(),
            failure.error
        ));
        state.log_mut().error(
            LogCategory::DataInput,
            format!("failed to load {}", failure.table),
            json!({
                "path": failure.path.display().to_string(),
                "error": failure.error.to_string(),
            }),
        );
    }
    if outcome.loaded() == 0 {
        anyhow::bail!("no loadable tables found in {}", dir.display());
    }

    let missing: Vec<&str> = outcome.missing.iter().map(TableKind::name).collect();
    state.log_mut().info(
        LogCategory::DataInput,
        format!("loaded {} table(s) from {}", outcome.loaded(), dir.display()),
        json!({ "missing": missing }),
    );

    for failure in state.ingest(&outcome.raw) {
        output::warn(format!("{}: {}", failure.table, failure.error.with_hint()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_parsing() {
        assert_eq!(parse_city("DXB"), Ok(Scope::Only(City::Dubai)));
        assert_eq!(parse_city("all"), Ok(Scope::All));
        assert!(parse_city("Paris").is_err());
        assert_eq!(parse_category("home & garden"), Ok(Scope::Only(Category::HomeGarden)));
        assert_eq!(parse_channel("web"), Ok(Scope::Only(Channel::Web)));
    }

    #[test]
    fn test_generate_overrides() {
        let args = GenerateArgs {
            seed: Some(9),
            sales: Some(100),
            no_defects: true,
            ..GenerateArgs::default()
        };
        let config = args.apply(&GeneratorConfig::default());
        assert_eq!(config.seed, 9);
        assert_eq!(config.num_sales, 100);
        assert_eq!(config.defects, DefectRates::none());
        assert_eq!(config.num_stores, GeneratorConfig::default().num_stores);
    }
}
