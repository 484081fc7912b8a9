use std::collections::{HashMap, HashSet};

/// Settlement currency every screened symbol must be quoted in
pub const SETTLEMENT_ASSET: &str = "USDT";

/// Exchange status of a symbol that is open for trading
pub const TRADING_STATUS: &str = "TRADING";

/// Exchange metadata for a single symbol
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolMeta {
    pub symbol: String,
    pub status: String,
    pub quote_asset: String,
    /// `None` when the exchange omits the flag
    pub spot_trading_allowed: Option<bool>,
}

impl SymbolMeta {
    /// Actively trading, USDT-quoted and not explicitly barred from spot trading
    pub fn is_eligible(&self) -> bool {
        self.status == TRADING_STATUS
            && self.quote_asset == SETTLEMENT_ASSET
            && self.spot_trading_allowed != Some(false)
    }
}

/// 24h quote volume (and last price when reported) keyed by symbol
#[derive(Debug, Clone, Default)]
pub struct VolumeSnapshot {
    volumes: HashMap<String, f64>,
    last_prices: HashMap<String, f64>,
}

impl VolumeSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, symbol: String, quote_volume: f64, last_price: Option<f64>) {
        if let Some(price) = last_price {
            self.last_prices.insert(symbol.clone(), price);
        }
        self.volumes.insert(symbol, quote_volume);
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.volumes.contains_key(symbol)
    }

    /// Quote volume for `symbol`, 0.0 when absent
    pub fn volume(&self, symbol: &str) -> f64 {
        self.volumes.get(symbol).copied().unwrap_or(0.0)
    }

    pub fn last_price(&self, symbol: &str) -> Option<f64> {
        self.last_prices.get(symbol).copied()
    }

    pub fn len(&self) -> usize {
        self.volumes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.volumes.is_empty()
    }
}

/// Ordered, deduplicated set of symbols eligible for one screening run.
///
/// Every member has an entry in the `VolumeSnapshot` it was built against.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SymbolUniverse {
    symbols: Vec<String>,
}

impl SymbolUniverse {
    /// Keeps eligible metadata entries, in metadata order, that have a volume entry
    pub fn from_metadata(metadata: &[SymbolMeta], volumes: &VolumeSnapshot) -> Self {
        let mut seen = HashSet::new();
        let symbols = metadata
            .iter()
            .filter(|meta| meta.is_eligible() && volumes.contains(&meta.symbol))
            .filter(|meta| seen.insert(meta.symbol.clone()))
            .map(|meta| meta.symbol.clone())
            .collect();

        SymbolUniverse { symbols }
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}
