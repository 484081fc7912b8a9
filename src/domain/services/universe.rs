use serde_json::Value;
use tracing::debug;

use crate::domain::entities::market::{SymbolMeta, SymbolUniverse, VolumeSnapshot};

/// Extracts per-symbol metadata from an `exchangeInfo` document.
///
/// Entries without a symbol name are skipped.
pub fn parse_symbol_metadata(exchange_info: &Value) -> Vec<SymbolMeta> {
    let Some(symbols) = exchange_info.get("symbols").and_then(Value::as_array) else {
        return vec![];
    };

    symbols
        .iter()
        .filter_map(|entry| {
            let symbol = entry.get("symbol").and_then(Value::as_str)?;
            if symbol.is_empty() {
                return None;
            }
            Some(SymbolMeta {
                symbol: symbol.to_string(),
                status: string_field(entry, "status"),
                quote_asset: string_field(entry, "quoteAsset"),
                spot_trading_allowed: entry.get("isSpotTradingAllowed").and_then(Value::as_bool),
            })
        })
        .collect()
}

fn string_field(entry: &Value, key: &str) -> String {
    entry
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Builds the volume lookup from a 24h ticker array.
///
/// Entries missing a symbol or quote volume, or whose volume is not a finite
/// non-negative number, are dropped.
pub fn parse_volume_snapshot(ticker_24h: &Value) -> VolumeSnapshot {
    let mut snapshot = VolumeSnapshot::new();
    let Some(entries) = ticker_24h.as_array() else {
        return snapshot;
    };

    let mut dropped = 0usize;
    for entry in entries {
        let symbol = entry.get("symbol").and_then(Value::as_str);
        let volume = entry.get("quoteVolume").and_then(parse_number);

        match (symbol, volume) {
            (Some(symbol), Some(volume)) if !symbol.is_empty() && volume >= 0.0 => {
                let last_price = entry.get("lastPrice").and_then(parse_number);
                snapshot.insert(symbol.to_string(), volume, last_price);
            }
            _ => dropped += 1,
        }
    }

    if dropped > 0 {
        debug!(dropped = dropped, "Skipped unusable 24h ticker entries");
    }

    snapshot
}

/// The exchange sends decimals as strings; plain JSON numbers are accepted too
fn parse_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::String(text) => text.trim().parse::<f64>().ok()?,
        Value::Number(number) => number.as_f64()?,
        _ => return None,
    };
    number.is_finite().then_some(number)
}

/// Combines metadata and ticker into the working universe and its volume lookup
pub fn resolve_universe(exchange_info: &Value, ticker_24h: &Value) -> (SymbolUniverse, VolumeSnapshot) {
    let metadata = parse_symbol_metadata(exchange_info);
    let volumes = parse_volume_snapshot(ticker_24h);
    let universe = SymbolUniverse::from_metadata(&metadata, &volumes);

    debug!(
        metadata_symbols = metadata.len(),
        ticker_symbols = volumes.len(),
        universe_size = universe.len(),
        "Symbol universe resolved"
    );

    (universe, volumes)
}
