use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AssetClass {
    Stock,
    Crypto,
}

impl AssetClass {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stock => "stock",
            Self::Crypto => "crypto",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Stock => "Stock",
            Self::Crypto => "Crypto",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Stock => Self::Crypto,
            Self::Crypto => Self::Stock,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SymbolEntry {
    pub value: &'static str,
    pub label: &'static str,
}

const STOCK_SYMBOLS: &[SymbolEntry] = &[
    SymbolEntry { value: "TSLA", label: "Tesla" },
    SymbolEntry { value: "AAPL", label: "Apple" },
    SymbolEntry { value: "GOOGL", label: "Google" },
    SymbolEntry { value: "MSFT", label: "Microsoft" },
];

const CRYPTO_SYMBOLS: &[SymbolEntry] = &[
    SymbolEntry { value: "BTC-USD", label: "Bitcoin" },
    SymbolEntry { value: "ETH-USD", label: "Ethereum" },
    SymbolEntry { value: "ADA-USD", label: "Cardano" },
];

/// Fixed list of selectable symbols for an asset class.
pub fn catalog(asset_class: AssetClass) -> &'static [SymbolEntry] {
    match asset_class {
        AssetClass::Stock => STOCK_SYMBOLS,
        AssetClass::Crypto => CRYPTO_SYMBOLS,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum TimeRange {
    #[value(name = "1W", alias = "1w")]
    OneWeek,
    #[value(name = "1M", alias = "1m")]
    OneMonth,
    #[value(name = "3M", alias = "3m")]
    ThreeMonths,
    #[value(name = "6M", alias = "6m")]
    SixMonths,
    #[value(name = "1Y", alias = "1y")]
    OneYear,
    #[value(name = "All", alias = "all")]
    All,
}

impl TimeRange {
    pub const ALL: [TimeRange; 6] = [
        Self::OneWeek,
        Self::OneMonth,
        Self::ThreeMonths,
        Self::SixMonths,
        Self::OneYear,
        Self::All,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::OneWeek => "1W",
            Self::OneMonth => "1M",
            Self::ThreeMonths => "3M",
            Self::SixMonths => "6M",
            Self::OneYear => "1Y",
            Self::All => "All",
        }
    }

    /// Query token sent to the historical endpoint (the lower-cased label).
    pub fn token(self) -> String {
        self.label().to_lowercase()
    }

    fn index(self) -> usize {
        Self::ALL.iter().position(|r| *r == self).unwrap_or(0)
    }

    pub fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selection {
    symbol: String,
    asset_class: AssetClass,
    time_range: TimeRange,
}

impl Default for Selection {
    fn default() -> Self {
        Self {
            symbol: "TSLA".to_string(),
            asset_class: AssetClass::Stock,
            time_range: TimeRange::OneMonth,
        }
    }
}

impl Selection {
    /// Builds a selection, falling back to the class default when `symbol`
    /// is not part of that class's catalog.
    pub fn new(symbol: &str, asset_class: AssetClass, time_range: TimeRange) -> Self {
        let symbol = symbol.trim().to_uppercase();
        let symbol = if in_catalog(asset_class, &symbol) {
            symbol
        } else {
            let fallback = catalog(asset_class)[0].value;
            warn!(
                "Symbol {} is not in the {} catalog; using {}",
                symbol,
                asset_class.as_str(),
                fallback
            );
            fallback.to_string()
        };
        Self { symbol, asset_class, time_range }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn asset_class(&self) -> AssetClass {
        self.asset_class
    }

    pub fn time_range(&self) -> TimeRange {
        self.time_range
    }

    pub fn catalog(&self) -> &'static [SymbolEntry] {
        catalog(self.asset_class)
    }

    pub fn symbol_index(&self) -> Option<usize> {
        self.catalog().iter().position(|e| e.value == self.symbol)
    }

    /// Switches asset class. A symbol that does not belong to the new class
    /// is reset to the class's first entry. Returns whether the symbol changed.
    pub fn set_asset_class(&mut self, asset_class: AssetClass) -> bool {
        self.asset_class = asset_class;
        if in_catalog(asset_class, &self.symbol) {
            return false;
        }
        let reset = catalog(asset_class)[0].value;
        debug!("Asset class -> {}; symbol {} reset to {}", asset_class.as_str(), self.symbol, reset);
        self.symbol = reset.to_string();
        true
    }

    /// Returns whether the symbol changed. Symbols outside the current catalog are rejected.
    pub fn select_symbol(&mut self, symbol: &str) -> bool {
        if !in_catalog(self.asset_class, symbol) || self.symbol == symbol {
            return false;
        }
        self.symbol = symbol.to_string();
        true
    }

    pub fn next_symbol(&mut self) -> bool {
        let list = self.catalog();
        let next = self.symbol_index().map(|i| (i + 1) % list.len()).unwrap_or(0);
        self.select_symbol(list[next].value)
    }

    pub fn prev_symbol(&mut self) -> bool {
        let list = self.catalog();
        let prev = self
            .symbol_index()
            .map(|i| (i + list.len() - 1) % list.len())
            .unwrap_or(0);
        self.select_symbol(list[prev].value)
    }

    /// Returns whether the range changed.
    pub fn set_time_range(&mut self, time_range: TimeRange) -> bool {
        if self.time_range == time_range {
            return false;
        }
        self.time_range = time_range;
        true
    }
}

fn in_catalog(asset_class: AssetClass, symbol: &str) -> bool {
    catalog(asset_class).iter().any(|e| e.value == symbol)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(list: &[SymbolEntry]) -> Vec<&str> {
        list.iter().map(|e| e.value).collect()
    }

    #[test]
    fn test_default_selection() {
        let sel = Selection::default();
        assert_eq!(sel.symbol(), "TSLA");
        assert_eq!(sel.asset_class(), AssetClass::Stock);
        assert_eq!(sel.time_range(), TimeRange::OneMonth);
    }

    #[test]
    fn test_switching_class_swaps_catalog() {
        let mut sel = Selection::default();
        assert_eq!(values(sel.catalog()), vec!["TSLA", "AAPL", "GOOGL", "MSFT"]);

        sel.set_asset_class(AssetClass::Crypto);
        assert_eq!(values(sel.catalog()), vec!["BTC-USD", "ETH-USD", "ADA-USD"]);

        sel.set_asset_class(AssetClass::Stock);
        assert_eq!(values(sel.catalog()), vec!["TSLA", "AAPL", "GOOGL", "MSFT"]);
    }

    #[test]
    fn test_switching_class_resets_foreign_symbol() {
        let mut sel = Selection::default();
        assert!(sel.select_symbol("MSFT"));
        assert!(sel.set_asset_class(AssetClass::Crypto));
        assert_eq!(sel.symbol(), "BTC-USD");

        // Re-selecting the same class keeps the symbol.
        assert!(!sel.set_asset_class(AssetClass::Crypto));
        assert_eq!(sel.symbol(), "BTC-USD");
    }

    #[test]
    fn test_select_symbol_rejects_other_class() {
        let mut sel = Selection::default();
        assert!(!sel.select_symbol("ETH-USD"));
        assert_eq!(sel.symbol(), "TSLA");
    }

    #[test]
    fn test_symbol_cycling_wraps() {
        let mut sel = Selection::default();
        sel.prev_symbol();
        assert_eq!(sel.symbol(), "MSFT");
        sel.next_symbol();
        assert_eq!(sel.symbol(), "TSLA");
    }

    #[test]
    fn test_range_tokens_are_lowercase() {
        let tokens: Vec<String> = TimeRange::ALL.iter().map(|r| r.token()).collect();
        assert_eq!(tokens, vec!["1w", "1m", "3m", "6m", "1y", "all"]);
        assert_eq!(TimeRange::All.next(), TimeRange::OneWeek);
        assert_eq!(TimeRange::OneWeek.prev(), TimeRange::All);
    }

    #[test]
    fn test_new_falls_back_to_class_default() {
        let sel = Selection::new("aapl", AssetClass::Crypto, TimeRange::OneYear);
        assert_eq!(sel.symbol(), "BTC-USD");
        let sel = Selection::new(" aapl ", AssetClass::Stock, TimeRange::OneYear);
        assert_eq!(sel.symbol(), "AAPL");
    }
}
