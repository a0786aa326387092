//! Token Metrics
//!
//! Point-in-time snapshot of everything the evaluator needs for one token,
//! plus descriptive fields that only feed alerts and the alert journal.
//! Built fresh per evaluation by a market data adapter and discarded after.

use serde::{Deserialize, Serialize};

/// Trading window used by provider analytics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeWindow {
    M5,
    H1,
    H6,
    H24,
}

impl TradeWindow {
    pub const ALL: [TradeWindow; 4] = [TradeWindow::M5, TradeWindow::H1, TradeWindow::H6, TradeWindow::H24];

    /// Provider key ("5m", "1h", ...)
    pub fn key(&self) -> &'static str {
        match self {
            TradeWindow::M5 => "5m",
            TradeWindow::H1 => "1h",
            TradeWindow::H6 => "6h",
            TradeWindow::H24 => "24h",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TradeWindow::M5 => "5M",
            TradeWindow::H1 => "1H",
            TradeWindow::H6 => "6H",
            TradeWindow::H24 => "24H",
        }
    }
}

/// Buy/sell activity over one trading window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowStats {
    pub window: TradeWindow,
    pub buy_volume_usd: f64,
    pub sell_volume_usd: f64,
    pub buys: u64,
    pub sells: u64,
    pub buyers: u64,
    pub sellers: u64,
}

impl WindowStats {
    /// Average buy size per buying wallet
    pub fn avg_buy_usd(&self) -> f64 {
        if self.buyers > 0 {
            self.buy_volume_usd / self.buyers as f64
        } else {
            self.buy_volume_usd
        }
    }

    /// Average sell size per selling wallet
    pub fn avg_sell_usd(&self) -> f64 {
        if self.sellers > 0 {
            self.sell_volume_usd / self.sellers as f64
        } else {
            self.sell_volume_usd
        }
    }
}

/// One of the largest (non-contract) holders
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HolderShare {
    pub address: String,
    /// Balance in whole tokens
    pub balance: f64,
    /// Percentage of total supply
    pub pct_of_supply: f64,
}

/// Descriptive token info for alerts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenProfile {
    pub name: String,
    pub symbol: String,
    pub price_usd: f64,
    pub logo_url: Option<String>,
}

/// On-chain supplemental data. Every field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChainInfo {
    /// Seconds since the oldest known transaction for the mint
    pub age_secs: Option<u64>,
    /// Total supply in whole tokens
    pub supply: Option<f64>,
    /// Mint authority revoked
    pub verified: Option<bool>,
}

impl ChainInfo {
    /// Age as "{d}d {h}h {m}m"
    pub fn age_formatted(&self) -> Option<String> {
        self.age_secs.map(|secs| {
            let days = secs / 86_400;
            let hours = (secs % 86_400) / 3_600;
            let minutes = (secs % 3_600) / 60;
            format!("{}d {}h {}m", days, hours, minutes)
        })
    }
}

/// Aggregated metrics for one token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenMetrics {
    /// Pool liquidity in USD
    pub liquidity_usd: f64,
    /// Market cap (fully diluted) in USD
    pub mcap_usd: f64,
    /// Total holder count
    pub holder_count: u64,
    /// Share of supply held by the top 5 non-contract holders (percent)
    pub top5_holder_pct: f64,
    /// Buy + sell volume over 24h in USD
    pub volume_24h_usd: f64,
    /// Trailing buy-activity sample per sub-interval, most recent last
    pub buy_activity: Vec<f64>,
    pub profile: TokenProfile,
    pub top_holders: Vec<HolderShare>,
    pub windows: Vec<WindowStats>,
    pub chain: Option<ChainInfo>,
}

impl TokenMetrics {
    /// Attach on-chain data, consuming the snapshot
    pub fn with_chain(mut self, chain: ChainInfo) -> Self {
        self.chain = Some(chain);
        self
    }

    pub fn window(&self, window: TradeWindow) -> Option<&WindowStats> {
        self.windows.iter().find(|w| w.window == window)
    }

    /// Net token inflow over 24h: (buy volume - sell volume) / price
    pub fn net_token_flow(&self) -> f64 {
        match self.window(TradeWindow::H24) {
            Some(w) if self.profile.price_usd > 0.0 => {
                (w.buy_volume_usd - w.sell_volume_usd) / self.profile.price_usd
            }
            _ => 0.0,
        }
    }

    /// Average number of trades per hour over 24h
    pub fn avg_trades_per_hour(&self) -> f64 {
        self.window(TradeWindow::H24)
            .map(|w| (w.buys + w.sells) as f64 / 24.0)
            .unwrap_or(0.0)
    }

    /// Liquidity as a percentage of market cap
    pub fn liquidity_to_mcap_pct(&self) -> f64 {
        if self.mcap_usd > 0.0 {
            self.liquidity_usd / self.mcap_usd * 100.0
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn metrics_with_24h(buy: f64, sell: f64, buys: u64, sells: u64, price: f64) -> TokenMetrics {
        TokenMetrics {
            liquidity_usd: 50_000.0,
            mcap_usd: 500_000.0,
            holder_count: 300,
            top5_holder_pct: 20.0,
            volume_24h_usd: buy + sell,
            buy_activity: vec![],
            profile: TokenProfile {
                price_usd: price,
                ..Default::default()
            },
            top_holders: vec![],
            windows: vec![WindowStats {
                window: TradeWindow::H24,
                buy_volume_usd: buy,
                sell_volume_usd: sell,
                buys,
                sells,
                buyers: 10,
                sellers: 0,
            }],
            chain: None,
        }
    }

    #[test]
    fn test_derived_flow_figures() {
        let m = metrics_with_24h(30_000.0, 10_000.0, 200, 40, 0.002);
        assert_relative_eq!(m.net_token_flow(), 10_000_000.0, epsilon = 1e-3);
        assert_relative_eq!(m.avg_trades_per_hour(), 10.0);
        assert_relative_eq!(m.liquidity_to_mcap_pct(), 10.0);
    }

    #[test]
    fn test_zero_price_flow() {
        let m = metrics_with_24h(30_000.0, 10_000.0, 200, 40, 0.0);
        assert_eq!(m.net_token_flow(), 0.0);
    }

    #[test]
    fn test_window_averages_guard_zero_wallets() {
        let m = metrics_with_24h(30_000.0, 10_000.0, 200, 40, 1.0);
        let w = m.window(TradeWindow::H24).unwrap();
        assert_relative_eq!(w.avg_buy_usd(), 3_000.0);
        // No sellers: falls back to the raw volume
        assert_relative_eq!(w.avg_sell_usd(), 10_000.0);
    }

    #[test]
    fn test_age_formatting() {
        let info = ChainInfo {
            age_secs: Some(2 * 86_400 + 5 * 3_600 + 7 * 60 + 30),
            ..Default::default()
        };
        assert_eq!(info.age_formatted().as_deref(), Some("2d 5h 7m"));
        assert_eq!(ChainInfo::default().age_formatted(), None);
    }
}
