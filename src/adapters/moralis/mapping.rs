//! Moralis response mapping
//!
//! Pure conversions from provider payloads into domain types, kept apart
//! from the HTTP client so they can be tested against JSON fixtures.

use chrono::DateTime;

use super::types::{GraduatedToken, PairSwap, TokenAnalytics, TokenPair, TopHolder};
use crate::domain::{
    HolderShare, ListingSnapshot, TokenCandidate, TokenMetrics, TokenProfile, TradeWindow,
    WindowStats,
};

/// Number of largest non-contract holders summed for concentration
pub const TOP_HOLDER_COUNT: usize = 5;

/// How the buy-activity sample is bucketed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActivityWindow {
    pub window_hours: u32,
    pub bucket_minutes: u32,
}

impl Default for ActivityWindow {
    fn default() -> Self {
        Self {
            window_hours: 24,
            bucket_minutes: 60,
        }
    }
}

impl ActivityWindow {
    pub fn bucket_count(&self) -> usize {
        let minutes = self.window_hours as usize * 60;
        let bucket = self.bucket_minutes.max(1) as usize;
        minutes.div_ceil(bucket)
    }

    pub fn span_secs(&self) -> u64 {
        self.bucket_count() as u64 * self.bucket_secs()
    }

    fn bucket_secs(&self) -> u64 {
        self.bucket_minutes.max(1) as u64 * 60
    }
}

/// Pair swaps fetched for the activity window, newest first
#[derive(Debug, Clone, Default)]
pub struct SwapHistory {
    pub swaps: Vec<PairSwap>,
    /// Paging stopped before the start of the window
    pub truncated: bool,
}

impl SwapHistory {
    /// Earliest time from which the fetched swaps are complete, when truncated
    pub fn covered_from(&self) -> Option<u64> {
        if !self.truncated {
            return None;
        }
        self.swaps.iter().filter_map(|s| parse_timestamp(&s.block_timestamp)).min()
    }
}

pub fn listing_snapshot(token: &GraduatedToken) -> ListingSnapshot {
    ListingSnapshot {
        name: token.name.clone().unwrap_or_default(),
        symbol: token.symbol.clone().unwrap_or_default(),
        logo_url: token.logo.clone().filter(|url| !url.is_empty()),
        price_usd: token.price_usd,
        liquidity_usd: token.liquidity,
        fdv_usd: token.fully_diluted_valuation,
    }
}

/// Pick the pool on the preferred exchange, else the first pair listed
pub fn select_pool(pairs: &[TokenPair], preferred_exchange: &str) -> Option<String> {
    pairs
        .iter()
        .find(|p| {
            p.exchange_name
                .as_deref()
                .is_some_and(|name| name.eq_ignore_ascii_case(preferred_exchange))
        })
        .or_else(|| pairs.first())
        .map(|p| p.pair_address.clone())
}

/// Largest holders, skipping contract accounts
pub fn top_holders(holders: &[TopHolder], count: usize) -> Vec<HolderShare> {
    holders
        .iter()
        .filter(|h| !h.is_contract)
        .take(count)
        .map(|h| HolderShare {
            address: h.owner_address.clone(),
            balance: h.balance_formatted,
            pct_of_supply: h.percentage_relative_to_total_supply,
        })
        .collect()
}

pub fn window_stats(analytics: &TokenAnalytics) -> Vec<WindowStats> {
    TradeWindow::ALL
        .iter()
        .map(|&window| {
            let key = window.key();
            WindowStats {
                window,
                buy_volume_usd: analytics.total_buy_volume.get(key),
                sell_volume_usd: analytics.total_sell_volume.get(key),
                buys: analytics.total_buys.get(key) as u64,
                sells: analytics.total_sells.get(key) as u64,
                buyers: analytics.total_buyers.get(key) as u64,
                sellers: analytics.total_sellers.get(key) as u64,
            }
        })
        .collect()
}

/// Bucket buy-side swap value into a trailing activity sample, most recent last.
///
/// Buckets end at `now` and only swaps typed as buys add to them, so a
/// sell-off leaves its bucket empty. Buckets older than the first swap in
/// either direction are dropped so a token younger than the window does not
/// get a baseline padded with zeros. With `covered_from` set, buckets that
/// start before it are dropped too since their swaps were not all fetched.
pub fn buy_activity(
    swaps: &[PairSwap],
    now: u64,
    window: ActivityWindow,
    covered_from: Option<u64>,
) -> Vec<f64> {
    let count = window.bucket_count();
    let bucket_secs = window.bucket_secs();
    let start = now.saturating_sub(window.span_secs());

    let mut buckets = vec![0.0; count];
    let mut first_bucket = None::<usize>;

    for swap in swaps {
        let Some(ts) = parse_timestamp(&swap.block_timestamp) else {
            tracing::debug!("Skipping swap with unparseable timestamp {}", swap.block_timestamp);
            continue;
        };
        if ts < start || ts >= now {
            continue;
        }
        let index = ((ts - start) / bucket_secs) as usize;
        if index >= count {
            continue;
        }
        first_bucket = Some(first_bucket.map_or(index, |f| f.min(index)));
        if swap.is_buy() && swap.total_value_usd.is_finite() {
            buckets[index] += swap.total_value_usd.max(0.0);
        }
    }

    let Some(mut first) = first_bucket else {
        return Vec::new();
    };
    if let Some(covered) = covered_from.filter(|&c| c > start) {
        first = first.max((covered - start).div_ceil(bucket_secs) as usize);
    }
    if first >= count {
        return Vec::new();
    }
    buckets.split_off(first)
}

fn parse_timestamp(raw: &str) -> Option<u64> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .and_then(|dt| u64::try_from(dt.timestamp()).ok())
}

/// Assemble metrics for a candidate from the per-token responses
pub fn build_metrics(
    candidate: &TokenCandidate,
    holders: &[TopHolder],
    total_holders: u64,
    analytics: &TokenAnalytics,
    history: &SwapHistory,
    now: u64,
    window: ActivityWindow,
) -> TokenMetrics {
    let listing = &candidate.listing;
    let top = top_holders(holders, TOP_HOLDER_COUNT);
    let top5_holder_pct = top.iter().map(|h| h.pct_of_supply).sum();

    let liquidity_usd = first_positive(listing.liquidity_usd, analytics.total_liquidity_usd);
    let mcap_usd = first_positive(listing.fdv_usd, analytics.total_fully_diluted_valuation);
    let price_usd = first_positive(listing.price_usd, analytics.usd_price);

    TokenMetrics {
        liquidity_usd,
        mcap_usd,
        holder_count: total_holders,
        top5_holder_pct,
        volume_24h_usd: analytics.total_buy_volume.h24 + analytics.total_sell_volume.h24,
        buy_activity: buy_activity(&history.swaps, now, window, history.covered_from()),
        profile: TokenProfile {
            name: listing.name.clone(),
            symbol: listing.symbol.clone(),
            price_usd,
            logo_url: listing.logo_url.clone(),
        },
        top_holders: top,
        windows: window_stats(analytics),
        chain: None,
    }
}

fn first_positive(primary: f64, fallback: f64) -> f64 {
    if primary > 0.0 {
        primary
    } else {
        fallback
    }
}
