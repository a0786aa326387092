//! Alert rendering
//!
//! Turns a qualified candidate into the HTML messages the notifier delivers:
//! a token summary followed by a per-window transaction breakdown.

use crate::domain::{TokenCandidate, TokenMetrics, TradeWindow};
use crate::ports::AlertPayload;

const DEXSCREENER_URL: &str = "https://dexscreener.com/solana";

/// Build the alert for a qualified candidate
pub fn render_alert(candidate: &TokenCandidate, metrics: &TokenMetrics) -> AlertPayload {
    AlertPayload {
        key: candidate.key(),
        text: summary_text(candidate, metrics),
        details: details_text(metrics),
        image_url: metrics
            .profile
            .logo_url
            .clone()
            .or_else(|| candidate.listing.logo_url.clone()),
    }
}

fn summary_text(candidate: &TokenCandidate, metrics: &TokenMetrics) -> String {
    let profile = &metrics.profile;
    let name = non_empty(&profile.name, &candidate.listing.name);
    let symbol = non_empty(&profile.symbol, &candidate.listing.symbol);

    let chain = metrics.chain.clone().unwrap_or_default();
    let supply = chain
        .supply
        .map(group_thousands)
        .unwrap_or_else(|| "Unknown".to_string());
    let age = chain.age_formatted().unwrap_or_else(|| "Unknown".to_string());
    let verified = match chain.verified {
        Some(true) => "Yes",
        Some(false) => "No",
        None => "Unknown",
    };

    let lines = [
        "<u>Token Details</u>".to_string(),
        format!("├ Chain: <code>{}</code>", escape_html(&candidate.chain.to_uppercase())),
        format!("├ Name: <code>{}</code>", escape_html(name)),
        format!("├ Symbol: <code>{}</code>", escape_html(symbol)),
        format!("├ Total Supply: <code>{}</code>", supply),
        format!("├ Token Age: <code>{}</code>", age),
        format!("├ Mint Revoked: <code>{}</code>", verified),
        format!("├ Holders: <code>{}</code>", group_thousands(metrics.holder_count as f64)),
        format!("├ MCap: <code>${}</code>", group_thousands(metrics.mcap_usd)),
        format!("├ Liquidity: <code>${}</code>", group_thousands(metrics.liquidity_usd)),
        format!("└ Liq/MCap Ratio: <code>{:.2}%</code>", metrics.liquidity_to_mcap_pct()),
        String::new(),
        format!("<u>Price:</u> <code>${:.6}</code>", profile.price_usd),
        String::new(),
        "<u>Metrics</u>".to_string(),
        format!("├ Top 5 Holders: <code>{:.2}%</code>", metrics.top5_holder_pct),
        format!("├ 24H Volume: <code>${}</code>", group_thousands(metrics.volume_24h_usd)),
        format!("├ Net Token Flow 24H: <code>{}</code>", group_thousands(metrics.net_token_flow())),
        format!("└ Avg. Trades Per Hour 24H: <code>{:.1}</code>", metrics.avg_trades_per_hour()),
        String::new(),
        "<u>Token Address</u>".to_string(),
        format!("<code>{}</code>", escape_html(&candidate.token_address)),
        String::new(),
        "<u>Links</u>".to_string(),
        format!(
            "└ <a href='{}/{}'>DexScreener</a>",
            DEXSCREENER_URL,
            escape_html(&candidate.pool_address)
        ),
    ];
    lines.join("\n")
}

fn details_text(metrics: &TokenMetrics) -> Option<String> {
    if metrics.windows.is_empty() {
        return None;
    }

    let mut message = String::from("📊 <b>Transaction Analysis</b>\n");
    for window in TradeWindow::ALL {
        let Some(stats) = metrics.window(window) else {
            continue;
        };
        message.push_str(&format!("\n⏰ <b>{}</b>\n", window.label()));
        message.push_str(&format!(
            "🟢 <b>Buys:</b> {} txs, {} wallets, avg ${:.2}\n",
            stats.buys,
            stats.buyers,
            stats.avg_buy_usd()
        ));
        message.push_str(&format!(
            "🔴 <b>Sells:</b> {} txs, {} wallets, avg ${:.2}\n",
            stats.sells,
            stats.sellers,
            stats.avg_sell_usd()
        ));
    }
    Some(message.trim_end().to_string())
}

fn non_empty<'a>(primary: &'a str, fallback: &'a str) -> &'a str {
    if primary.is_empty() {
        fallback
    } else {
        primary
    }
}

/// Escape text for Telegram HTML parse mode
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Round to a whole number and group digits: 1234567.8 -> "1,234,568"
fn group_thousands(value: f64) -> String {
    if !value.is_finite() {
        return "N/A".to_string();
    }
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if rounded < 0.0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}
