//! Free-text signal interpreter.
//!
//! Every field is extracted by an ordered list of pattern rules supplied at
//! construction. Scalar fields (coin, side, leverage, stop) are first-match-
//! wins across the rule list; entry and target rules pool their matches
//! before deduplication, ascending sort, and truncation. No global state:
//! each interpreter owns its compiled rules and is freely reusable.

use regex::{Regex, RegexBuilder};
use std::collections::HashMap;

use tracing::{debug, info};

use super::error::TeletraderError;
use super::signal::{
    MarginMode, Side, SignalIntent, DEFAULT_QUOTE, MAX_LEVERAGE, MAX_PRICE_LEVELS, MIN_LEVERAGE,
};

pub const ERR_NO_COIN: &str = "no coin symbol found";
pub const ERR_NO_SIDE: &str = "no position side found";
pub const ERR_NO_ENTRY: &str = "no entry zone found";

/// Numeric tokens considered plausible prices by the entry-zone fallback.
const FALLBACK_PRICE_MIN: f64 = 1e-6;
const FALLBACK_PRICE_MAX: f64 = 1e6;

const NUMBER_TOKEN: &str = r"\b\d+\.?\d*\b";

/// Ordered, immutable pattern rules for every signal field.
///
/// Patterns are compiled case-insensitively. The first capture group of a
/// rule carries the extracted value; a rule without a capture group matches
/// on its whole text (used by the emoji side markers).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSet {
    pub coin: Vec<String>,
    pub side: Vec<String>,
    pub leverage: Vec<String>,
    pub entry: Vec<String>,
    pub target: Vec<String>,
    pub stop: Vec<String>,
    pub cross_margin: Vec<String>,
}

impl Default for RuleSet {
    /// Rules covering the common signal-provider formats.
    fn default() -> Self {
        fn own(patterns: &[&str]) -> Vec<String> {
            patterns.iter().map(|p| p.to_string()).collect()
        }

        RuleSet {
            coin: own(&[
                r"#([A-Z]{3,6})/USDT",
                r"#([A-Z]{3,6})USDT",
                r"#([A-Z]{3,6})\b",
                r"\$([A-Z]{3,6})\b",
                r"([A-Z]{3,6})/USDT",
                r"([A-Z]{3,6})USDT",
                r"COIN[:\s]*([A-Z]{3,6})\b",
                r"SYMBOL[:\s]*([A-Z]{3,6})\b",
            ]),
            side: own(&[
                r"(?:POSITION|DIRECTION|TYPE)[:\s]*(LONG|SHORT)",
                r"\b(LONG|SHORT)\b",
                r"#(LONG|SHORT)",
                r"📈",
                r"📉",
            ]),
            leverage: own(&[
                r"LEVERAGE[:\s]*(\d+)X?",
                r"CROSS[:\s]*(\d+)X?",
                r"(\d+)X\s*CROSS",
                r"(\d+)X\s*LEVERAGE",
                r"\bLEV[:\s]*(\d+)",
            ]),
            entry: own(&[
                r"ENTRY ZONE[:\s]*([0-9,.]+(?:\s*-\s*[0-9,.]+)?)",
                r"ENTRY[:\s]*([0-9,.]+(?:\s*-\s*[0-9,.]+)?)",
                r"BUY[:\s]*([0-9,.]+(?:\s*-\s*[0-9,.]+)?)",
                r"ENTER[:\s]*([0-9,.]+(?:\s*-\s*[0-9,.]+)?)",
                r"PRICE[:\s]*([0-9,.]+(?:\s*-\s*[0-9,.]+)?)",
            ]),
            target: own(&[
                r"TARGETS?[:\s]*([0-9,.\s-]+)",
                r"TPS?[:\s]*([0-9,.\s-]+)",
                r"TAKE PROFITS?[:\s]*([0-9,.\s-]+)",
                r"SELL[:\s]*([0-9,.\s-]+)",
            ]),
            stop: own(&[
                r"STOP LOSS[:\s]*([0-9,.]+)",
                r"\bSL[:\s]*([0-9,.]+)",
                r"STOP[:\s]*([0-9,.]+)",
                r"\bLOSS[:\s]*([0-9,.]+)",
            ]),
            cross_margin: own(&[r"CROSS MARGIN", r"CROSS LEVERAGE", r"\bCROSS\b"]),
        }
    }
}

/// Aggregate statistics over a batch of parsed intents.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ParsingStats {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    /// Percentage of successful parses, 0 for an empty batch.
    pub success_rate: f64,
    /// Histogram keyed by exact error string, counted over failed intents.
    pub error_counts: HashMap<String, usize>,
}

#[derive(Debug)]
pub struct SignalInterpreter {
    coin: Vec<Regex>,
    side: Vec<Regex>,
    leverage: Vec<Regex>,
    entry: Vec<Regex>,
    target: Vec<Regex>,
    stop: Vec<Regex>,
    cross_margin: Vec<Regex>,
    number_token: Regex,
}

impl SignalInterpreter {
    pub fn new(rules: &RuleSet) -> Result<Self, TeletraderError> {
        Ok(SignalInterpreter {
            coin: compile_rules("coin", &rules.coin)?,
            side: compile_rules("side", &rules.side)?,
            leverage: compile_rules("leverage", &rules.leverage)?,
            entry: compile_rules("entry", &rules.entry)?,
            target: compile_rules("target", &rules.target)?,
            stop: compile_rules("stop", &rules.stop)?,
            cross_margin: compile_rules("cross_margin", &rules.cross_margin)?,
            number_token: compile_rule("number_token", NUMBER_TOKEN)?,
        })
    }

    /// Parse one raw alert into a structured intent.
    ///
    /// Never fails: missing required fields are recorded as parse errors on
    /// the returned intent. Deterministic for identical input text.
    pub fn parse(&self, text: &str) -> SignalIntent {
        let cleaned = normalize(text);

        let coin = self.extract_coin(&cleaned);
        let side = self.extract_side(&cleaned);
        let leverage = self.extract_leverage(&cleaned);
        let entry_zone = self.extract_entry_zone(&cleaned);
        let targets = self.extract_targets(&cleaned);
        let stop_loss = self.extract_stop(&cleaned);
        let margin_mode = if self.detect_cross_margin(&cleaned) {
            MarginMode::Cross
        } else {
            MarginMode::Isolated
        };

        let mut parse_errors = Vec::new();
        if coin.is_none() {
            parse_errors.push(ERR_NO_COIN.to_string());
        }
        if side.is_none() {
            parse_errors.push(ERR_NO_SIDE.to_string());
        }
        if entry_zone.is_empty() {
            parse_errors.push(ERR_NO_ENTRY.to_string());
        }

        debug!(
            coin = coin.as_deref().unwrap_or("?"),
            errors = parse_errors.len(),
            "parsed signal"
        );

        SignalIntent {
            raw_text: text.to_string(),
            coin,
            quote: DEFAULT_QUOTE.to_string(),
            side,
            entry_zone,
            leverage,
            margin_mode,
            targets,
            stop_loss,
            parse_errors,
        }
    }

    /// Parse a batch of alerts, preserving input order. One intent per input;
    /// a bad text yields an intent carrying errors, never aborts the batch.
    pub fn batch_parse<'a, I>(&self, texts: I) -> Vec<SignalIntent>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let intents: Vec<SignalIntent> = texts.into_iter().map(|t| self.parse(t)).collect();
        info!(
            total = intents.len(),
            successful = intents.iter().filter(|i| i.is_success()).count(),
            "batch parse complete"
        );
        intents
    }

    fn extract_coin(&self, text: &str) -> Option<String> {
        for re in &self.coin {
            if let Some(caps) = re.captures(text) {
                if let Some(m) = caps.get(1) {
                    let coin = m.as_str();
                    if (3..=6).contains(&coin.len())
                        && coin.chars().all(|c| c.is_ascii_alphabetic())
                    {
                        return Some(coin.to_uppercase());
                    }
                }
            }
        }
        None
    }

    fn extract_side(&self, text: &str) -> Option<Side> {
        for re in &self.side {
            if let Some(caps) = re.captures(text) {
                let token = caps.get(1).or_else(|| caps.get(0));
                if let Some(side) = token.and_then(|m| map_side(m.as_str())) {
                    return Some(side);
                }
            }
        }
        None
    }

    fn extract_leverage(&self, text: &str) -> u32 {
        for re in &self.leverage {
            if let Some(caps) = re.captures(text) {
                if let Some(value) = caps.get(1).and_then(|m| m.as_str().parse::<u32>().ok()) {
                    return value.clamp(MIN_LEVERAGE, MAX_LEVERAGE);
                }
            }
        }
        MIN_LEVERAGE
    }

    /// Entry levels pooled across all rules. A dashed `A-B` range expands to
    /// {A, (A+B)/2, B}. When no rule matches, falls back to every plausible
    /// numeric token in the text.
    fn extract_entry_zone(&self, text: &str) -> Vec<f64> {
        let mut entries = Vec::new();

        for re in &self.entry {
            for caps in re.captures_iter(text) {
                let Some(m) = caps.get(1) else { continue };
                let token = m.as_str();

                if let Some((lo, hi)) = token.split_once('-') {
                    if hi.contains('-') {
                        continue;
                    }
                    if let (Some(a), Some(b)) = (parse_price(lo), parse_price(hi)) {
                        let step = (b - a) / 2.0;
                        entries.extend([a, a + step, b]);
                    }
                } else if let Some(value) = parse_price(token) {
                    entries.push(value);
                }
            }
        }

        if entries.is_empty() {
            for m in self.number_token.find_iter(text) {
                if let Ok(value) = m.as_str().parse::<f64>() {
                    if value > FALLBACK_PRICE_MIN && value < FALLBACK_PRICE_MAX {
                        entries.push(value);
                    }
                }
            }
        }

        sort_and_cap(entries)
    }

    /// Target levels: first match per rule, all numeric tokens of the
    /// captured run pooled. No range expansion.
    fn extract_targets(&self, text: &str) -> Vec<f64> {
        let mut targets = Vec::new();

        for re in &self.target {
            if let Some(caps) = re.captures(text) {
                let Some(m) = caps.get(1) else { continue };
                for token in self.number_token.find_iter(m.as_str()) {
                    if let Ok(value) = token.as_str().parse::<f64>() {
                        if value > 0.0 {
                            targets.push(value);
                        }
                    }
                }
            }
        }

        sort_and_cap(targets)
    }

    fn extract_stop(&self, text: &str) -> Option<f64> {
        for re in &self.stop {
            if let Some(value) = re
                .captures(text)
                .and_then(|caps| caps.get(1))
                .and_then(|m| parse_price(m.as_str()))
            {
                return Some(value);
            }
        }
        None
    }

    fn detect_cross_margin(&self, text: &str) -> bool {
        self.cross_margin.iter().any(|re| re.is_match(text))
    }
}

/// Batch statistics; histogram keyed by exact error string.
pub fn parsing_stats(intents: &[SignalIntent]) -> ParsingStats {
    let total = intents.len();
    let successful = intents.iter().filter(|i| i.is_success()).count();
    let failed = total - successful;

    let mut error_counts: HashMap<String, usize> = HashMap::new();
    for intent in intents.iter().filter(|i| !i.is_success()) {
        for error in &intent.parse_errors {
            *error_counts.entry(error.clone()).or_insert(0) += 1;
        }
    }

    ParsingStats {
        total,
        successful,
        failed,
        success_rate: if total > 0 {
            successful as f64 / total as f64 * 100.0
        } else {
            0.0
        },
        error_counts,
    }
}

fn compile_rules(field: &str, patterns: &[String]) -> Result<Vec<Regex>, TeletraderError> {
    patterns.iter().map(|p| compile_rule(field, p)).collect()
}

fn compile_rule(field: &str, pattern: &str) -> Result<Regex, TeletraderError> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| TeletraderError::RuleInvalid {
            field: field.to_string(),
            reason: e.to_string(),
        })
}

/// Collapse runs of whitespace (signals are usually multi-line) and
/// uppercase so rules need only one letter case.
fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

fn map_side(token: &str) -> Option<Side> {
    let upper = token.to_uppercase();
    if upper.contains("LONG") || upper.contains('📈') {
        Some(Side::Long)
    } else if upper.contains("SHORT") || upper.contains('📉') {
        Some(Side::Short)
    } else {
        None
    }
}

/// Commas are thousands separators.
fn parse_price(token: &str) -> Option<f64> {
    let cleaned = token.trim().replace(',', "");
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn sort_and_cap(mut values: Vec<f64>) -> Vec<f64> {
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    values.dedup();
    values.truncate(MAX_PRICE_LEVELS);
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn interpreter() -> SignalInterpreter {
        SignalInterpreter::new(&RuleSet::default()).unwrap()
    }

    const FULL_SIGNAL: &str =
        "#BTC/USDT LONG Entry: 45000-46000 Leverage: 5x Targets: 47000, 48000, 49000 Stop Loss: 44000";

    #[test]
    fn parses_full_signal() {
        let intent = interpreter().parse(FULL_SIGNAL);

        assert!(intent.is_success(), "errors: {:?}", intent.parse_errors);
        assert_eq!(intent.coin.as_deref(), Some("BTC"));
        assert_eq!(intent.symbol().as_deref(), Some("BTCUSDT"));
        assert_eq!(intent.side, Some(Side::Long));
        assert_eq!(intent.leverage, 5);
        assert_eq!(intent.margin_mode, MarginMode::Isolated);
        assert_eq!(intent.entry_zone, vec![45000.0, 45500.0, 46000.0]);
        assert_eq!(intent.targets, vec![47000.0, 48000.0, 49000.0]);
        assert_eq!(intent.stop_loss, Some(44000.0));
    }

    #[test]
    fn parse_is_deterministic() {
        let interp = interpreter();
        let a = interp.parse(FULL_SIGNAL);
        let b = interp.parse(FULL_SIGNAL);
        assert_eq!(a, b);
    }

    #[test]
    fn range_expands_to_three_points() {
        let intent = interpreter().parse("#ETH SHORT Entry: 100-110");
        assert_eq!(intent.entry_zone, vec![100.0, 105.0, 110.0]);
    }

    #[test]
    fn range_with_spaces_and_commas() {
        let intent = interpreter().parse("#BTC LONG Entry: 45,000 - 46,000");
        assert_eq!(intent.entry_zone, vec![45000.0, 45500.0, 46000.0]);
    }

    #[test]
    fn coin_marker_variants() {
        let interp = interpreter();
        assert_eq!(interp.parse("$ETH LONG 3000").coin.as_deref(), Some("ETH"));
        assert_eq!(
            interp.parse("Coin: SOL SHORT 150").coin.as_deref(),
            Some("SOL")
        );
        assert_eq!(
            interp.parse("ADA/USDT LONG 0.45").coin.as_deref(),
            Some("ADA")
        );
        assert_eq!(
            interp.parse("Symbol: DOGE LONG 0.1").coin.as_deref(),
            Some("DOGE")
        );
    }

    #[test]
    fn coin_requires_three_to_six_letters() {
        let intent = interpreter().parse("#AB LONG Entry: 100");
        assert_eq!(intent.coin, None);
        assert!(intent.parse_errors.contains(&ERR_NO_COIN.to_string()));
    }

    #[test]
    fn side_marker_variants() {
        let interp = interpreter();
        assert_eq!(interp.parse("#BTC Position: SHORT 45000").side, Some(Side::Short));
        assert_eq!(interp.parse("#BTC Direction: long 45000").side, Some(Side::Long));
        assert_eq!(interp.parse("#BTC #SHORT 45000").side, Some(Side::Short));
        assert_eq!(interp.parse("#BTC 📈 45000").side, Some(Side::Long));
        assert_eq!(interp.parse("#BTC 📉 45000").side, Some(Side::Short));
    }

    #[test]
    fn leverage_clamped_and_defaulted() {
        let interp = interpreter();
        assert_eq!(interp.parse("#BTC LONG 45000 Leverage: 150x").leverage, 100);
        assert_eq!(interp.parse("#BTC LONG 45000 Lev: 0").leverage, 1);
        assert_eq!(interp.parse("#BTC LONG 45000 20x Cross").leverage, 20);
        assert_eq!(interp.parse("#BTC LONG 45000").leverage, 1);
    }

    #[test]
    fn cross_margin_detection() {
        let interp = interpreter();
        assert_eq!(
            interp.parse("#BTC LONG 45000 10x Cross").margin_mode,
            MarginMode::Cross
        );
        assert_eq!(
            interp.parse("#BTC LONG 45000 cross margin").margin_mode,
            MarginMode::Cross
        );
        assert_eq!(
            interp.parse("#BTC LONG 45000").margin_mode,
            MarginMode::Isolated
        );
    }

    #[test]
    fn entries_pooled_sorted_deduplicated_capped() {
        // Two labels pool; the pooled list is sorted ascending and capped at 5
        let intent = interpreter()
            .parse("#BTC LONG Entry: 300 Buy: 100 Enter: 200 Price: 250 Entry Zone: 150-350");
        assert_eq!(intent.entry_zone.len(), 5);
        let mut sorted = intent.entry_zone.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(intent.entry_zone, sorted);
        assert_eq!(intent.entry_zone[0], 100.0);
    }

    #[test]
    fn entry_fallback_scans_numeric_tokens() {
        let intent = interpreter().parse("BTC LONG 45000 46000");
        assert_eq!(intent.entry_zone, vec![45000.0, 46000.0]);
    }

    #[test]
    fn entry_fallback_respects_price_bounds() {
        let intent = interpreter().parse("FOO LONG 5000000");
        assert!(intent.entry_zone.is_empty());
        assert!(intent.parse_errors.contains(&ERR_NO_ENTRY.to_string()));
    }

    #[test]
    fn targets_pooled_across_rules() {
        let intent = interpreter().parse("#BTC LONG Entry: 100 Targets: 110 120 TP: 130");
        assert_eq!(intent.targets, vec![110.0, 120.0, 130.0]);
    }

    #[test]
    fn targets_capped_at_five() {
        let intent = interpreter().parse("#BTC LONG Entry: 100 Targets: 110 120 130 140 150 160");
        assert_eq!(intent.targets, vec![110.0, 120.0, 130.0, 140.0, 150.0]);
    }

    #[test]
    fn stop_rule_variants() {
        let interp = interpreter();
        assert_eq!(
            interp.parse("#BTC LONG Entry: 100 SL: 90").stop_loss,
            Some(90.0)
        );
        assert_eq!(
            interp.parse("#BTC LONG Entry: 100 Stop: 91").stop_loss,
            Some(91.0)
        );
        assert_eq!(interp.parse("#BTC LONG Entry: 100").stop_loss, None);
    }

    #[test]
    fn missing_fields_append_distinct_errors() {
        let intent = interpreter().parse("nothing useful here");
        assert!(!intent.is_success());
        assert_eq!(
            intent.parse_errors,
            vec![
                ERR_NO_COIN.to_string(),
                ERR_NO_SIDE.to_string(),
                ERR_NO_ENTRY.to_string()
            ]
        );
    }

    #[test]
    fn batch_parse_preserves_order() {
        let interp = interpreter();
        let texts = vec![FULL_SIGNAL, "garbage", "#ETH SHORT Entry: 3000"];
        let intents = interp.batch_parse(texts.iter().copied());

        assert_eq!(intents.len(), 3);
        assert_eq!(intents[0].coin.as_deref(), Some("BTC"));
        assert!(!intents[1].is_success());
        assert_eq!(intents[2].coin.as_deref(), Some("ETH"));
    }

    #[test]
    fn stats_histogram_counts_exact_errors() {
        let interp = interpreter();
        let intents = interp.batch_parse(vec![FULL_SIGNAL, "junk", "more junk"]);
        let stats = parsing_stats(&intents);

        assert_eq!(stats.total, 3);
        assert_eq!(stats.successful, 1);
        assert_eq!(stats.failed, 2);
        assert!((stats.success_rate - 100.0 / 3.0).abs() < 1e-9);
        assert_eq!(stats.error_counts.get(ERR_NO_COIN), Some(&2));
        assert_eq!(stats.error_counts.get(ERR_NO_SIDE), Some(&2));
    }

    #[test]
    fn stats_empty_batch() {
        let stats = parsing_stats(&[]);
        assert_eq!(stats.total, 0);
        assert!((stats.success_rate - 0.0).abs() < f64::EPSILON);
        assert!(stats.error_counts.is_empty());
    }

    #[test]
    fn custom_rules_replace_defaults() {
        let rules = RuleSet {
            coin: vec![r"PAIR[:\s]*([A-Z]{3,6})\b".to_string()],
            ..RuleSet::default()
        };
        let interp = SignalInterpreter::new(&rules).unwrap();

        let intent = interp.parse("Pair: BNB LONG Entry: 600");
        assert_eq!(intent.coin.as_deref(), Some("BNB"));
        // The hashtag rule is gone from this configuration
        let intent = interp.parse("#BTC LONG Entry: 45000");
        assert_eq!(intent.coin, None);
    }

    #[test]
    fn invalid_rule_pattern_is_rejected() {
        let rules = RuleSet {
            stop: vec![r"STOP[:\s]*([0-9".to_string()],
            ..RuleSet::default()
        };
        let err = SignalInterpreter::new(&rules).unwrap_err();
        assert!(matches!(err, TeletraderError::RuleInvalid { .. }));
    }

    proptest! {
        #[test]
        fn leverage_always_within_bounds(lev in 0u32..10_000) {
            let text = format!("#BTC LONG Entry: 45000 Leverage: {}x", lev);
            let parsed = interpreter().parse(&text).leverage;
            prop_assert!((MIN_LEVERAGE..=MAX_LEVERAGE).contains(&parsed));
        }

        #[test]
        fn range_expansion_midpoint(a in 1.0f64..1000.0, width in 1.0f64..1000.0) {
            let a = (a * 100.0).round() / 100.0;
            let b = ((a + width) * 100.0).round() / 100.0;
            let text = format!("#BTC LONG Entry: {}-{}", a, b);
            let zone = interpreter().parse(&text).entry_zone;
            prop_assert_eq!(zone.len(), 3);
            prop_assert!((zone[0] - a).abs() < 1e-9);
            prop_assert!((zone[1] - (a + (b - a) / 2.0)).abs() < 1e-9);
            prop_assert!((zone[2] - b).abs() < 1e-9);
        }
    }
}
