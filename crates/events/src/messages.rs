use crate::format::{format_amount, format_price};
use core_types::{PositionLevels, PositionSide, Target};
use rust_decimal::Decimal;
use std::fmt::Write as _;

/// A single transition of a simulated position.
///
/// The evaluator emits exactly one event per transition; each event becomes one
/// alert message.
#[derive(Debug, Clone, PartialEq)]
pub enum PositionEvent {
    /// A divergence signal opened a new position.
    Opened {
        symbol: String,
        side: PositionSide,
        venue: String,
        entry: Decimal,
        levels: PositionLevels,
    },
    /// A take-profit level was reached and its slice realised. `Tp3` closes the position.
    TargetHit {
        symbol: String,
        side: PositionSide,
        target: Target,
        price: Decimal,
        profit: Decimal,
        balance: Decimal,
    },
    /// The stop was hit before TP1; the fixed loss was deducted.
    StoppedOut {
        symbol: String,
        side: PositionSide,
        price: Decimal,
        loss: Decimal,
        balance: Decimal,
    },
    /// The stop, already moved to entry after TP1, was hit.
    BreakEven {
        symbol: String,
        side: PositionSide,
        price: Decimal,
    },
}

impl PositionEvent {
    pub fn symbol(&self) -> &str {
        match self {
            PositionEvent::Opened { symbol, .. }
            | PositionEvent::TargetHit { symbol, .. }
            | PositionEvent::StoppedOut { symbol, .. }
            | PositionEvent::BreakEven { symbol, .. } => symbol,
        }
    }

    /// True if the position no longer exists after this event.
    pub fn closes_position(&self) -> bool {
        matches!(
            self,
            PositionEvent::TargetHit { target: Target::Tp3, .. }
                | PositionEvent::StoppedOut { .. }
                | PositionEvent::BreakEven { .. }
        )
    }

    /// Renders the alert text.
    pub fn message(&self) -> String {
        match self {
            PositionEvent::Opened {
                symbol,
                side,
                venue,
                entry,
                levels,
            } => format!(
                "🚀 **NEW {side}** {symbol} @ `{}` ({venue})\nSL `{}` | TP1 `{}` | TP2 `{}` | TP3 `{}`",
                format_price(*entry),
                format_price(levels.stop_loss),
                format_price(levels.take_profit_1),
                format_price(levels.take_profit_2),
                format_price(levels.take_profit_3),
            ),
            PositionEvent::TargetHit {
                symbol,
                side,
                target,
                price,
                profit,
                balance,
            } => {
                let mut msg = format!(
                    "✅ **{target} hit** {symbol} {side} @ `{}` (+{})",
                    format_price(*price),
                    format_amount(*profit),
                );
                match target {
                    Target::Tp1 => msg.push_str("\nStop moved to entry."),
                    Target::Tp2 => {}
                    Target::Tp3 => msg.push_str("\nPosition closed."),
                }
                let _ = write!(msg, "\nBalance: {}", format_amount(*balance));
                msg
            }
            PositionEvent::StoppedOut {
                symbol,
                side,
                price,
                loss,
                balance,
            } => format!(
                "🛑 **Stop-loss** {symbol} {side} @ `{}` (-{})\nBalance: {}",
                format_price(*price),
                format_amount(*loss),
                format_amount(*balance),
            ),
            PositionEvent::BreakEven { symbol, side, price } => format!(
                "⚖️ **Break-even exit** {symbol} {side} @ `{}`",
                format_price(*price)
            ),
        }
    }
}

/// The latest bar of `coin` straddled its long SMA on one timeframe.
#[derive(Debug, Clone, PartialEq)]
pub struct SmaTouch {
    pub coin: String,
    pub timeframe: String,
    pub period: usize,
    pub price: Decimal,
}

impl SmaTouch {
    pub fn message(&self) -> String {
        format!(
            "🔔 **${}** touched the **{}** {} SMA!\nPrice: `{}`",
            self.coin,
            self.timeframe,
            self.period,
            format_price(self.price)
        )
    }
}

/// Coins whose close sits within the proximity threshold of the SMA, grouped by timeframe.
#[derive(Debug, Clone, PartialEq)]
pub struct ProximitySummary {
    period: usize,
    threshold: Decimal,
    groups: Vec<(String, Vec<(String, Decimal)>)>,
}

impl ProximitySummary {
    /// `timeframes` fixes the order in which groups are listed.
    pub fn new<I, S>(period: usize, threshold: Decimal, timeframes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            period,
            threshold,
            groups: timeframes.into_iter().map(|t| (t.into(), Vec::new())).collect(),
        }
    }

    pub fn add(&mut self, timeframe: &str, coin: impl Into<String>, price: Decimal) {
        let entry = (coin.into(), price);
        match self.groups.iter_mut().find(|(label, _)| label == timeframe) {
            Some((_, coins)) => coins.push(entry),
            None => self.groups.push((timeframe.to_string(), vec![entry])),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.groups.iter().all(|(_, coins)| coins.is_empty())
    }

    /// Number of coins listed across all timeframes.
    pub fn len(&self) -> usize {
        self.groups.iter().map(|(_, coins)| coins.len()).sum()
    }

    /// Renders the summary, or `None` if no timeframe has any coin.
    pub fn message(&self) -> Option<String> {
        if self.is_empty() {
            return None;
        }
        let pct = (self.threshold * Decimal::ONE_HUNDRED).normalize();
        let mut msg = format!(
            "🕒 **Hourly {} SMA Proximity Update** (within {pct}%)\n",
            self.period
        );
        for (timeframe, coins) in self.groups.iter().filter(|(_, coins)| !coins.is_empty()) {
            let listed: Vec<String> = coins
                .iter()
                .map(|(coin, price)| format!("${coin} ({})", format_price(*price)))
                .collect();
            let _ = write!(msg, "\n**{timeframe}**: {}", listed.join(", "));
        }
        Some(msg)
    }
}

/// The account state at the end of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub balance: Decimal,
    pub wins: u32,
    pub losses: u32,
    pub open_positions: usize,
    pub opened: usize,
    pub closed: usize,
}

impl RunSummary {
    pub fn message(&self) -> String {
        format!(
            "📊 Balance: {} | W/L: {}/{} | Open: {} (opened {}, closed {} this run)",
            format_amount(self.balance),
            self.wins,
            self.losses,
            self.open_positions,
            self.opened,
            self.closed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn tp(target: Target) -> PositionEvent {
        PositionEvent::TargetHit {
            symbol: "BTC/USDT".to_string(),
            side: PositionSide::Long,
            target,
            price: dec!(101.5),
            profit: dec!(3.75),
            balance: dec!(1003.75),
        }
    }

    #[test]
    fn opened_message_lists_every_level() {
        let event = PositionEvent::Opened {
            symbol: "ETH/USD".to_string(),
            side: PositionSide::Short,
            venue: "kraken".to_string(),
            entry: dec!(100),
            levels: PositionLevels {
                stop_loss: dec!(102),
                take_profit_1: dec!(98.5),
                take_profit_2: dec!(97),
                take_profit_3: dec!(95),
            },
        };
        assert_eq!(
            event.message(),
            "🚀 **NEW SHORT** ETH/USD @ `100.0000` (kraken)\n\
             SL `102.0000` | TP1 `98.5000` | TP2 `97.0000` | TP3 `95.0000`"
        );
        assert!(!event.closes_position());
    }

    #[test]
    fn take_profit_messages() {
        let tp1 = tp(Target::Tp1);
        assert_eq!(
            tp1.message(),
            "✅ **TP1 hit** BTC/USDT LONG @ `101.5000` (+3.75)\nStop moved to entry.\nBalance: 1003.75"
        );
        assert!(!tp1.closes_position());
        assert!(tp(Target::Tp3).message().contains("Position closed."));
        assert!(tp(Target::Tp3).closes_position());
        assert_eq!(tp1.symbol(), "BTC/USDT");
    }

    #[test]
    fn stop_messages() {
        let stopped = PositionEvent::StoppedOut {
            symbol: "SOL/USDT".to_string(),
            side: PositionSide::Long,
            price: dec!(0.98),
            loss: dec!(20),
            balance: dec!(980),
        };
        assert_eq!(
            stopped.message(),
            "🛑 **Stop-loss** SOL/USDT LONG @ `0.98` (-20.00)\nBalance: 980.00"
        );
        let even = PositionEvent::BreakEven {
            symbol: "SOL/USDT".to_string(),
            side: PositionSide::Short,
            price: dec!(1),
        };
        assert!(even.closes_position());
        assert!(even.message().contains("Break-even"));
    }

    #[test]
    fn touch_message() {
        let touch = SmaTouch {
            coin: "BTC".to_string(),
            timeframe: "Daily".to_string(),
            period: 200,
            price: dec!(64000),
        };
        assert_eq!(
            touch.message(),
            "🔔 **$BTC** touched the **Daily** 200 SMA!\nPrice: `64000.0000`"
        );
    }

    #[test]
    fn proximity_summary_lists_only_populated_timeframes_in_order() {
        let mut summary = ProximitySummary::new(200, dec!(0.02), ["4h", "Daily", "Weekly"]);
        assert!(summary.message().is_none());

        summary.add("Weekly", "ETH", dec!(3000));
        summary.add("4h", "BTC", dec!(64000));
        summary.add("4h", "PEPE", dec!(0.0000123));
        assert_eq!(summary.len(), 3);

        assert_eq!(
            summary.message().unwrap(),
            "🕒 **Hourly 200 SMA Proximity Update** (within 2%)\n\
             \n**4h**: $BTC (64000.0000), $PEPE (0.0000123)\
             \n**Weekly**: $ETH (3000.0000)"
        );
    }

    #[test]
    fn run_summary_message() {
        let summary = RunSummary {
            balance: dec!(1012.5),
            wins: 3,
            losses: 1,
            open_positions: 2,
            opened: 1,
            closed: 1,
        };
        assert_eq!(
            summary.message(),
            "📊 Balance: 1012.50 | W/L: 3/1 | Open: 2 (opened 1, closed 1 this run)"
        );
    }
}
