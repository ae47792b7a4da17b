//! The position state machine.
//!
//! For one position and one fresh price, the checks run in a fixed order:
//! TP3 (terminal), TP2, TP1 (stop moves to entry), then the stop. TP2 and TP1
//! can both fire on the same tick when the price gaps through both.

use core_types::Target;
use events::PositionEvent;
use ledger::Ledger;
use risk::RiskManager;
use rust_decimal::Decimal;

/// Applies `price` to the position held under `symbol` and returns the
/// transitions that occurred, in order. A symbol with no open position is a
/// no-op.
///
/// Wins and losses are counted once per position: TP1 is the win; a stop before
/// TP1 is the loss; a break-even exit after TP1 counts neither. A position that
/// reaches TP3 without TP1 ever being registered counts its win there.
pub fn evaluate(
    ledger: &mut Ledger,
    symbol: &str,
    price: Decimal,
    risk: &dyn RiskManager,
) -> Vec<PositionEvent> {
    let Some(mut position) = ledger.positions.remove(symbol) else {
        return Vec::new();
    };
    let side = position.side();
    let mut events = Vec::new();

    if position.reached(price, position.take_profit_3()) {
        let profit = risk.target_profit(Target::Tp3);
        ledger.balance += profit;
        if !position.tp1_hit() {
            ledger.wins += 1;
        }
        events.push(PositionEvent::TargetHit {
            symbol: symbol.to_string(),
            side,
            target: Target::Tp3,
            price,
            profit,
            balance: ledger.balance,
        });
        return events;
    }

    if !position.tp2_hit() && position.reached(price, position.take_profit_2()) {
        let profit = risk.target_profit(Target::Tp2);
        ledger.balance += profit;
        position.mark_tp2();
        events.push(PositionEvent::TargetHit {
            symbol: symbol.to_string(),
            side,
            target: Target::Tp2,
            price,
            profit,
            balance: ledger.balance,
        });
    }

    if !position.tp1_hit() && position.reached(price, position.take_profit_1()) {
        let profit = risk.target_profit(Target::Tp1);
        ledger.balance += profit;
        ledger.wins += 1;
        position.mark_tp1();
        events.push(PositionEvent::TargetHit {
            symbol: symbol.to_string(),
            side,
            target: Target::Tp1,
            price,
            profit,
            balance: ledger.balance,
        });
    }

    if position.stopped_out(price) {
        if position.tp1_hit() {
            events.push(PositionEvent::BreakEven {
                symbol: symbol.to_string(),
                side,
                price,
            });
        } else {
            let loss = risk.stop_loss_amount();
            ledger.balance -= loss;
            ledger.losses += 1;
            events.push(PositionEvent::StoppedOut {
                symbol: symbol.to_string(),
                side,
                price,
                loss,
                balance: ledger.balance,
            });
        }
        return events;
    }

    ledger.positions.insert(symbol.to_string(), position);
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use configuration::RiskManagement;
    use core_types::{Position, PositionSide};
    use risk::SimpleRiskManager;
    use rust_decimal_macros::dec;

    const SYMBOL: &str = "BTC/USDT";

    fn risk() -> SimpleRiskManager {
        SimpleRiskManager::new(RiskManagement::default()).unwrap()
    }

    fn ledger_with(side: PositionSide) -> Ledger {
        let levels = risk().levels_for(side, dec!(100)).unwrap();
        let mut ledger = Ledger::new(dec!(1000));
        ledger
            .record_open(SYMBOL, Position::open(side, dec!(100), "binance", levels).unwrap())
            .unwrap();
        ledger
    }

    fn targets(events: &[PositionEvent]) -> Vec<Target> {
        events
            .iter()
            .filter_map(|e| match e {
                PositionEvent::TargetHit { target, .. } => Some(*target),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn staged_targets_then_break_even_exit() {
        let risk = risk();
        let mut ledger = ledger_with(PositionSide::Long);

        let events = evaluate(&mut ledger, SYMBOL, dec!(101.5), &risk);
        assert_eq!(targets(&events), vec![Target::Tp1]);
        assert_eq!(ledger.balance, dec!(1003.75));
        assert_eq!(ledger.wins, 1);
        let position = &ledger.positions[SYMBOL];
        assert!(position.tp1_hit());
        assert_eq!(position.stop_loss(), dec!(100));

        let events = evaluate(&mut ledger, SYMBOL, dec!(103), &risk);
        assert_eq!(targets(&events), vec![Target::Tp2]);
        assert_eq!(ledger.balance, dec!(1018.75));
        assert!(ledger.positions[SYMBOL].tp2_hit());

        let events = evaluate(&mut ledger, SYMBOL, dec!(100), &risk);
        assert!(matches!(events.as_slice(), [PositionEvent::BreakEven { .. }]));
        assert!(!ledger.holds(SYMBOL));
        assert_eq!(ledger.balance, dec!(1018.75));
        assert_eq!((ledger.wins, ledger.losses), (1, 0));
    }

    #[test]
    fn take_profit_3_closes_immediately() {
        let risk = risk();
        let mut ledger = ledger_with(PositionSide::Long);
        evaluate(&mut ledger, SYMBOL, dec!(101.5), &risk);

        let events = evaluate(&mut ledger, SYMBOL, dec!(105), &risk);
        assert_eq!(targets(&events), vec![Target::Tp3]);
        assert!(events[0].closes_position());
        assert!(!ledger.holds(SYMBOL));
        assert_eq!(ledger.balance, dec!(1003.75) + dec!(12.5));
        assert_eq!(ledger.wins, 1);
    }

    #[test]
    fn gap_straight_to_take_profit_3_counts_one_win() {
        let risk = risk();
        let mut ledger = ledger_with(PositionSide::Long);

        let events = evaluate(&mut ledger, SYMBOL, dec!(110), &risk);
        assert_eq!(events.len(), 1);
        assert_eq!(targets(&events), vec![Target::Tp3]);
        assert_eq!(ledger.balance, dec!(1012.5));
        assert_eq!((ledger.wins, ledger.losses), (1, 0));
    }

    #[test]
    fn gap_through_tp2_fires_tp2_then_tp1() {
        let risk = risk();
        let mut ledger = ledger_with(PositionSide::Long);

        let events = evaluate(&mut ledger, SYMBOL, dec!(104), &risk);
        assert_eq!(targets(&events), vec![Target::Tp2, Target::Tp1]);
        assert_eq!(ledger.balance, dec!(1018.75));
        assert_eq!(ledger.wins, 1);
        let position = &ledger.positions[SYMBOL];
        assert!(position.tp1_hit() && position.tp2_hit());

        // Nothing fires twice.
        assert!(evaluate(&mut ledger, SYMBOL, dec!(104), &risk).is_empty());
        assert_eq!(ledger.balance, dec!(1018.75));
    }

    #[test]
    fn stop_before_tp1_is_a_full_loss() {
        let risk = risk();
        let mut ledger = ledger_with(PositionSide::Long);

        assert!(evaluate(&mut ledger, SYMBOL, dec!(99), &risk).is_empty());
        let events = evaluate(&mut ledger, SYMBOL, dec!(98), &risk);
        assert!(matches!(
            events.as_slice(),
            [PositionEvent::StoppedOut { loss, .. }] if *loss == dec!(20)
        ));
        assert_eq!(ledger.balance, dec!(980));
        assert_eq!((ledger.wins, ledger.losses), (0, 1));
        assert!(!ledger.holds(SYMBOL));
    }

    #[test]
    fn short_positions_are_mirrored() {
        let risk = risk();
        let mut ledger = ledger_with(PositionSide::Short);

        let events = evaluate(&mut ledger, SYMBOL, dec!(98.5), &risk);
        assert_eq!(targets(&events), vec![Target::Tp1]);
        assert_eq!(ledger.positions[SYMBOL].stop_loss(), dec!(100));

        let events = evaluate(&mut ledger, SYMBOL, dec!(100.2), &risk);
        assert!(matches!(events.as_slice(), [PositionEvent::BreakEven { .. }]));
        assert_eq!((ledger.wins, ledger.losses), (1, 0));

        let mut ledger = ledger_with(PositionSide::Short);
        let events = evaluate(&mut ledger, SYMBOL, dec!(102), &risk);
        assert!(matches!(events.as_slice(), [PositionEvent::StoppedOut { .. }]));
        assert_eq!(ledger.losses, 1);
    }

    #[test]
    fn unknown_symbol_and_empty_ledger_are_no_ops() {
        let risk = risk();
        let mut ledger = Ledger::new(dec!(1000));
        assert!(evaluate(&mut ledger, SYMBOL, dec!(100), &risk).is_empty());
        assert_eq!(ledger, Ledger::new(dec!(1000)));
    }

    #[test]
    fn price_between_levels_changes_nothing() {
        let risk = risk();
        let mut ledger = ledger_with(PositionSide::Long);
        let before = ledger.clone();
        assert!(evaluate(&mut ledger, SYMBOL, dec!(100.7), &risk).is_empty());
        assert_eq!(ledger, before);
    }
}
