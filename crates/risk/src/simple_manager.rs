use crate::error::RiskError;
use crate::RiskManager;
use configuration::RiskManagement;
use core_types::{PositionLevels, PositionSide, Target};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Fixed-percentage levels around the entry and fixed-notional payouts.
///
/// Every position has the same notional (`margin_per_trade * leverage`), so the
/// payout of each target is a constant independent of entry price.
#[derive(Debug, Clone)]
pub struct SimpleRiskManager {
    params: RiskManagement,
}

impl SimpleRiskManager {
    /// Creates a new `SimpleRiskManager` with the given configuration parameters.
    pub fn new(params: RiskManagement) -> Result<Self, RiskError> {
        if params.margin_per_trade <= dec!(0) {
            return Err(RiskError::InvalidParameters(
                "margin_per_trade must be greater than 0".to_string(),
            ));
        }
        if params.stop_loss_pct <= dec!(0) || params.stop_loss_pct >= dec!(1) {
            return Err(RiskError::InvalidParameters(
                "stop_loss_pct must be between 0 and 1".to_string(),
            ));
        }
        if !(dec!(0) < params.tp1_pct && params.tp1_pct < params.tp2_pct && params.tp2_pct < params.tp3_pct)
            || params.tp3_pct >= dec!(1)
        {
            return Err(RiskError::InvalidParameters(
                "take-profit percentages must satisfy 0 < tp1 < tp2 < tp3 < 1".to_string(),
            ));
        }
        Ok(Self { params })
    }
}

impl RiskManager for SimpleRiskManager {
    fn levels_for(&self, side: PositionSide, entry: Decimal) -> Result<PositionLevels, RiskError> {
        if entry <= dec!(0) {
            return Err(RiskError::InvalidEntryPrice(entry));
        }

        let p = &self.params;
        let dir = Decimal::from(side.direction());
        let at = |pct: Decimal| entry * (dec!(1) + dir * pct);

        let levels = PositionLevels {
            stop_loss: entry * (dec!(1) - dir * p.stop_loss_pct),
            take_profit_1: at(p.tp1_pct),
            take_profit_2: at(p.tp2_pct),
            take_profit_3: at(p.tp3_pct),
        };

        // Tiny entries can round the levels together at Decimal precision.
        if levels.stop_loss == entry || levels.take_profit_1 == entry {
            return Err(RiskError::InvalidLevels(format!(
                "levels collapse onto entry {entry}"
            )));
        }
        Ok(levels)
    }

    fn target_profit(&self, target: Target) -> Decimal {
        let p = &self.params;
        let (allocation, pct) = match target {
            Target::Tp1 => (p.tp1_allocation, p.tp1_pct),
            Target::Tp2 => (p.tp2_allocation, p.tp2_pct),
            Target::Tp3 => (p.tp3_allocation, p.tp3_pct),
        };
        p.notional() * allocation * pct
    }

    fn stop_loss_amount(&self) -> Decimal {
        self.params.loss_per_trade
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> SimpleRiskManager {
        SimpleRiskManager::new(RiskManagement::default()).unwrap()
    }

    #[test]
    fn long_levels_sit_above_entry() {
        let levels = manager().levels_for(PositionSide::Long, dec!(100)).unwrap();
        assert_eq!(levels.stop_loss, dec!(98));
        assert_eq!(levels.take_profit_1, dec!(101.5));
        assert_eq!(levels.take_profit_2, dec!(103));
        assert_eq!(levels.take_profit_3, dec!(105));
    }

    #[test]
    fn short_levels_are_mirrored() {
        let levels = manager().levels_for(PositionSide::Short, dec!(100)).unwrap();
        assert_eq!(levels.stop_loss, dec!(102));
        assert_eq!(levels.take_profit_1, dec!(98.5));
        assert_eq!(levels.take_profit_2, dec!(97));
        assert_eq!(levels.take_profit_3, dec!(95));
    }

    #[test]
    fn default_payouts() {
        let m = manager();
        // notional 1000
        assert_eq!(m.target_profit(Target::Tp1), dec!(3.75));
        assert_eq!(m.target_profit(Target::Tp2), dec!(15));
        assert_eq!(m.target_profit(Target::Tp3), dec!(12.5));
        assert_eq!(m.stop_loss_amount(), dec!(20));
    }

    #[test]
    fn rejects_bad_parameters_and_prices() {
        let params = RiskManagement {
            tp2_pct: dec!(0.01),
            ..RiskManagement::default()
        };
        assert!(matches!(
            SimpleRiskManager::new(params),
            Err(RiskError::InvalidParameters(_))
        ));

        assert_eq!(
            manager().levels_for(PositionSide::Long, dec!(0)),
            Err(RiskError::InvalidEntryPrice(dec!(0)))
        );
    }
}
