use configuration::RiskManagement;
use rust_decimal::Decimal;

/// Decides whether the account may open another position during this run.
///
/// Capacity is `balance - open_positions * margin_per_trade`; another position
/// fits only while that is at least one margin. Independently, at most
/// `max_new_positions_per_run` positions are opened per invocation.
#[derive(Debug, Clone)]
pub struct OpeningGate {
    margin_per_trade: Decimal,
    max_new_positions: usize,
    opened: usize,
}

impl OpeningGate {
    pub fn new(params: &RiskManagement) -> Self {
        Self {
            margin_per_trade: params.margin_per_trade,
            max_new_positions: params.max_new_positions_per_run,
            opened: 0,
        }
    }

    /// Margin committed to the currently open positions.
    pub fn used(&self, open_positions: usize) -> Decimal {
        Decimal::from(open_positions) * self.margin_per_trade
    }

    pub fn available(&self, balance: Decimal, open_positions: usize) -> Decimal {
        balance - self.used(open_positions)
    }

    /// True if the balance can back one more position.
    pub fn has_capacity(&self, balance: Decimal, open_positions: usize) -> bool {
        self.available(balance, open_positions) >= self.margin_per_trade
    }

    /// True if another position may be opened now.
    pub fn can_open(&self, balance: Decimal, open_positions: usize) -> bool {
        self.opened < self.max_new_positions && self.has_capacity(balance, open_positions)
    }

    pub fn record_open(&mut self) {
        self.opened += 1;
    }

    pub fn opened(&self) -> usize {
        self.opened
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn balance_equal_to_used_margin_blocks_opening() {
        let gate = OpeningGate::new(&RiskManagement::default());
        // 3 open * 100 margin = 300 used, nothing left.
        assert_eq!(gate.available(dec!(300), 3), dec!(0));
        assert!(!gate.has_capacity(dec!(300), 3));
        assert!(!gate.can_open(dec!(300), 3));
    }

    #[test]
    fn exactly_one_margin_available_allows_opening() {
        let gate = OpeningGate::new(&RiskManagement::default());
        assert!(gate.can_open(dec!(400), 3));
        assert!(!gate.can_open(dec!(399.99), 3));
    }

    #[test]
    fn per_run_cap_applies() {
        let mut gate = OpeningGate::new(&RiskManagement::default());
        assert!(gate.can_open(dec!(1000), 0));
        gate.record_open();
        assert_eq!(gate.opened(), 1);
        assert!(!gate.can_open(dec!(1000), 1));

        let mut wider = OpeningGate::new(&RiskManagement {
            max_new_positions_per_run: 2,
            ..RiskManagement::default()
        });
        wider.record_open();
        assert!(wider.can_open(dec!(1000), 1));
    }
}
