//! Per-team currency balances and shared channels.

use skirmish_core::{Currency, Rules, Team, TeamSummary};
use thiserror::Error;

/// Failures raised by ledger mutations.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Applying the delta would leave a negative balance.
    #[error("{team:?} {currency} balance {balance} cannot absorb {delta}")]
    Underflow {
        /// Team whose balance was touched.
        team: Team,
        /// Currency that was touched.
        currency: Currency,
        /// Balance before the rejected delta.
        balance: u32,
        /// Rejected delta.
        delta: i64,
    },
    /// Applying the delta would exceed the representable balance.
    #[error("{team:?} {currency} balance {balance} overflows with {delta}")]
    Overflow {
        /// Team whose balance was touched.
        team: Team,
        /// Currency that was touched.
        currency: Currency,
        /// Balance before the rejected delta.
        balance: u32,
        /// Rejected delta.
        delta: i64,
    },
    /// The channel slot does not exist.
    #[error("channel index {index} out of range for length {length}")]
    ChannelIndex {
        /// Requested slot.
        index: usize,
        /// Channel length.
        length: usize,
    },
    /// The value lies outside the configured channel bounds.
    #[error("channel value {value} outside {min}..={max}")]
    ChannelValue {
        /// Rejected value.
        value: u32,
        /// Smallest accepted value.
        min: u32,
        /// Largest accepted value.
        max: u32,
    },
}

#[derive(Clone, Debug)]
struct Account {
    lead: u32,
    gold: u32,
    previous_lead: u32,
    previous_gold: u32,
    channel: Vec<u32>,
}

impl Account {
    fn balance_mut(&mut self, currency: Currency) -> &mut u32 {
        match currency {
            Currency::Lead => &mut self.lead,
            Currency::Gold => &mut self.gold,
        }
    }
}

/// Authoritative currency counters and channels for both teams.
#[derive(Clone, Debug)]
pub struct Ledger {
    accounts: [Account; 2],
    channel_min: u32,
    channel_max: u32,
}

impl Ledger {
    /// Creates a ledger holding the starting balances from `rules`.
    #[must_use]
    pub fn new(rules: &Rules) -> Self {
        let account = Account {
            lead: rules.starting_lead,
            gold: rules.starting_gold,
            previous_lead: rules.starting_lead,
            previous_gold: rules.starting_gold,
            channel: vec![rules.channel_min; rules.channel_length],
        };
        Self {
            accounts: [account.clone(), account],
            channel_min: rules.channel_min,
            channel_max: rules.channel_max,
        }
    }

    /// Current balance of `currency` held by `team`.
    #[must_use]
    pub fn balance(&self, team: Team, currency: Currency) -> u32 {
        let account = &self.accounts[team.index()];
        match currency {
            Currency::Lead => account.lead,
            Currency::Gold => account.gold,
        }
    }

    /// Applies a signed delta and returns the new balance.
    ///
    /// A delta that would leave a negative balance is rejected and the balance
    /// is left untouched; the ledger never clamps.
    pub fn add_currency(
        &mut self,
        team: Team,
        currency: Currency,
        delta: i64,
    ) -> Result<u32, LedgerError> {
        let slot = self.accounts[team.index()].balance_mut(currency);
        let balance = *slot;
        let next = i64::from(balance) + delta;
        if next < 0 {
            return Err(LedgerError::Underflow {
                team,
                currency,
                balance,
                delta,
            });
        }
        let next = u32::try_from(next).map_err(|_| LedgerError::Overflow {
            team,
            currency,
            balance,
            delta,
        })?;
        *slot = next;
        Ok(next)
    }

    /// Reads one slot of `team`'s channel.
    pub fn read_channel(&self, team: Team, index: usize) -> Result<u32, LedgerError> {
        let channel = &self.accounts[team.index()].channel;
        channel
            .get(index)
            .copied()
            .ok_or(LedgerError::ChannelIndex {
                index,
                length: channel.len(),
            })
    }

    /// Overwrites one slot of `team`'s channel.
    pub fn write_channel(&mut self, team: Team, index: usize, value: u32) -> Result<(), LedgerError> {
        if value < self.channel_min || value > self.channel_max {
            return Err(LedgerError::ChannelValue {
                value,
                min: self.channel_min,
                max: self.channel_max,
            });
        }
        let channel = &mut self.accounts[team.index()].channel;
        let length = channel.len();
        let slot = channel
            .get_mut(index)
            .ok_or(LedgerError::ChannelIndex { index, length })?;
        *slot = value;
        Ok(())
    }

    /// Balances and deltas since the last snapshot, in canonical team order.
    #[must_use]
    pub fn summaries(&self) -> [TeamSummary; 2] {
        Team::ALL.map(|team| {
            let account = &self.accounts[team.index()];
            TeamSummary {
                team,
                lead: account.lead,
                gold: account.gold,
                lead_delta: i64::from(account.lead) - i64::from(account.previous_lead),
                gold_delta: i64::from(account.gold) - i64::from(account.previous_gold),
            }
        })
    }

    /// Records the current balances as the baseline for the next summary.
    pub fn snapshot_round(&mut self) {
        for account in &mut self.accounts {
            account.previous_lead = account.lead;
            account.previous_gold = account.gold;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn underflow_is_rejected_without_clamping() {
        let mut ledger = Ledger::new(&Rules::default());
        let result = ledger.add_currency(Team::A, Currency::Lead, -201);
        assert!(matches!(result, Err(LedgerError::Underflow { balance: 200, .. })));
        assert_eq!(ledger.balance(Team::A, Currency::Lead), 200);
        assert_eq!(ledger.add_currency(Team::A, Currency::Lead, -200), Ok(0));
    }

    #[test]
    fn teams_hold_independent_balances() {
        let mut ledger = Ledger::new(&Rules::default());
        assert_eq!(ledger.add_currency(Team::B, Currency::Gold, 15), Ok(15));
        assert_eq!(ledger.balance(Team::A, Currency::Gold), 0);
        assert_eq!(ledger.balance(Team::B, Currency::Gold), 15);
    }

    #[test]
    fn channel_bounds_are_enforced() {
        let rules = Rules::default();
        let mut ledger = Ledger::new(&rules);
        assert_eq!(ledger.write_channel(Team::A, 3, 77), Ok(()));
        assert_eq!(ledger.read_channel(Team::A, 3), Ok(77));
        assert_eq!(ledger.read_channel(Team::B, 3), Ok(0));
        assert!(matches!(
            ledger.write_channel(Team::A, rules.channel_length, 1),
            Err(LedgerError::ChannelIndex { .. })
        ));
        assert!(matches!(
            ledger.write_channel(Team::A, 0, rules.channel_max + 1),
            Err(LedgerError::ChannelValue { .. })
        ));
        assert!(ledger.read_channel(Team::A, rules.channel_length).is_err());
    }

    #[test]
    fn summaries_report_deltas_since_snapshot() {
        let mut ledger = Ledger::new(&Rules::default());
        let _ = ledger.add_currency(Team::A, Currency::Lead, 5);
        let _ = ledger.add_currency(Team::B, Currency::Lead, -50);
        let summaries = ledger.summaries();
        assert_eq!(summaries[0].lead_delta, 5);
        assert_eq!(summaries[1].lead_delta, -50);

        ledger.snapshot_round();
        let summaries = ledger.summaries();
        assert_eq!(summaries[0].lead, 205);
        assert_eq!(summaries[0].lead_delta, 0);
        assert_eq!(summaries[1].lead_delta, 0);
    }
}
