//! Execution ordering for trades

use super::trade::Trade;

/// Order trades so liquidity-releasing actions run first.
///
/// Withdrawals (remove, decrease) precede deposits (add, increase). Each group
/// is sorted by amount, largest first; equal amounts keep their input order.
pub fn order_trades(trades: Vec<Trade>) -> Vec<Trade> {
    let (mut withdrawals, mut deposits): (Vec<Trade>, Vec<Trade>) =
        trades.into_iter().partition(|t| t.action.is_withdrawal());

    // sort_by is stable
    withdrawals.sort_by(|a, b| b.amount.cmp(&a.amount));
    deposits.sort_by(|a, b| b.amount.cmp(&a.amount));

    withdrawals.extend(deposits);
    withdrawals
}
