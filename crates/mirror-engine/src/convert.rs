//! Event-to-command conversion.

use mirror_core::{
    AccountId, Command, CommandAction, PairSettings, Signal, SignalEvent, TradeDirection, Volume,
};
use thiserror::Error;
use tracing::debug;

/// Conversion failure for one (signal, slave) pair.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("Unknown event kind")]
    UnknownEvent,

    #[error("Open signal carries no direction")]
    MissingDirection,
}

/// Result of converting a signal for one slave.
#[derive(Debug)]
pub enum Conversion {
    /// A command to enqueue.
    Command(Command),
    /// Deliberate no-op for this slave, with the reason.
    Skip(String),
}

/// Correlation comment tying slave positions back to the master order.
///
/// Close and modify events on the same order produce the same tag, which
/// is how the slave terminal finds the position to act on. It also makes
/// redelivered commands idempotent on the terminal side.
pub fn correlation_comment(master: &AccountId, order_id: Option<&str>) -> String {
    match order_id {
        Some(id) if !id.is_empty() => format!("COPY_{id}"),
        _ => format!("Copy from master {master}"),
    }
}

/// Convert one signal into a slave command.
///
/// `volume` is the already-computed slave-side volume; it is required for
/// opens and partial closes and ignored otherwise.
pub fn build_command(
    signal: &Signal,
    settings: &PairSettings,
    slave: &AccountId,
    slave_symbol: &str,
    volume: Option<Volume>,
) -> Result<Conversion, ConvertError> {
    let comment = correlation_comment(&signal.account, signal.order_id.as_deref());

    match signal.event {
        SignalEvent::Open => {
            let action = match signal.direction {
                Some(TradeDirection::Buy) => CommandAction::Buy,
                Some(TradeDirection::Sell) => CommandAction::Sell,
                None => return Err(ConvertError::MissingDirection),
            };

            let (take_profit, stop_loss) = if settings.copy_stop_take {
                (signal.take_profit, signal.stop_loss)
            } else {
                (None, None)
            };

            debug!(%slave, %slave_symbol, %action, "Open command built");
            Ok(Conversion::Command(Command {
                account: slave.clone(),
                action,
                symbol: slave_symbol.to_string(),
                volume,
                price: signal.price,
                take_profit,
                stop_loss,
                comment,
            }))
        }

        SignalEvent::Close => {
            if signal.is_partial_close() {
                // Partial close: carry the computed proportional volume.
                debug!(%slave, %slave_symbol, "Partial close command built");
                return Ok(Conversion::Command(Command {
                    account: slave.clone(),
                    action: CommandAction::Close,
                    symbol: slave_symbol.to_string(),
                    volume,
                    price: None,
                    take_profit: None,
                    stop_loss: None,
                    comment,
                }));
            }

            let action = if signal.order_id.as_deref().map(|id| !id.is_empty()).unwrap_or(false) {
                CommandAction::CloseByComment
            } else {
                CommandAction::CloseAll
            };
            debug!(%slave, %slave_symbol, %action, "Close command built");
            Ok(Conversion::Command(Command {
                account: slave.clone(),
                action,
                symbol: slave_symbol.to_string(),
                volume: None,
                price: None,
                take_profit: None,
                stop_loss: None,
                comment,
            }))
        }

        SignalEvent::Modify => {
            if !settings.copy_stop_take {
                return Ok(Conversion::Skip("stop/take copying disabled".to_string()));
            }
            if signal.order_id.as_deref().map(str::is_empty).unwrap_or(true) {
                return Ok(Conversion::Skip("no order id to correlate".to_string()));
            }

            debug!(%slave, %slave_symbol, "Modify command built");
            Ok(Conversion::Command(Command {
                account: slave.clone(),
                action: CommandAction::ModifyByComment,
                symbol: slave_symbol.to_string(),
                volume: None,
                price: None,
                take_profit: signal.take_profit,
                stop_loss: signal.stop_loss,
                comment,
            }))
        }

        SignalEvent::Unknown => Err(ConvertError::UnknownEvent),
    }
}
