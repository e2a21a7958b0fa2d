//! Slave volume calculation.

use mirror_core::{AccountId, PairSettings, Volume, VolumeMode};
use mirror_registry::BrokerCatalog;
use rust_decimal::Decimal;
use tracing::{debug, warn};

/// Compute the slave-side volume for one signal.
///
/// `force_proportional` is set for partial closes: a fixed-mode pairing
/// would otherwise close an absolute volume unrelated to the remaining
/// position, so partials always scale off the master volume.
///
/// The result is clamped to the slave symbol's broker limits and snapped
/// to its volume step when a catalog entry exists; without one the
/// computed value passes through unchanged.
#[allow(clippy::too_many_arguments)]
pub fn compute_volume(
    master_volume: Volume,
    settings: &PairSettings,
    master: &AccountId,
    master_symbol: &str,
    slave: &AccountId,
    slave_symbol: &str,
    catalog: &BrokerCatalog,
    force_proportional: bool,
) -> Volume {
    let mode = if force_proportional && settings.volume_mode == VolumeMode::Fixed {
        warn!(
            %slave,
            "Fixed volume mode cannot express a partial close, scaling proportionally"
        );
        VolumeMode::Multiply
    } else {
        settings.volume_mode
    };

    let computed = match mode {
        VolumeMode::Fixed => Volume::new(settings.multiplier),
        VolumeMode::Multiply => multiply(
            master_volume,
            settings,
            master,
            master_symbol,
            slave,
            slave_symbol,
            catalog,
        ),
        VolumeMode::Percent => percent(
            master_volume,
            settings,
            master,
            master_symbol,
            slave,
            slave_symbol,
            catalog,
        ),
    };

    adjust_to_limits(computed, slave, slave_symbol, catalog)
}

/// Multiply mode: master volume times the multiplier, optionally
/// corrected for differing contract sizes so the notional exposure
/// matches across brokers.
fn multiply(
    master_volume: Volume,
    settings: &PairSettings,
    master: &AccountId,
    master_symbol: &str,
    slave: &AccountId,
    slave_symbol: &str,
    catalog: &BrokerCatalog,
) -> Volume {
    let base = master_volume * settings.multiplier;

    if !settings.auto_map_volume || master_symbol == slave_symbol {
        return base;
    }

    let master_contract = catalog.contract_size(master, master_symbol);
    let slave_contract = catalog.contract_size(slave, slave_symbol);
    match (master_contract, slave_contract) {
        (Some(mc), Some(sc)) if !mc.is_zero() && !sc.is_zero() && mc != sc => {
            let corrected = base * (mc / sc);
            debug!(
                %master_symbol,
                %slave_symbol,
                master_contract = %mc,
                slave_contract = %sc,
                base = %base,
                corrected = %corrected,
                "Contract-size correction applied"
            );
            corrected
        }
        (Some(_), Some(_)) => base,
        _ => {
            warn!(
                %master_symbol,
                %slave_symbol,
                "Contract size unavailable, skipping correction"
            );
            base
        }
    }
}

/// Percent mode: scale the master volume by the slave/master balance
/// ratio, then the multiplier. Falls back to multiply when either balance
/// is unknown or the master balance is zero.
fn percent(
    master_volume: Volume,
    settings: &PairSettings,
    master: &AccountId,
    master_symbol: &str,
    slave: &AccountId,
    slave_symbol: &str,
    catalog: &BrokerCatalog,
) -> Volume {
    let master_balance = catalog.balance(master);
    let slave_balance = catalog.balance(slave);

    match (master_balance, slave_balance) {
        (Some(mb), Some(sb)) if mb > Decimal::ZERO => {
            let result = master_volume * (sb / mb) * settings.multiplier;
            debug!(
                master_balance = %mb,
                slave_balance = %sb,
                result = %result,
                "Percent mode balance ratio"
            );
            result
        }
        _ => {
            warn!(%master, %slave, "Balance unavailable for percent mode, using multiply");
            multiply(
                master_volume,
                settings,
                master,
                master_symbol,
                slave,
                slave_symbol,
                catalog,
            )
        }
    }
}

/// Clamp into the broker's volume limits and snap to its step.
fn adjust_to_limits(
    volume: Volume,
    slave: &AccountId,
    slave_symbol: &str,
    catalog: &BrokerCatalog,
) -> Volume {
    let Some(entry) = catalog.symbol_entry(slave, slave_symbol) else {
        return volume;
    };

    let mut adjusted = volume;
    if let Some(max) = entry.volume_max {
        if adjusted > max {
            warn!(%slave_symbol, volume = %adjusted, max = %max, "Volume above broker max, clamping");
            adjusted = max;
        }
    }
    if let Some(step) = entry.volume_step {
        adjusted = adjusted.snap_to_step(step);
    }
    if let Some(min) = entry.volume_min {
        if adjusted < min {
            warn!(%slave_symbol, volume = %adjusted, min = %min, "Volume below broker min, raising");
            adjusted = min;
        }
    }
    adjusted
}
