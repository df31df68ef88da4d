//! Configuration validation.
//!
//! Every key is optional; only values that are present and out of range are
//! rejected. Runs before any data is loaded.

use crate::domain::backtest::{EntryMethod, ExitMethod};
use crate::domain::error::StratrankError;
use crate::ports::config_port::ConfigPort;

const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Validate every section.
pub fn validate_config(config: &dyn ConfigPort) -> Result<(), StratrankError> {
    validate_backtest_config(config)?;
    validate_ranking_config(config)?;
    validate_strategy_config(config)?;
    validate_engine_config(config)?;
    Ok(())
}

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), StratrankError> {
    validate_methods(config)?;
    validate_hold_days(config)?;
    validate_fraction(config, "backtest", "transaction_cost", 0.001)?;
    validate_fraction(config, "backtest", "slippage", 0.0005)?;
    Ok(())
}

pub fn validate_ranking_config(config: &dyn ConfigPort) -> Result<(), StratrankError> {
    let weights = [
        ("win_ratio_weight", config.get_double("ranking", "win_ratio_weight", 0.5)),
        (
            "profit_factor_weight",
            config.get_double("ranking", "profit_factor_weight", 0.3),
        ),
        ("ltm_return_weight", config.get_double("ranking", "ltm_return_weight", 0.2)),
    ];

    for (key, value) in weights {
        if value.is_nan() || value < 0.0 {
            return Err(invalid("ranking", key, format!("{key} must be non-negative")));
        }
    }

    let sum: f64 = weights.iter().map(|(_, v)| v).sum();
    if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
        return Err(invalid(
            "ranking",
            "win_ratio_weight",
            format!("ranking weights must sum to 1 (got {sum})"),
        ));
    }
    Ok(())
}

pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), StratrankError> {
    if config.get_int("strategies", "bb_window", 3) < 1 {
        return Err(invalid(
            "strategies",
            "bb_window",
            "bb_window must be at least 1".to_string(),
        ));
    }

    let low = config.get_double("strategies", "rsi_band_low", 45.0);
    let high = config.get_double("strategies", "rsi_band_high", 60.0);
    if low > high {
        return Err(invalid(
            "strategies",
            "rsi_band_low",
            "rsi_band_low must not exceed rsi_band_high".to_string(),
        ));
    }

    let volume = config.get_double("strategies", "volume_multiplier", 1.2);
    if volume.is_nan() || volume < 0.0 {
        return Err(invalid(
            "strategies",
            "volume_multiplier",
            "volume_multiplier must be non-negative".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_engine_config(config: &dyn ConfigPort) -> Result<(), StratrankError> {
    if config.get_int("engine", "workers", 0) < 0 {
        return Err(invalid(
            "engine",
            "workers",
            "workers must be non-negative".to_string(),
        ));
    }
    Ok(())
}

fn validate_methods(config: &dyn ConfigPort) -> Result<(), StratrankError> {
    if let Some(value) = config.get_string("backtest", "entry_method") {
        value
            .parse::<EntryMethod>()
            .map_err(|reason| invalid("backtest", "entry_method", reason))?;
    }
    if let Some(value) = config.get_string("backtest", "exit_method") {
        value
            .parse::<ExitMethod>()
            .map_err(|reason| invalid("backtest", "exit_method", reason))?;
    }
    Ok(())
}

fn validate_hold_days(config: &dyn ConfigPort) -> Result<(), StratrankError> {
    if config.get_int("backtest", "hold_days", 10) < 1 {
        return Err(invalid(
            "backtest",
            "hold_days",
            "hold_days must be at least 1".to_string(),
        ));
    }
    Ok(())
}

fn validate_fraction(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<(), StratrankError> {
    let value = config.get_double(section, key, default);
    if !(0.0..1.0).contains(&value) {
        return Err(invalid(section, key, format!("{key} must be between 0 and 1")));
    }
    Ok(())
}

fn invalid(section: &str, key: &str, reason: String) -> StratrankError {
    StratrankError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason,
    }
}
