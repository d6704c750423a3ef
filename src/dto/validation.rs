//! Validation helpers for DTOs.

use validator::ValidationError;

use crate::dto::game::{BlindLevelDto, TimerUpdateRequest};

/// Validates that a play level carries positive, ordered blinds and a break carries none.
///
/// # Examples
///
/// ```ignore
/// // small 25 / big 50            -> Ok
/// // small 50 / big 25            -> Err - inverted
/// // play level without big blind -> Err - missing
/// ```
pub fn validate_blind_level(level: &BlindLevelDto) -> Result<(), ValidationError> {
    if level.is_break {
        return Ok(());
    }

    let (Some(small), Some(big)) = (level.small_blind, level.big_blind) else {
        let mut err = ValidationError::new("blinds_missing");
        err.message = Some("Play levels require both a small and a big blind".into());
        return Err(err);
    };

    if small == 0 || big == 0 {
        let mut err = ValidationError::new("blinds_positive");
        err.message = Some("Blinds must be positive".into());
        return Err(err);
    }

    if small > big {
        let mut err = ValidationError::new("blinds_order");
        err.message = Some(format!("Small blind {small} exceeds big blind {big}").into());
        return Err(err);
    }

    Ok(())
}

/// Validates that a paused timer is also running.
pub fn validate_timer_flags(update: &TimerUpdateRequest) -> Result<(), ValidationError> {
    if update.timer_paused && !update.timer_running {
        let mut err = ValidationError::new("timer_paused_not_running");
        err.message = Some("A paused timer must also be running".into());
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level(is_break: bool, small: Option<u64>, big: Option<u64>) -> BlindLevelDto {
        BlindLevelDto {
            index: 0,
            is_break,
            small_blind: small,
            big_blind: big,
            big_blind_ante: None,
            duration_minutes: 15,
        }
    }

    #[test]
    fn test_validate_blind_level_valid() {
        assert!(validate_blind_level(&level(false, Some(25), Some(50))).is_ok());
        assert!(validate_blind_level(&level(false, Some(50), Some(50))).is_ok());
        assert!(validate_blind_level(&level(true, None, None)).is_ok());
    }

    #[test]
    fn test_validate_blind_level_invalid() {
        assert!(validate_blind_level(&level(false, None, Some(50))).is_err()); // missing
        assert!(validate_blind_level(&level(false, Some(0), Some(50))).is_err()); // zero
        assert!(validate_blind_level(&level(false, Some(100), Some(50))).is_err()); // inverted
    }
}
