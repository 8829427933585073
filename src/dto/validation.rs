//! Validation helpers for DTOs.

use validator::ValidationError;

/// Validates that a dice value is within the face range of a standard die.
pub fn validate_dice(dice: u8) -> Result<(), ValidationError> {
    if !(1..=6).contains(&dice) {
        let mut err = ValidationError::new("dice_range");
        err.message = Some(format!("Dice value must be between 1 and 6 (got {dice})").into());
        return Err(err);
    }

    Ok(())
}

/// Validates a multiple-choice option index against the four-option maximum.
pub fn validate_option_index(index: u8) -> Result<(), ValidationError> {
    if index > 3 {
        let mut err = ValidationError::new("option_index_range");
        err.message = Some(format!("Option index must be between 0 and 3 (got {index})").into());
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_dice_valid() {
        for face in 1..=6 {
            assert!(validate_dice(face).is_ok());
        }
    }

    #[test]
    fn test_validate_dice_invalid() {
        assert!(validate_dice(0).is_err());
        assert!(validate_dice(7).is_err());
        assert!(validate_dice(255).is_err());
    }

    #[test]
    fn test_validate_option_index() {
        assert!(validate_option_index(0).is_ok());
        assert!(validate_option_index(3).is_ok());
        assert!(validate_option_index(4).is_err());
    }
}
