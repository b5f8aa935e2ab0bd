use crate::models::quiz::DIFFICULTIES;
use validator::ValidationError;

pub fn validate_difficulty(value: &str) -> Result<(), ValidationError> {
    if DIFFICULTIES.contains(&value) {
        Ok(())
    } else {
        let mut err = ValidationError::new("difficulty");
        err.message = Some("Difficulty must be one of easy, medium, hard".into());
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_known_difficulties() {
        for d in ["easy", "medium", "hard"] {
            assert!(validate_difficulty(d).is_ok());
        }
    }

    #[test]
    fn rejects_unknown_difficulty() {
        assert!(validate_difficulty("insane").is_err());
    }
}
