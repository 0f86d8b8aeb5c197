//! Classifies an HTTP response so [`crate::retry::RetryHandler`] can decide
//! whether to retry, back off on rate-limit, or stop permanently.

const RETRIABLE_STATUSES: [u16; 7] = [408, 425, 429, 500, 502, 503, 504];

/// The classification of one response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Ok,
    RateLimited,
    RetriableError,
    PermanentError,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ResponseValidator;

impl ResponseValidator {
    pub fn classify(&self, status: u16) -> Classification {
        if (200..300).contains(&status) {
            Classification::Ok
        } else if status == 429 {
            Classification::RateLimited
        } else if RETRIABLE_STATUSES.contains(&status) {
            Classification::RetriableError
        } else {
            Classification::PermanentError
        }
    }

    pub fn should_retry(&self, status: u16) -> bool {
        matches!(
            self.classify(status),
            Classification::RetriableError | Classification::RateLimited
        )
    }

    pub fn is_permanent(&self, status: u16) -> bool {
        self.classify(status) == Classification::PermanentError
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_2xx_as_ok() {
        let validator = ResponseValidator;
        assert_eq!(validator.classify(200), Classification::Ok);
        assert_eq!(validator.classify(204), Classification::Ok);
    }

    #[test]
    fn classifies_known_retriable_statuses() {
        let validator = ResponseValidator;
        for status in [408, 425, 429, 500, 502, 503, 504] {
            assert!(validator.should_retry(status), "{status} should be retriable");
        }
    }

    #[test]
    fn classifies_other_4xx_as_permanent() {
        let validator = ResponseValidator;
        assert_eq!(validator.classify(401), Classification::PermanentError);
        assert_eq!(validator.classify(404), Classification::PermanentError);
        assert!(validator.is_permanent(401));
    }

    #[test]
    fn classifies_429_as_rate_limited_not_permanent() {
        let validator = ResponseValidator;
        assert_eq!(validator.classify(429), Classification::RateLimited);
        assert!(!validator.is_permanent(429));
    }
}
