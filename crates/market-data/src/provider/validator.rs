//! Price point validation.
//!
//! Checks normalised upstream data before it can reach any cache tier:
//! - Positive price
//! - OHLC invariants (high >= low, open/close between low and high)
//! - Sanity ceiling on values
//! - Timestamps not in the future beyond a small clock skew

use chrono::{DateTime, Duration, Utc};
use log::warn;
use rust_decimal::Decimal;

use crate::errors::MarketDataError;
use crate::models::PricePoint;

/// Validation severity levels.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ValidationSeverity {
    /// Reject the point; the response counts as malformed.
    Hard,
    /// Accept the point but log a warning.
    Soft,
}

#[derive(Clone, Debug)]
struct ValidationIssue {
    severity: ValidationSeverity,
    message: String,
}

/// Validator configuration.
#[derive(Clone, Debug)]
pub struct ValidatorConfig {
    /// Maximum allowed price value.
    pub max_price: Decimal,
    /// How far in the future a timestamp may be before it is rejected.
    pub max_clock_skew: Duration,
    /// Whether to warn on zero volume.
    pub warn_on_zero_volume: bool,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            max_price: Decimal::from(1_000_000_000i64),
            max_clock_skew: Duration::seconds(60),
            warn_on_zero_volume: true,
        }
    }
}

/// Validates normalised price points coming from a provider.
#[derive(Clone, Debug, Default)]
pub struct PricePointValidator {
    config: ValidatorConfig,
}

impl PricePointValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ValidatorConfig) -> Self {
        Self { config }
    }

    /// Validate a point observed by `provider` at `now`.
    ///
    /// Returns the point with its timestamp clamped to `now` when it lies
    /// within the allowed skew, or `Malformed` on any hard failure.
    pub fn validate(
        &self,
        provider: &str,
        mut point: PricePoint,
        now: DateTime<Utc>,
    ) -> Result<PricePoint, MarketDataError> {
        let mut issues = Vec::new();

        self.check_price(&point, &mut issues);
        self.check_ohlc(&point, &mut issues);
        self.check_timestamp(&point, now, &mut issues);
        self.check_volume(&point, &mut issues);

        let hard: Vec<&str> = issues
            .iter()
            .filter(|i| i.severity == ValidationSeverity::Hard)
            .map(|i| i.message.as_str())
            .collect();

        if !hard.is_empty() {
            return Err(MarketDataError::Malformed {
                provider: provider.to_string(),
                message: format!("{}: {}", point.ticker, hard.join("; ")),
            });
        }

        for issue in issues.iter().filter(|i| i.severity == ValidationSeverity::Soft) {
            warn!("Price validation warning for {}: {}", point.ticker, issue.message);
        }

        if point.timestamp > now {
            point.timestamp = now;
        }

        Ok(point)
    }

    fn check_price(&self, point: &PricePoint, issues: &mut Vec<ValidationIssue>) {
        let amount = point.price.amount;
        if amount <= Decimal::ZERO {
            issues.push(ValidationIssue {
                severity: ValidationSeverity::Hard,
                message: format!("Non-positive price: {}", amount),
            });
        } else if amount > self.config.max_price {
            issues.push(ValidationIssue {
                severity: ValidationSeverity::Hard,
                message: format!("Price {} exceeds sanity limit {}", amount, self.config.max_price),
            });
        }
    }

    fn check_ohlc(&self, point: &PricePoint, issues: &mut Vec<ValidationIssue>) {
        let (Some(high), Some(low)) = (point.high, point.low) else {
            return;
        };

        if high < low {
            issues.push(ValidationIssue {
                severity: ValidationSeverity::Hard,
                message: format!("High ({}) is below low ({})", high, low),
            });
            return;
        }

        for (name, value) in [("open", point.open), ("close", point.close)] {
            if let Some(v) = value {
                if v < low || v > high {
                    issues.push(ValidationIssue {
                        severity: ValidationSeverity::Soft,
                        message: format!("{} ({}) outside low/high range [{}, {}]", name, v, low, high),
                    });
                }
            }
        }
    }

    fn check_timestamp(
        &self,
        point: &PricePoint,
        now: DateTime<Utc>,
        issues: &mut Vec<ValidationIssue>,
    ) {
        if point.timestamp > now + self.config.max_clock_skew {
            issues.push(ValidationIssue {
                severity: ValidationSeverity::Hard,
                message: format!("Timestamp {} is in the future", point.timestamp),
            });
        }
    }

    fn check_volume(&self, point: &PricePoint, issues: &mut Vec<ValidationIssue>) {
        match point.volume {
            Some(v) if v < Decimal::ZERO => issues.push(ValidationIssue {
                severity: ValidationSeverity::Hard,
                message: format!("Negative volume: {}", v),
            }),
            Some(v) if v.is_zero() && self.config.warn_on_zero_volume => {
                issues.push(ValidationIssue {
                    severity: ValidationSeverity::Soft,
                    message: "Zero volume".to_string(),
                })
            }
            _ => {}
        }
    }
}
