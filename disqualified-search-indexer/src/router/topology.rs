//! Retry topic topology and backoff.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// How the retry delay grows with the stage index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffStrategy {
    /// Every stage waits `base`.
    Fixed,
    /// Stage `n` waits `base * n`.
    Linear,
    /// Stage `n` waits `base * multiplier^(n - 1)`.
    Exponential,
}

impl FromStr for BackoffStrategy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "fixed" => Ok(Self::Fixed),
            "linear" => Ok(Self::Linear),
            "exponential" => Ok(Self::Exponential),
            other => Err(format!(
                "unknown backoff strategy '{}' (expected fixed, linear or exponential)",
                other
            )),
        }
    }
}

impl fmt::Display for BackoffStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed => write!(f, "fixed"),
            Self::Linear => write!(f, "linear"),
            Self::Exponential => write!(f, "exponential"),
        }
    }
}

/// Delay applied before a record on a retry stage is processed again.
#[derive(Debug, Clone, PartialEq)]
pub struct Backoff {
    pub strategy: BackoffStrategy,
    pub base: Duration,
    /// Growth factor for the exponential strategy. Values below 1 are treated as 1.
    pub multiplier: f64,
    /// Upper bound for every delay.
    pub max: Duration,
}

impl Backoff {
    /// Delay for retry stage `stage` (1-based).
    ///
    /// Non-decreasing in `stage` for every strategy.
    pub fn delay_for(&self, stage: u32) -> Duration {
        let stage = stage.max(1);
        let delay = match self.strategy {
            BackoffStrategy::Fixed => self.base,
            BackoffStrategy::Linear => self.base.saturating_mul(stage),
            BackoffStrategy::Exponential => {
                let exponent = i32::try_from(stage - 1).unwrap_or(i32::MAX);
                let factor = self.multiplier.max(1.0).powi(exponent);
                Duration::try_from_secs_f64(self.base.as_secs_f64() * factor).unwrap_or(self.max)
            }
        };
        delay.min(self.max)
    }
}

/// Names and sizes the chain of retry stages for a stream topic.
///
/// Stages `1..=max_attempts` live on `<base>-retry`, or on
/// `<base>-retry-<stage>` when per-stage topics are enabled. Records that are
/// not retryable go to `<base>-invalid`; records that exhaust every stage go to
/// `<base>-error`.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryTopology {
    base_topic: String,
    max_attempts: u32,
    backoff: Backoff,
    per_stage_topics: bool,
}

impl RetryTopology {
    pub fn new(base_topic: impl Into<String>, max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            base_topic: base_topic.into(),
            max_attempts,
            backoff,
            per_stage_topics: false,
        }
    }

    /// Use one topic per retry stage.
    pub fn with_per_stage_topics(mut self, per_stage_topics: bool) -> Self {
        self.per_stage_topics = per_stage_topics;
        self
    }

    pub fn base_topic(&self) -> &str {
        &self.base_topic
    }

    /// Number of retry stages.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }

    /// Topic holding retry stage `stage`.
    pub fn retry_topic(&self, stage: u32) -> String {
        if self.per_stage_topics {
            format!("{}-retry-{}", self.base_topic, stage)
        } else {
            format!("{}-retry", self.base_topic)
        }
    }

    /// Every distinct retry topic.
    pub fn retry_topics(&self) -> Vec<String> {
        match (self.max_attempts, self.per_stage_topics) {
            (0, _) => Vec::new(),
            (_, false) => vec![self.retry_topic(1)],
            (n, true) => (1..=n).map(|stage| self.retry_topic(stage)).collect(),
        }
    }

    pub fn invalid_topic(&self) -> String {
        format!("{}-invalid", self.base_topic)
    }

    pub fn error_topic(&self) -> String {
        format!("{}-error", self.base_topic)
    }

    /// Topics the consumer reads: the stream topic followed by the retry topics.
    pub fn subscription_topics(&self) -> Vec<String> {
        let mut topics = vec![self.base_topic.clone()];
        topics.extend(self.retry_topics());
        topics
    }
}
