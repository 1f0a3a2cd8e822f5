use crate::ping::PingMeasurement;

pub const DEFAULT_MAX_PACKET_LOSS: f64 = 3.0;

/// Decides whether a ping result warrants tracing the path to its target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EscalationPolicy {
    pub max_packet_loss: f64,
}

impl Default for EscalationPolicy {
    fn default() -> Self {
        Self {
            max_packet_loss: DEFAULT_MAX_PACKET_LOSS,
        }
    }
}

impl EscalationPolicy {
    pub fn new(max_packet_loss: f64) -> Self {
        Self { max_packet_loss }
    }

    pub fn should_trace(&self, ping: &PingMeasurement) -> bool {
        ping.packet_loss_percent > self.max_packet_loss
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loss(percent: f64) -> PingMeasurement {
        PingMeasurement::new("8.8.8.8", percent)
    }

    #[test]
    fn at_threshold_does_not_escalate() {
        assert!(!EscalationPolicy::new(3.0).should_trace(&loss(3.0)));
    }

    #[test]
    fn above_threshold_escalates() {
        assert!(EscalationPolicy::new(3.0).should_trace(&loss(3.01)));
    }

    #[test]
    fn default_threshold_is_three_percent() {
        let policy = EscalationPolicy::default();
        assert!(!policy.should_trace(&loss(1.0)));
        assert!(policy.should_trace(&loss(5.0)));
    }
}
