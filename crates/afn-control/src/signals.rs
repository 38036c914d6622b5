//! The signal vector and the pause decision derived from it.
//!
//! The decision is combinatorial: it depends only on the current five
//! signals, never on the order in which they were set.

use std::fmt;

/// One of the five independently owned pause signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    Schedule,
    Motion,
    Presence,
    Manual,
    ForcePlay,
}

impl Signal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::Schedule => "schedule",
            Signal::Motion => "motion",
            Signal::Presence => "presence",
            Signal::Manual => "manual",
            Signal::ForcePlay => "force_play",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of every pause signal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SignalVector {
    /// Quiet hours are in effect
    pub schedule: bool,
    /// Motion is active or inside its resume delay
    pub motion: bool,
    /// At least one watched target is online
    pub presence: bool,
    /// Operator paused playback
    pub manual: bool,
    /// Operator forced playback on
    pub force_play: bool,
}

impl SignalVector {
    /// Set one signal. Returns true if its value changed.
    pub fn set(&mut self, signal: Signal, value: bool) -> bool {
        let slot = match signal {
            Signal::Schedule => &mut self.schedule,
            Signal::Motion => &mut self.motion,
            Signal::Presence => &mut self.presence,
            Signal::Manual => &mut self.manual,
            Signal::ForcePlay => &mut self.force_play,
        };
        let changed = *slot != value;
        *slot = value;
        changed
    }

    /// Whether playback should be paused. See [`decide`].
    pub fn decide(&self) -> bool {
        decide(self)
    }

    /// Human readable reasons, in fixed order: quiet hours, motion,
    /// presence, forced play, manual. `online` is appended to the presence
    /// entry when non-empty. Yields `["none"]` when no signal is set.
    pub fn reasons(&self, online: &[String]) -> Vec<String> {
        let mut reasons = Vec::new();
        if self.schedule {
            reasons.push("quiet hours".to_string());
        }
        if self.motion {
            reasons.push("motion".to_string());
        }
        if self.presence {
            if online.is_empty() {
                reasons.push("presence".to_string());
            } else {
                reasons.push(format!("presence:{}", online.join(", ")));
            }
        }
        if self.force_play {
            reasons.push("forced play".to_string());
        }
        if self.manual {
            reasons.push("manual".to_string());
        }
        if reasons.is_empty() {
            reasons.push("none".to_string());
        }
        reasons
    }
}

/// Manual pause wins, then force-play, then any automatic signal.
pub fn decide(v: &SignalVector) -> bool {
    if v.manual {
        return true;
    }
    if v.force_play {
        return false;
    }
    v.schedule || v.motion || v.presence
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_vectors() -> impl Iterator<Item = SignalVector> {
        (0u8..32).map(|bits| SignalVector {
            schedule: bits & 1 != 0,
            motion: bits & 2 != 0,
            presence: bits & 4 != 0,
            manual: bits & 8 != 0,
            force_play: bits & 16 != 0,
        })
    }

    #[test]
    fn test_decision_over_every_vector() {
        let mut seen = 0;
        for v in all_vectors() {
            let expected = if v.manual {
                true
            } else if v.force_play {
                false
            } else {
                v.schedule || v.motion || v.presence
            };
            assert_eq!(decide(&v), expected, "vector {:?}", v);
            seen += 1;
        }
        assert_eq!(seen, 32);
    }

    #[test]
    fn test_reasons_never_empty_when_paused() {
        for v in all_vectors() {
            let reasons = v.reasons(&[]);
            assert!(!reasons.is_empty());
            if v.decide() {
                assert!(
                    !reasons.iter().any(|r| r == "none"),
                    "paused vector {:?} produced reasons {:?}",
                    v,
                    reasons
                );
            }
        }
    }

    #[test]
    fn test_none_only_for_empty_vector() {
        for v in all_vectors() {
            let is_none = v.reasons(&[]) == vec!["none".to_string()];
            assert_eq!(is_none, v == SignalVector::default());
        }
    }

    #[test]
    fn test_reason_order_is_fixed() {
        let v = SignalVector {
            schedule: true,
            motion: true,
            presence: true,
            manual: true,
            force_play: true,
        };
        let online = vec!["Alice".to_string(), "Bob".to_string()];
        assert_eq!(
            v.reasons(&online),
            vec!["quiet hours", "motion", "presence:Alice, Bob", "forced play", "manual"]
        );
    }

    #[test]
    fn test_presence_reason_without_names() {
        let v = SignalVector {
            presence: true,
            ..Default::default()
        };
        assert_eq!(v.reasons(&[]), vec!["presence"]);
    }

    #[test]
    fn test_set_reports_change() {
        let mut v = SignalVector::default();
        assert!(v.set(Signal::Motion, true));
        assert!(!v.set(Signal::Motion, true));
        assert!(v.motion);
        assert!(v.set(Signal::ForcePlay, true));
        assert!(v.force_play);
        assert!(v.set(Signal::Motion, false));
        assert!(v.set(Signal::ForcePlay, false));
        assert_eq!(v, SignalVector::default());
    }
}
