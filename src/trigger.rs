//! Decides whether an incoming message fires the callout protocol, and against whom.

use rand::Rng;
use serenity::all::UserId;

/// Source of uniform random values in `[0, 1)`.
///
/// Injected rather than ambient so tests can force either branch of the random trigger.
pub trait RandomSource: Send + Sync {
    fn next_uniform(&mut self) -> f64;
}

/// Production source backed by the thread-local generator.
pub struct ThreadRngSource;

impl RandomSource for ThreadRngSource {
    fn next_uniform(&mut self) -> f64 {
        rand::thread_rng().gen()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerKind {
    Manual,
    Random,
}

impl TriggerKind {
    /// Reason tag forwarded to the judgement model.
    pub fn reason(&self) -> &'static str {
        match self {
            TriggerKind::Manual => "MANUAL OVERRIDE",
            TriggerKind::Random => "RANDOM DETECTION",
        }
    }
}

/// Why the protocol fired and against whom.  Not persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trigger {
    pub kind: TriggerKind,
    pub target: UserId,
}

/// Decide whether an already-recorded message fires the callout protocol.
///
/// A command token naming exactly one user always wins, and in that case the random source is
/// never consulted.  Only when no command matched does a single uniform draw decide whether
/// the author gets called out.
pub fn decide(
    content: &str,
    command: &str,
    mentions: &[UserId],
    author: UserId,
    threshold: f64,
    rng: &mut dyn RandomSource,
) -> Option<Trigger> {
    let first_token = content.trim_start().split_ascii_whitespace().next();
    if first_token == Some(command) {
        if let [target] = mentions {
            return Some(Trigger {
                kind: TriggerKind::Manual,
                target: *target,
            });
        }
        // Command without exactly one mention falls through to the random draw.
    }

    if rng.next_uniform() < threshold {
        return Some(Trigger {
            kind: TriggerKind::Random,
            target: author,
        });
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Always returns the same value.
    struct Fixed(f64);

    impl RandomSource for Fixed {
        fn next_uniform(&mut self) -> f64 {
            self.0
        }
    }

    /// Panics if the draw happens at all.
    struct NeverDraw;

    impl RandomSource for NeverDraw {
        fn next_uniform(&mut self) -> f64 {
            panic!("random source consulted when a manual command matched");
        }
    }

    const THRESHOLD: f64 = 0.05;

    fn author() -> UserId {
        UserId::new(100)
    }

    fn mentioned() -> UserId {
        UserId::new(200)
    }

    #[test]
    fn manual_command_fires_without_consulting_randomness() {
        let trigger = decide(
            "!chud <@200>",
            "!chud",
            &[mentioned()],
            author(),
            THRESHOLD,
            &mut NeverDraw,
        )
        .unwrap();

        assert_eq!(trigger.kind, TriggerKind::Manual);
        assert_eq!(trigger.target, mentioned());
    }

    #[test]
    fn manual_command_requires_exactly_one_mention() {
        // Zero mentions: falls through to a draw that misses.
        let none = decide("!chud", "!chud", &[], author(), THRESHOLD, &mut Fixed(0.9));
        assert!(none.is_none());

        // Two mentions: same.
        let none = decide(
            "!chud <@200> <@300>",
            "!chud",
            &[mentioned(), UserId::new(300)],
            author(),
            THRESHOLD,
            &mut Fixed(0.9),
        );
        assert!(none.is_none());
    }

    #[test]
    fn command_must_be_the_first_token() {
        let none = decide(
            "so anyway !chud <@200>",
            "!chud",
            &[mentioned()],
            author(),
            THRESHOLD,
            &mut Fixed(0.9),
        );
        assert!(none.is_none());
    }

    #[test]
    fn command_with_no_mention_can_still_trigger_randomly() {
        let trigger = decide("!chud", "!chud", &[], author(), THRESHOLD, &mut Fixed(0.0)).unwrap();

        assert_eq!(trigger.kind, TriggerKind::Random);
        assert_eq!(trigger.target, author());
    }

    #[test]
    fn draw_below_threshold_targets_the_author() {
        let trigger = decide(
            "just chatting",
            "!chud",
            &[],
            author(),
            THRESHOLD,
            &mut Fixed(0.0),
        )
        .unwrap();

        assert_eq!(trigger.kind, TriggerKind::Random);
        assert_eq!(trigger.target, author());
    }

    #[test]
    fn draw_at_or_above_threshold_never_triggers() {
        for sample in [THRESHOLD, 0.5, 0.999] {
            let none = decide(
                "just chatting",
                "!chud",
                &[],
                author(),
                THRESHOLD,
                &mut Fixed(sample),
            );
            assert!(none.is_none(), "sample {} should not trigger", sample);
        }
    }
}
