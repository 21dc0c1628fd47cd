use serde::Serialize;

/// Displayed score of a votable target. Negative when downvotes dominate.
pub fn score(upvotes: i64, downvotes: i64) -> i64 {
    upvotes - downvotes
}

/// How a score is styled. Negative scores must be visually distinct from
/// zero and positive ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreTone {
    Positive,
    Negative,
    Neutral,
}

impl ScoreTone {
    pub fn of(score: i64) -> Self {
        match score {
            s if s > 0 => ScoreTone::Positive,
            s if s < 0 => ScoreTone::Negative,
            _ => ScoreTone::Neutral,
        }
    }

    pub fn css_class(self) -> &'static str {
        match self {
            ScoreTone::Positive => "score-positive",
            ScoreTone::Negative => "score-negative",
            ScoreTone::Neutral => "score-neutral",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(5, 3, 2)]
    #[case(0, 0, 0)]
    #[case(1, 4, -3)]
    fn score_is_upvotes_minus_downvotes(
        #[case] upvotes: i64,
        #[case] downvotes: i64,
        #[case] expected: i64,
    ) {
        assert_eq!(score(upvotes, downvotes), expected);
    }

    #[rstest]
    #[case(2, ScoreTone::Positive, "score-positive")]
    #[case(0, ScoreTone::Neutral, "score-neutral")]
    #[case(-3, ScoreTone::Negative, "score-negative")]
    fn tone_follows_sign(#[case] score: i64, #[case] tone: ScoreTone, #[case] class: &str) {
        assert_eq!(ScoreTone::of(score), tone);
        assert_eq!(tone.css_class(), class);
    }
}
