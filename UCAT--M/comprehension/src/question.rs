use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::distortion::DistortionKind;

/// Answer to a statement question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    /// The passage confirms the statement.
    #[serde(rename = "true")]
    True,
    /// The passage contradicts the statement.
    #[serde(rename = "false")]
    False,
    /// The passage does not settle it.
    #[serde(rename = "cant_tell")]
    CantTell,
}

impl Verdict {
    /// Wire value (`true`, `false`, `cant_tell`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::True => "true",
            Self::False => "false",
            Self::CantTell => "cant_tell",
        }
    }

    /// Label shown on review screens.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::True => "True",
            Self::False => "False",
            Self::CantTell => "Can't Tell",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verdict {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['\'', ' ', '-'], "_").as_str() {
            "true" | "t" => Ok(Self::True),
            "false" | "f" => Ok(Self::False),
            "cant_tell" | "can_t_tell" | "ct" => Ok(Self::CantTell),
            other => Err(format!("unknown verdict `{other}`")),
        }
    }
}

/// One statement shown during a quiz.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// Statement shown to the candidate.
    pub displayed_sentence: String,
    /// Expected answer.
    pub correct_answer: Verdict,
    /// Passage sentence the statement came from.
    pub passage_snippet: String,
    /// Strategy that falsified the statement, for FALSE questions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distortion: Option<DistortionKind>,
}

impl Question {
    /// TRUE statement reworded from `source`.
    #[must_use]
    pub fn truthful(displayed: String, source: String) -> Self {
        Self {
            displayed_sentence: displayed,
            correct_answer: Verdict::True,
            passage_snippet: source,
            distortion: None,
        }
    }

    /// FALSE statement distorted from `source`.
    #[must_use]
    pub fn falsified(displayed: String, source: String, kind: DistortionKind) -> Self {
        Self {
            displayed_sentence: displayed,
            correct_answer: Verdict::False,
            passage_snippet: source,
            distortion: Some(kind),
        }
    }

    /// CAN'T TELL statement built around a topic from `source`.
    #[must_use]
    pub fn undecidable(displayed: String, source: String) -> Self {
        Self {
            displayed_sentence: displayed,
            correct_answer: Verdict::CantTell,
            passage_snippet: source,
            distortion: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verdict_wire_format() {
        assert_eq!(serde_json::to_string(&Verdict::CantTell).unwrap(), "\"cant_tell\"");
        assert_eq!(serde_json::from_str::<Verdict>("\"true\"").unwrap(), Verdict::True);
        assert_eq!(Verdict::CantTell.label(), "Can't Tell");
    }

    #[test]
    fn verdict_parses_loose_input() {
        assert_eq!("Can't Tell".parse::<Verdict>().unwrap(), Verdict::CantTell);
        assert_eq!(" FALSE ".parse::<Verdict>().unwrap(), Verdict::False);
        assert_eq!("t".parse::<Verdict>().unwrap(), Verdict::True);
        assert!("maybe".parse::<Verdict>().is_err());
    }

    #[test]
    fn question_serialization_skips_missing_distortion() {
        let question = Question::truthful("A.".into(), "A.".into());
        let json = serde_json::to_value(&question).unwrap();
        assert!(json.get("distortion").is_none());
        assert_eq!(json["correct_answer"], "true");
    }
}
