//! Flag question generation from a country list.
//!
//! The bank is a flat list of `(name, code)` pairs read from CSV. Each
//! generated question shows one country's flag (`/static/svg/<code>.svg`)
//! and expects the country's name.

use std::path::Path;

use flagquiz_protocol::Question;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::FlagQuizError;

/// The country list shipped with the server.
const BUILTIN_COUNTRIES: &str = include_str!("../data/countries.csv");

/// Number of options in a multiple-choice question.
const OPTIONS_PER_QUESTION: usize = 4;

/// How players answer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GameType {
    /// Pick the country from four options.
    #[default]
    #[serde(alias = "MCQ")]
    MultipleChoice,
    /// Type the country name. Questions carry no options.
    TypeIn,
}

/// One CSV row, read by position: `name,code`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
struct Country {
    name: String,
    code: String,
}

/// The set of countries questions are drawn from.
#[derive(Debug, Clone)]
pub struct QuestionBank {
    countries: Vec<Country>,
}

impl QuestionBank {
    /// The bundled country list.
    pub fn builtin() -> Result<Self, FlagQuizError> {
        Self::from_csv(BUILTIN_COUNTRIES)
    }

    /// Reads a `name,code` CSV file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, FlagQuizError> {
        let text = tokio::fs::read_to_string(path.as_ref()).await?;
        Self::from_csv(&text)
    }

    /// Parses `name,code` rows. Blank lines and a leading `name,code`
    /// header are skipped. Names containing commas or quotes follow the
    /// usual CSV quoting (`"Korea, South"`, `""` for a literal quote).
    pub fn from_csv(text: &str) -> Result<Self, FlagQuizError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());

        let mut countries = Vec::new();
        for (row, record) in reader.deserialize::<Country>().enumerate() {
            let mut country = record.map_err(|e| FlagQuizError::QuestionBank(e.to_string()))?;
            if row == 0
                && country.name.eq_ignore_ascii_case("name")
                && country.code.eq_ignore_ascii_case("code")
            {
                continue;
            }
            if country.name.is_empty() || country.code.is_empty() {
                return Err(FlagQuizError::QuestionBank(format!(
                    "row {}: empty name or code",
                    row + 1
                )));
            }
            country.code = country.code.to_lowercase();
            countries.push(country);
        }

        if countries.is_empty() {
            return Err(FlagQuizError::QuestionBank("no countries".into()));
        }
        Ok(Self { countries })
    }

    pub fn len(&self) -> usize {
        self.countries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.countries.is_empty()
    }

    /// Draws `count` distinct countries in random order and builds one
    /// question per country.
    ///
    /// Multiple-choice options are the answer plus the next three drawn
    /// countries (wrapping around), shuffled.
    pub fn generate(&self, count: usize, game_type: GameType) -> Result<Vec<Question>, FlagQuizError> {
        if count > self.countries.len() {
            return Err(FlagQuizError::QuestionBank(format!(
                "asked for {count} questions but only {} countries are loaded",
                self.countries.len()
            )));
        }

        let mut rng = rand::rng();
        let mut picked: Vec<&Country> = self.countries.iter().collect();
        picked.shuffle(&mut rng);
        picked.truncate(count);

        let questions = picked
            .iter()
            .enumerate()
            .map(|(i, country)| {
                let options = match game_type {
                    GameType::TypeIn => Vec::new(),
                    GameType::MultipleChoice => {
                        let width = OPTIONS_PER_QUESTION.min(picked.len());
                        let mut options: Vec<String> = (0..width)
                            .map(|offset| picked[(i + offset) % picked.len()].name.clone())
                            .collect();
                        options.shuffle(&mut rng);
                        options
                    }
                };
                Question {
                    prompt: format!("/static/svg/{}.svg", country.code),
                    options,
                    answer: country.name.clone(),
                }
            })
            .collect();
        Ok(questions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_bank_loads() {
        let bank = QuestionBank::builtin().unwrap();
        assert!(bank.len() >= 25);
    }

    #[test]
    fn test_from_csv_skips_header_and_blanks() {
        let bank = QuestionBank::from_csv("name,code\n\nFrance,FR\n\"Korea, South\",kr\n").unwrap();
        assert_eq!(bank.len(), 2);
        let questions = bank.generate(2, GameType::TypeIn).unwrap();
        let answers: Vec<_> = questions.iter().map(|q| q.answer.as_str()).collect();
        assert!(answers.contains(&"France"));
        assert!(answers.contains(&"Korea, South"));
        assert!(questions.iter().any(|q| q.prompt == "/static/svg/fr.svg"));
    }

    #[test]
    fn test_from_csv_rejects_bad_rows() {
        assert!(QuestionBank::from_csv("France\n").is_err());
        assert!(QuestionBank::from_csv("name,code\n").is_err());
        assert!(QuestionBank::from_csv("France,\n").is_err());
    }

    #[test]
    fn test_from_csv_handles_quoting() {
        let bank = QuestionBank::from_csv("\"Cote d\"\"Ivoire\",\"CI\"\n").unwrap();
        let question = &bank.generate(1, GameType::TypeIn).unwrap()[0];
        assert_eq!(question.answer, "Cote d\"Ivoire");
        assert_eq!(question.prompt, "/static/svg/ci.svg");
    }

    #[test]
    fn test_multiple_choice_options() {
        let bank = QuestionBank::builtin().unwrap();
        let questions = bank.generate(12, GameType::MultipleChoice).unwrap();
        assert_eq!(questions.len(), 12);
        for q in &questions {
            assert_eq!(q.options.len(), 4);
            assert!(q.options.contains(&q.answer));
            assert!(q.prompt.starts_with("/static/svg/"));
        }
        let mut answers: Vec<_> = questions.iter().map(|q| q.answer.clone()).collect();
        answers.sort();
        answers.dedup();
        assert_eq!(answers.len(), 12);
    }

    #[test]
    fn test_type_in_has_no_options() {
        let bank = QuestionBank::builtin().unwrap();
        let questions = bank.generate(10, GameType::TypeIn).unwrap();
        assert!(questions.iter().all(|q| q.options.is_empty()));
    }

    #[test]
    fn test_too_many_questions() {
        let bank = QuestionBank::from_csv("France,fr\nChad,td\n").unwrap();
        assert!(matches!(
            bank.generate(3, GameType::MultipleChoice),
            Err(FlagQuizError::QuestionBank(_))
        ));
    }

    #[test]
    fn test_game_type_names() {
        let t: GameType = serde_json::from_str(r#""type-in""#).unwrap();
        assert_eq!(t, GameType::TypeIn);
        let t: GameType = serde_json::from_str(r#""MCQ""#).unwrap();
        assert_eq!(t, GameType::MultipleChoice);
    }
}
