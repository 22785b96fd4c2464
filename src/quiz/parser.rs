use std::fmt;

use rand::seq::SliceRandom;
use rand::Rng;

use super::QuizQuestion;

const BLOCK_SEPARATOR: &str = "\n\n";
const LINES_PER_BLOCK: usize = 5;

/// Why a block of model output was left out of the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    WrongLineCount(usize),
    EmptyLine,
    CorrectAnswerMissing,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::WrongLineCount(n) => {
                write!(f, "expected {} lines, got {}", LINES_PER_BLOCK, n)
            }
            SkipReason::EmptyLine => write!(f, "block contains an empty line"),
            SkipReason::CorrectAnswerMissing => {
                write!(f, "correct answer not found after shuffle")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockOutcome {
    Parsed(QuizQuestion),
    Skipped(SkipReason),
}

/// Parses one question block: question, correct answer, then three wrong answers.
pub fn parse_block<R: Rng + ?Sized>(block: &str, rng: &mut R) -> BlockOutcome {
    let lines: Vec<&str> = block.trim().split('\n').map(str::trim).collect();

    if lines.len() != LINES_PER_BLOCK {
        return BlockOutcome::Skipped(SkipReason::WrongLineCount(lines.len()));
    }
    if lines.iter().any(|line| line.is_empty()) {
        return BlockOutcome::Skipped(SkipReason::EmptyLine);
    }

    let question = lines[0].to_owned();
    let correct = lines[1];
    let mut options: Vec<String> = lines[1..].iter().map(|line| (*line).to_owned()).collect();
    options.shuffle(rng);

    // `position` returns the first match, so a correct answer repeated among
    // the wrong ones always resolves to its earliest slot.
    match options.iter().position(|option| option == correct) {
        Some(correct_option_id) => BlockOutcome::Parsed(QuizQuestion {
            question,
            options,
            correct_option_id,
        }),
        None => BlockOutcome::Skipped(SkipReason::CorrectAnswerMissing),
    }
}

/// Splits a model reply into blocks and keeps the ones that parse, in source order.
pub fn parse_quiz_blocks_with<R: Rng + ?Sized>(raw_text: &str, rng: &mut R) -> Vec<QuizQuestion> {
    let normalized = raw_text.replace("\r\n", "\n");

    normalized
        .trim()
        .split(BLOCK_SEPARATOR)
        .enumerate()
        .filter_map(|(idx, block)| match parse_block(block, rng) {
            BlockOutcome::Parsed(question) => Some(question),
            BlockOutcome::Skipped(reason) => {
                tracing::debug!(block = idx, %reason, "skipping quiz block");
                None
            }
        })
        .collect()
}

pub fn parse_quiz_blocks(raw_text: &str) -> Vec<QuizQuestion> {
    parse_quiz_blocks_with(raw_text, &mut rand::thread_rng())
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    fn sorted(options: &[String]) -> Vec<String> {
        let mut options = options.to_vec();
        options.sort();
        options
    }

    #[test]
    fn parses_two_blocks_in_order() {
        let questions = parse_quiz_blocks("Q1\nA\nB\nC\nD\n\nQ2\nE\nF\nG\nH");

        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].question, "Q1");
        assert_eq!(questions[1].question, "Q2");
        assert_eq!(questions[0].options.len(), 4);
        assert_eq!(questions[1].options.len(), 4);
        assert_eq!(questions[0].correct_option(), "A");
        assert_eq!(questions[1].correct_option(), "E");
    }

    #[test]
    fn answer_set_is_preserved() {
        let questions = parse_quiz_blocks("Capital of France?\nParis\nRome\nBerlin\nMadrid");

        assert_eq!(questions.len(), 1);
        assert_eq!(
            sorted(&questions[0].options),
            vec!["Berlin", "Madrid", "Paris", "Rome"]
        );
    }

    #[test]
    fn short_block_alone_yields_nothing() {
        assert!(parse_quiz_blocks("Q1\nA\nB").is_empty());
        assert!(parse_quiz_blocks("").is_empty());
        assert!(parse_quiz_blocks("   \n\n  ").is_empty());
    }

    #[test]
    fn malformed_blocks_do_not_disturb_neighbours() {
        let text = "Q1\nA\nB\nC\nD\n\nbroken\nonly two\n\nQ3\nI\nJ\nK\nL\nextra\n\nQ4\nM\nN\nO\nP";
        let questions = parse_quiz_blocks(text);

        let titles: Vec<&str> = questions.iter().map(|q| q.question.as_str()).collect();
        assert_eq!(titles, vec!["Q1", "Q4"]);
        assert_eq!(questions[1].correct_option(), "M");
    }

    #[test]
    fn correct_index_survives_every_shuffle() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut seen = std::collections::HashSet::new();

        for _ in 0..500 {
            match parse_block("Q\nright\nwrong 1\nwrong 2\nwrong 3", &mut rng) {
                BlockOutcome::Parsed(question) => {
                    assert_eq!(question.correct_option(), "right");
                    seen.insert(question.correct_option_id);
                }
                other => panic!("unexpected outcome {:?}", other),
            }
        }

        // the index itself should move around
        assert!(seen.len() > 1);
    }

    #[test]
    fn duplicated_correct_answer_resolves_to_first_position() {
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..200 {
            let BlockOutcome::Parsed(question) = parse_block("Q\nA\nA\nB\nC", &mut rng) else {
                panic!("block should parse");
            };
            let first = question.options.iter().position(|o| o == "A").unwrap();
            assert_eq!(question.correct_option_id, first);
        }
    }

    #[test]
    fn reports_skip_reasons() {
        let mut rng = StdRng::seed_from_u64(1);

        assert_eq!(
            parse_block("Q1\nA\nB", &mut rng),
            BlockOutcome::Skipped(SkipReason::WrongLineCount(3))
        );
        assert_eq!(
            parse_block("Q1\nA\n \nC\nD", &mut rng),
            BlockOutcome::Skipped(SkipReason::EmptyLine)
        );
    }

    #[test]
    fn handles_windows_line_endings_and_padding() {
        let text = "\r\n  Q1\r\nA\r\nB\r\nC\r\nD\r\n\r\nQ2\r\nE\r\nF\r\nG\r\nH\r\n\r\n";
        let questions = parse_quiz_blocks(text);

        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].question, "Q1");
        assert!(questions[1].options.iter().all(|o| !o.ends_with('\r')));
    }
}
