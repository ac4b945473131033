//! Pure scoring of recorded answers against an assessment's answer key.

use crate::model::{AssessmentDefinition, AssessmentResult, QuestionOutcome};

/// Scores `answers` against `definition`.
///
/// `answers[i]` is the option chosen for question `i`. Missing entries and `None`
/// count as incorrect; entries past the last question are ignored.
#[must_use]
pub fn score(definition: &AssessmentDefinition, answers: &[Option<usize>]) -> AssessmentResult {
    let breakdown = definition
        .questions()
        .iter()
        .enumerate()
        .map(|(i, question)| {
            let chosen = answers.get(i).copied().flatten();
            QuestionOutcome {
                chosen,
                correct_option: question.correct_option(),
                is_correct: chosen == Some(question.correct_option()),
                explanation: question.explanation().to_owned(),
            }
        })
        .collect();

    AssessmentResult::from_breakdown(definition.id().clone(), breakdown)
}

/// `round(100 * correct / total)` with halves rounded up, computed exactly in integers.
///
/// Returns 0 when `total` is 0 and clamps at 100.
#[must_use]
pub fn percentage(correct: u32, total: u32) -> u8 {
    ratio_percent(u64::from(correct), u64::from(total))
}

/// Same rounding rule as [`percentage`], for sums of already-rounded percentages.
#[must_use]
pub fn average_percent(sum: u64, count: u64) -> u8 {
    if count == 0 {
        return 0;
    }
    let avg = (2 * sum + count) / (2 * count);
    u8::try_from(avg.min(100)).unwrap_or(100)
}

fn ratio_percent(numerator: u64, denominator: u64) -> u8 {
    if denominator == 0 {
        return 0;
    }
    let rounded = (200 * numerator + denominator) / (2 * denominator);
    u8::try_from(rounded.min(100)).unwrap_or(100)
}
