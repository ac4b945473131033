use coach_core::model::{AssessmentId, AssessmentResult, UserId};
use coach_core::{Advance, SessionStatus, TickOutcome};
use services::{AppServices, AttemptController};
use tokio::io::{AsyncBufReadExt, BufReader};

/// Remaining-time marks announced while the countdown runs.
const ANNOUNCE_AT: [u32; 4] = [60, 30, 10, 5];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Input {
    /// Zero-based option index.
    Select(usize),
    Next,
    Back,
    Pause,
    Resume,
    Reset,
    Status,
    Quit,
    Help,
}

fn parse_input(line: &str) -> Option<Input> {
    let line = line.trim();
    if let Ok(n) = line.parse::<usize>() {
        return n.checked_sub(1).map(Input::Select);
    }
    match line.to_ascii_lowercase().as_str() {
        "n" | "next" => Some(Input::Next),
        "b" | "back" => Some(Input::Back),
        "p" | "pause" => Some(Input::Pause),
        "r" | "resume" => Some(Input::Resume),
        "x" | "reset" => Some(Input::Reset),
        "s" | "status" => Some(Input::Status),
        "q" | "quit" => Some(Input::Quit),
        "h" | "help" | "?" => Some(Input::Help),
        _ => None,
    }
}

fn format_clock(secs: u32) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}

fn print_help() {
    println!("  1-9 select an option   n next   b back");
    println!("  p pause   r resume   x reset   s status   q quit");
}

fn print_question(attempt: &AttemptController) {
    let session = attempt.session();
    let Some(question) = session.current_question() else {
        return;
    };
    let total = session.definition().question_count();
    println!();
    println!(
        "Question {}/{}  [{} left]",
        session.current_index() + 1,
        total,
        format_clock(session.remaining_secs())
    );
    println!("{}", question.prompt());
    for (i, option) in question.options().iter().enumerate() {
        let marker = if session.pending_selection() == Some(i) {
            '>'
        } else {
            ' '
        };
        println!(" {marker} {}. {option}", i + 1);
    }
}

fn print_result(attempt: &AttemptController, result: &AssessmentResult) {
    let definition = attempt.session().definition();
    println!();
    println!(
        "{}: {}/{} correct ({}%)",
        definition.title(),
        result.correct_count(),
        result.total_questions(),
        result.percentage()
    );
    for (i, (question, outcome)) in definition
        .questions()
        .iter()
        .zip(result.breakdown())
        .enumerate()
    {
        let verdict = match outcome.chosen {
            None => "unanswered",
            Some(_) if outcome.is_correct => "correct",
            Some(_) => "incorrect",
        };
        println!();
        println!("{}. {} ({verdict})", i + 1, question.prompt());
        if let Some(chosen) = outcome.chosen {
            if let Some(text) = question.options().get(chosen) {
                println!("   your answer: {text}");
            }
        }
        if let Some(text) = question.options().get(outcome.correct_option) {
            println!("   best answer: {text}");
        }
        println!("   {}", outcome.explanation);
    }
}

/// Apply one line of input. Returns `true` once the attempt is over.
fn apply(attempt: &mut AttemptController, input: Input) -> bool {
    match input {
        Input::Select(option) => match attempt.select_answer(option) {
            Ok(()) => println!("Selected {}. Press n to continue.", option + 1),
            Err(e) => println!("{e}"),
        },
        Input::Next => match attempt.advance() {
            Ok(Advance::Moved(_)) => print_question(attempt),
            Ok(Advance::Completed) => return true,
            Err(e) => println!("{e}"),
        },
        Input::Back => match attempt.retreat() {
            Ok(_) => print_question(attempt),
            Err(e) => println!("{e}"),
        },
        Input::Pause => match attempt.pause() {
            Ok(()) => println!(
                "Paused with {} left. Press r to resume.",
                format_clock(attempt.session().remaining_secs())
            ),
            Err(e) => println!("{e}"),
        },
        Input::Resume => match attempt.resume() {
            Ok(()) => print_question(attempt),
            Err(e) => println!("{e}"),
        },
        Input::Reset => {
            attempt.reset();
            match attempt.start() {
                Ok(()) => {
                    println!("Restarted.");
                    print_question(attempt);
                }
                Err(e) => println!("{e}"),
            }
        }
        Input::Status => {
            let session = attempt.session();
            println!(
                "{:?}: question {}/{}, {} answered, {} left",
                session.status(),
                session.current_index() + 1,
                session.definition().question_count(),
                session.answered_count(),
                format_clock(session.remaining_secs())
            );
        }
        Input::Help => print_help(),
        Input::Quit => return true,
    }
    false
}

/// Run one attempt interactively on stdin/stdout.
pub async fn run(
    services: &AppServices,
    id: &AssessmentId,
    user: UserId,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut attempt = services.assessments().begin(id, user)?;
    {
        let definition = attempt.session().definition();
        println!("{} ({})", definition.title(), definition.category());
        println!("{}", definition.description());
        println!(
            "{} questions, {} on the clock.",
            definition.question_count(),
            format_clock(definition.duration_secs())
        );
    }
    print_help();
    attempt.start()?;
    print_question(&attempt);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                match parse_input(&line) {
                    Some(input) => {
                        if apply(&mut attempt, input) {
                            break;
                        }
                    }
                    None if line.trim().is_empty() => {}
                    None => println!("Unrecognized input {:?}; h for help.", line.trim()),
                }
            }
            Some(tick) = attempt.next_tick() => {
                match attempt.handle_tick(tick) {
                    TickOutcome::Expired => {
                        println!();
                        println!("Time is up.");
                        break;
                    }
                    TickOutcome::Counted(remaining) if ANNOUNCE_AT.contains(&remaining) => {
                        println!("[{} left]", format_clock(remaining));
                    }
                    TickOutcome::Counted(_) | TickOutcome::Stale => {}
                }
            }
        }
    }

    if attempt.session().status() != SessionStatus::Completed {
        println!("Attempt abandoned; nothing was recorded.");
        return Ok(());
    }
    if let Some(result) = attempt.session().result() {
        print_result(&attempt, result);
    }
    match attempt.wait_for_recording().await {
        Some(Ok(row)) => tracing::debug!(row, "result recorded"),
        Some(Err(e)) => eprintln!("Result could not be saved: {e}"),
        None => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_are_one_based() {
        assert_eq!(parse_input("1"), Some(Input::Select(0)));
        assert_eq!(parse_input(" 3 "), Some(Input::Select(2)));
        assert_eq!(parse_input("0"), None);
    }

    #[test]
    fn commands_accept_short_and_long_forms() {
        assert_eq!(parse_input("n"), Some(Input::Next));
        assert_eq!(parse_input("Back"), Some(Input::Back));
        assert_eq!(parse_input("x"), Some(Input::Reset));
        assert_eq!(parse_input("?"), Some(Input::Help));
        assert_eq!(parse_input("skip"), None);
    }

    #[test]
    fn clock_is_minutes_and_seconds() {
        assert_eq!(format_clock(300), "5:00");
        assert_eq!(format_clock(65), "1:05");
        assert_eq!(format_clock(0), "0:00");
    }
}
