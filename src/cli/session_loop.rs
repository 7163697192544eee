// src/cli/session_loop.rs — The interactive evaluate/apply loop shared
// by the review and generate commands.

use crate::agent::session::{Evaluation, IterationRecord, StartedSession};
use crate::agent::SessionController;

pub struct LoopOptions {
    pub auto: bool,
    pub dry_run: bool,
}

enum Action {
    Apply,
    Skip,
    Feedback,
    Quit,
}

/// Drive one session until convergence, quit, or an unrecoverable error.
/// Always stops the session at the end and prints the final summary.
pub async fn run(
    controller: &SessionController,
    started: &StartedSession,
    options: &LoopOptions,
) -> anyhow::Result<()> {
    let mut feedback: Option<String> = None;

    loop {
        let eval = match controller
            .evaluate(&started.session_id, feedback.as_deref())
            .await
        {
            Ok(eval) => eval,
            Err(e) => {
                eprintln!("  evaluation failed: {e}");
                break;
            }
        };
        feedback = None;

        print_evaluation(&eval);

        if eval.converged {
            if let Some(reason) = eval.converge_reason {
                println!();
                println!("  Converged: {}", describe_reason(reason.as_str()));
            }
            break;
        }

        if options.dry_run {
            println!();
            println!("  [dry-run] Evaluation only, no changes applied.");
            break;
        }

        if !eval.has_suggested_code {
            println!("  No code changes suggested, continuing.");
            continue;
        }

        let action = if options.auto {
            Action::Apply
        } else {
            match prompt_action()? {
                Some(action) => action,
                None => Action::Quit,
            }
        };

        match action {
            Action::Apply => match controller.apply(&started.session_id).await {
                Ok(_) => println!("  Applied: suggestion validated and written."),
                Err(e) => println!("  Validation failed, keeping previous code: {e}"),
            },
            Action::Skip => {
                println!("  Skipping changes, continuing with current code.");
            }
            Action::Feedback => {
                let text = prompt_feedback()?;
                if text.trim().is_empty() {
                    println!("  Empty feedback ignored.");
                } else {
                    println!("  Feedback recorded for the next evaluation.");
                    feedback = Some(text);
                }
            }
            Action::Quit => {
                println!("  Stopping at user request.");
                break;
            }
        }
    }

    let history = controller.stop(&started.session_id).await?;
    print_summary(&history, &started.source_path.display().to_string());
    Ok(())
}

fn prompt_action() -> anyhow::Result<Option<Action>> {
    let options = vec![
        "apply — write the suggestion and keep iterating",
        "skip — keep the current code and re-evaluate",
        "feedback — add guidance for the next evaluation",
        "quit — stop the session",
    ];

    let choice = match inquire::Select::new("Next action:", options).prompt() {
        Ok(choice) => choice,
        Err(_) => return Ok(None), // Esc / EOF behaves like quit
    };

    Ok(Some(match choice.split_whitespace().next() {
        Some("apply") => Action::Apply,
        Some("skip") => Action::Skip,
        Some("feedback") => Action::Feedback,
        _ => Action::Quit,
    }))
}

fn prompt_feedback() -> anyhow::Result<String> {
    let text = inquire::Text::new("Feedback:")
        .with_help_message("Sent to the model with the next evaluation")
        .prompt()
        .unwrap_or_default();
    Ok(text)
}

fn print_evaluation(eval: &Evaluation) {
    let record = &eval.record;

    println!();
    println!("  ── Iteration {} ──", record.iteration);
    println!("  Score: {}/10", record.score);
    if !record.summary.is_empty() {
        println!("  Summary: {}", record.summary);
    }

    let c = &record.criteria;
    println!(
        "  Criteria: recognizability={} proportions={} visual={} structural={} code={}",
        c.recognizability, c.proportions, c.visual_quality, c.structural, c.code_quality
    );

    if !record.issues.is_empty() {
        println!("  Issues:");
        for issue in &record.issues {
            println!("    - {issue}");
        }
    }
    if record.had_suggestion {
        println!("  A suggested rewrite is available.");
    }
}

fn print_summary(history: &[IterationRecord], source: &str) {
    println!();
    println!("  ── Summary ──");
    println!("  File: {source}");
    println!("  Iterations: {}", history.len());
    if let Some(last) = history.last() {
        println!("  Score progression: {}", format_progression(history));
        println!("  Final score: {}/10", last.score);
        if !last.summary.is_empty() {
            println!("  Final assessment: {}", last.summary);
        }
    } else {
        println!("  No evaluation completed.");
    }
}

fn format_progression(history: &[IterationRecord]) -> String {
    history
        .iter()
        .map(|r| r.score.to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

fn describe_reason(reason: &str) -> &str {
    match reason {
        "target_reached" => "target score reached with no remaining issues",
        "no_improvement" => "the model sees no further improvement possible",
        "stagnant" => "score stagnant across the last three iterations",
        "max_iterations" => "iteration budget exhausted",
        other => other,
    }
}
