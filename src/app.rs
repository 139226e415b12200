//! Interactive terminal review session.
//! Shows each due word, reveals its definition on Enter and asks for a grade.

use colored::*;
use eyre::Result;
use log::info;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use vocab_review::{Quality, ReviewError, SessionController, SessionStatus, SqliteCardStore};

/// Parses a grade typed by the user: 0-5, or y/n for a plain right/wrong answer.
fn parse_answer(input: &str) -> Option<i64> {
    match input.trim().to_lowercase().as_str() {
        "y" | "yes" => Some(Quality::from_correct(true).value() as i64),
        "n" | "no" => Some(Quality::from_correct(false).value() as i64),
        other => other.parse::<i64>().ok(),
    }
}

async fn prompt(lines: &mut Lines<BufReader<Stdin>>, message: &str) -> Result<Option<String>> {
    println!("{}", message.dimmed());
    Ok(lines.next_line().await?)
}

pub async fn run_review(
    controller: &SessionController,
    store: Arc<SqliteCardStore>,
    limit: i64,
) -> Result<()> {
    let outcome = match controller.start(limit, store.as_ref()).await {
        Ok(outcome) => outcome,
        Err(ReviewError::EmptyPool) => {
            println!("{}", "No vocabulary yet. Add or import words first.".yellow());
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };

    if outcome.status == SessionStatus::Empty {
        println!("{}", "Nothing due for review right now. Well done!".green());
        return Ok(());
    }
    println!("{} {} cards", "Starting review:".cyan(), outcome.cards.len());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut card = controller.current_card();

    while let Some(current) = card {
        let (term, definition) = match store.get_vocabulary(&current.vocabulary_id).await? {
            Some(item) => (item.term, item.definition),
            None => (current.vocabulary_id.clone(), "(definition missing)".to_string()),
        };

        println!();
        println!("{}", controller.progress_message().dimmed());
        println!("  {}", term.bold());

        match prompt(&mut lines, "Press Enter to reveal, q to quit").await? {
            Some(line) if line.trim() != "q" => {}
            _ => {
                controller.cancel();
                println!("{}", "Session cancelled.".yellow());
                return Ok(());
            }
        }
        println!("  {}", definition.green());

        card = loop {
            let Some(line) = prompt(&mut lines, "How well did you recall it? 0-5 (or y/n)").await?
            else {
                controller.cancel();
                return Ok(());
            };
            let Some(quality) = parse_answer(&line) else {
                println!("{}", "Enter a number from 0 to 5, or y/n.".red());
                continue;
            };

            match controller.grade(&current.card_id, quality).await {
                Ok(graded) => break graded.next_card,
                Err(err @ ReviewError::InvalidQuality(_)) => println!("{}", err.to_string().red()),
                Err(err) if err.is_retryable() => {
                    println!("{} {}", "Could not save, try again:".red(), err);
                }
                Err(err) => return Err(err.into()),
            }
        };
    }

    let progress = controller.progress();
    info!("Review finished with {} gradings", progress.graded_count);
    println!();
    println!("{}", controller.progress_message().green().bold());

    let stats = controller.stats().await?;
    println!(
        "{} {} total, {} due, {} mature, accuracy {}%",
        "Stats:".cyan(),
        stats.total,
        stats.due_for_review,
        stats.mature,
        stats.accuracy_percent()
    );
    Ok(())
}
