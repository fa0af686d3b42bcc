//! Answering decision requests on the terminal.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use texsort_learning::Suggestion;
use texsort_organize::{Decision, DecisionRequest, Mode};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Stdin, stdin, stdout};
use tokio::sync::mpsc;

/// Asks about every request until the organizer hangs up or stdin closes.
/// Closing stdin drops the receiver, which stops the run.
pub async fn answer(mut requests: mpsc::Receiver<DecisionRequest>) -> Result<()> {
    let mut lines = BufReader::new(stdin()).lines();
    while let Some(request) = requests.recv().await {
        print_request(&request).await?;
        let Some(line) = read_line(&mut lines).await? else {
            return Ok(());
        };
        let decision = parse_answer(&line, &request.suggestions);
        tracing::debug!(file = %request.texture.filename, ?decision, "Operator answered");
        request.respond(decision);
    }
    Ok(())
}

async fn print_request(request: &DecisionRequest) -> Result<()> {
    let mut text = format!("\n{}\n", request.texture.path.display());
    for (n, suggestion) in request.suggestions.iter().enumerate() {
        text.push_str(&format!("  {}) {} ({:.0}%)\n", n + 1, suggestion.destination, suggestion.score * 100.0));
    }
    let hint = match request.mode {
        Mode::Manual => "folder",
        _ => "number or folder",
    };
    text.push_str(&format!("{hint}, [r]eject, or enter for {}: ", request.accepted_destination()));
    let mut out = stdout();
    out.write_all(text.as_bytes()).await.or_raise(|| ErrorKind::Input)?;
    out.flush().await.or_raise(|| ErrorKind::Input)
}

async fn read_line(lines: &mut tokio::io::Lines<BufReader<Stdin>>) -> Result<Option<String>> {
    lines.next_line().await.or_raise(|| ErrorKind::Input)
}

/// Blank accepts, `r` rejects, a number picks that suggestion and anything
/// else is taken as the folder.
pub fn parse_answer(input: &str, suggestions: &[Suggestion]) -> Decision {
    let input = input.trim();
    match input.to_lowercase().as_str() {
        "" | "y" | "yes" => return Decision::Accept,
        "r" | "reject" | "n" | "no" => return Decision::Reject,
        _ => {},
    }
    match input.parse::<usize>() {
        Ok(n) if (1..=suggestions.len()).contains(&n) => Decision::Override(suggestions[n - 1].destination.clone()),
        _ => Decision::Override(input.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn suggestions() -> Vec<Suggestion> {
        ["character/kratos", "character"]
            .into_iter()
            .map(|d| Suggestion { destination: d.to_string(), score: 0.5, last_learned: None })
            .collect()
    }

    #[rstest]
    #[case("", Decision::Accept)]
    #[case(" Y ", Decision::Accept)]
    #[case("r", Decision::Reject)]
    #[case("NO", Decision::Reject)]
    #[case("2", Decision::Override("character".to_string()))]
    #[case("3", Decision::Override("3".to_string()))]
    #[case(" weapons/blades ", Decision::Override("weapons/blades".to_string()))]
    fn test_parse_answer(#[case] input: &str, #[case] expected: Decision) {
        assert_eq!(parse_answer(input, &suggestions()), expected);
    }
}
