use anyhow::Context;
use processing::{
    classifier::Classifier,
    engine::DecisionEngine,
    model::{Decision, InferenceRequest},
};
use serde::Serialize;
use std::io::{BufRead, Write};

/// One line of `predict` output.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PredictionLine {
    Decision(Decision),
    Error { line: usize, error: String },
}

pub fn write_line<W: Write>(output: &mut W, line: &PredictionLine) -> anyhow::Result<()> {
    serde_json::to_writer(&mut *output, line).context("failed to serialize prediction")?;
    writeln!(output).context("failed to write prediction")
}

/// Decides every JSON request line of `input`, writing one JSON line per
/// request to `output`. Blank lines are skipped. Malformed or invalid
/// requests produce an error line and do not stop the run.
///
/// Returns the number of requests that failed.
pub fn run_requests<M, R, W>(engine: &DecisionEngine<M>, input: R, mut output: W) -> anyhow::Result<usize>
where
    M: Classifier,
    R: BufRead,
    W: Write,
{
    let mut failures = 0;
    for (index, line) in input.lines().enumerate() {
        let line = line.context("failed to read requests")?;
        if line.trim().is_empty() {
            continue;
        }
        let line_number = index + 1;

        let result = serde_json::from_str::<InferenceRequest>(&line)
            .map_err(|e| e.to_string())
            .and_then(|request| engine.decide(&request).map_err(|e| e.to_string()));

        let prediction = match result {
            Ok(decision) => PredictionLine::Decision(decision),
            Err(error) => {
                tracing::warn!(line = line_number, error = %error, "Rejected request");
                failures += 1;
                PredictionLine::Error {
                    line: line_number,
                    error,
                }
            }
        };
        write_line(&mut output, &prediction)?;
    }
    output.flush().context("failed to flush predictions")?;
    Ok(failures)
}
