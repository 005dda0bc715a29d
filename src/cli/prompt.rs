use std::io::{self, BufRead, StdinLock, Stdout, Write};

use tracing::warn;

use crate::{
    planner::{
        entities::{Category, CategoryId},
        prompt::CategoryPrompt,
        timer::HistoryRecord,
    },
    utils::time::format_seconds,
};

/// Numbered category picker on a line based terminal.
pub struct LinePrompt<R, W> {
    input: R,
    output: W,
}

impl LinePrompt<StdinLock<'static>, Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> LinePrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn ask(
        &mut self,
        record: &HistoryRecord,
        categories: &[Category],
    ) -> io::Result<Option<CategoryId>> {
        writeln!(
            self.output,
            "Save {} to which category? Enter number (empty to cancel):",
            format_seconds(record.duration_seconds)
        )?;
        for (i, category) in categories.iter().enumerate() {
            writeln!(self.output, "{}. {}", i + 1, category.name)?;
        }
        self.output.flush()?;

        let mut line = String::new();
        self.input.read_line(&mut line)?;
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let choice = line
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| categories.get(i));
        match choice {
            Some(category) => Ok(Some(category.id.clone())),
            None => {
                writeln!(self.output, "Invalid choice.")?;
                Ok(None)
            }
        }
    }
}

impl<R: BufRead, W: Write> CategoryPrompt for LinePrompt<R, W> {
    fn choose_category(
        &mut self,
        record: &HistoryRecord,
        categories: &[Category],
    ) -> Option<CategoryId> {
        self.ask(record, categories).unwrap_or_else(|e| {
            warn!("Category prompt failed {e}");
            None
        })
    }
}
