use std::fmt::Display;

/// Return types a migration entry point may use.
///
/// `fn Up_5(tx: &mut Transaction<'_>)` and
/// `fn Up_5(tx: &mut Transaction<'_>) -> Result<(), E>` are both accepted;
/// the driver normalises either into a `Result` with a rendered error.
pub trait MigrationOutcome {
    fn into_outcome(self) -> Result<(), String>;
}

impl MigrationOutcome for () {
    fn into_outcome(self) -> Result<(), String> {
        Ok(())
    }
}

impl<E: Display> MigrationOutcome for Result<(), E> {
    fn into_outcome(self) -> Result<(), String> {
        self.map_err(|e| format!("{e:#}"))
    }
}
