use crate::{config::Config, prompt::Prompter, registry::ProfileStore, runner::CommandRunner};

/// Everything one maintenance run needs, passed to each operation
pub struct Session<'a> {
    /// When set, mutating steps only log what they would do
    pub dry_run: bool,
    pub config: &'a Config,
    pub runner: &'a dyn CommandRunner,
    pub profiles: &'a dyn ProfileStore,
    pub prompter: &'a mut dyn Prompter,
}

impl<'a> Session<'a> {
    pub fn new(
        config: &'a Config,
        runner: &'a dyn CommandRunner,
        profiles: &'a dyn ProfileStore,
        prompter: &'a mut dyn Prompter,
    ) -> Self {
        Self {
            dry_run: false,
            config,
            runner,
            profiles,
            prompter,
        }
    }

    /// Same session with dry-run set
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Flips dry-run and returns the new state
    pub fn toggle_dry_run(&mut self) -> bool {
        self.dry_run = !self.dry_run;
        self.dry_run
    }
}
