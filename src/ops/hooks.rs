//! Callbacks fired after packages have been installed.

use std::fmt;

/// A zero-argument install callback.
pub type HookFn = Box<dyn Fn() -> anyhow::Result<()>>;

/// An ordered list of named install callbacks.
#[derive(Default)]
pub struct InstallHooks {
    hooks: Vec<(String, HookFn)>,
}

/// Outcome of running every registered hook.
#[derive(Debug, Default)]
pub struct HookReport {
    /// Number of hooks that ran.
    pub ran: usize,

    /// Hooks that failed, in registration order.
    pub failures: Vec<(String, anyhow::Error)>,
}

impl HookReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Names of the failed hooks.
    pub fn failed_hooks(&self) -> impl Iterator<Item = &str> {
        self.failures.iter().map(|(name, _)| name.as_str())
    }
}

impl InstallHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a hook. Hooks run in registration order.
    pub fn register<F>(&mut self, name: impl Into<String>, hook: F) -> &mut Self
    where
        F: Fn() -> anyhow::Result<()> + 'static,
    {
        self.hooks.push((name.into(), Box::new(hook)));
        self
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Run every hook. A failing hook is logged and recorded; the rest still run.
    pub fn run(&self) -> HookReport {
        let mut report = HookReport::default();

        for (name, hook) in &self.hooks {
            tracing::debug!("running install hook `{}`", name);
            report.ran += 1;

            if let Err(err) = hook() {
                tracing::warn!("install hook `{}` failed: {:#}", name, err);
                report.failures.push((name.clone(), err));
            }
        }

        report
    }
}

impl fmt::Debug for InstallHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.hooks.iter().map(|(name, _)| name))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_hooks_run_in_order() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let mut hooks = InstallHooks::new();

        for name in ["first", "second"] {
            let calls = Rc::clone(&calls);
            hooks.register(name, move || {
                calls.borrow_mut().push(name);
                Ok(())
            });
        }

        let report = hooks.run();
        assert!(report.is_success());
        assert_eq!(report.ran, 2);
        assert_eq!(*calls.borrow(), vec!["first", "second"]);
    }

    #[test]
    fn test_failing_hook_does_not_stop_others() {
        let reached = Rc::new(RefCell::new(false));
        let flag = Rc::clone(&reached);

        let mut hooks = InstallHooks::new();
        hooks
            .register("broken", || anyhow::bail!("cache clear failed"))
            .register("after", move || {
                *flag.borrow_mut() = true;
                Ok(())
            });

        let report = hooks.run();
        assert!(*reached.borrow());
        assert_eq!(report.ran, 2);
        assert_eq!(report.failed_hooks().collect::<Vec<_>>(), vec!["broken"]);
        assert_eq!(report.failures[0].1.to_string(), "cache clear failed");
    }

    #[test]
    fn test_empty_hooks() {
        let hooks = InstallHooks::new();
        assert!(hooks.is_empty());
        let report = hooks.run();
        assert_eq!(report.ran, 0);
        assert!(report.is_success());
    }
}
