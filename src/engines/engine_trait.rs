//! Engine abstraction used by the loader.
//!
//! An embedded engine is anything with a blocking text command loop. The
//! loader hands it the bound streams and a context for locating its data files.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use crate::resolver::resolver_chain::{NetworkFiles, ResolverChain};

/// What the loader passes to an engine before its loop starts.
#[derive(Debug, Clone, Default)]
pub struct EngineContext {
    args: Vec<String>,
    resolver: Arc<ResolverChain>,
}

impl EngineContext {
    pub fn new(resolver: Arc<ResolverChain>) -> Self {
        Self {
            args: Vec::new(),
            resolver,
        }
    }

    /// Command-line style arguments; empty unless set with `with_args`.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn resolve(&self, logical_name: &str) -> PathBuf {
        self.resolver.resolve(logical_name)
    }

    pub fn network_files(&self) -> NetworkFiles {
        NetworkFiles::resolve(&self.resolver)
    }
}

pub trait CommandLoop: Send {
    /// One-time internal setup, run after the streams are bound and before the loop.
    fn initialize(&mut self, _context: &EngineContext) -> io::Result<()> {
        Ok(())
    }

    /// Reads commands until the shutdown command (or end of input) and writes
    /// replies to `output`. Blocks for the whole session.
    fn run_loop(&mut self, input: &mut dyn BufRead, output: &mut dyn Write) -> io::Result<()>;
}

impl<T: CommandLoop + ?Sized> CommandLoop for Box<T> {
    fn initialize(&mut self, context: &EngineContext) -> io::Result<()> {
        (**self).initialize(context)
    }

    fn run_loop(&mut self, input: &mut dyn BufRead, output: &mut dyn Write) -> io::Result<()> {
        (**self).run_loop(input, output)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;

    use super::EngineContext;
    use crate::resolver::resolver_chain::ResolverChain;

    #[test]
    fn embedded_context_has_no_arguments() {
        let context = EngineContext::new(Arc::new(ResolverChain::new()));
        assert!(context.args().is_empty());

        let context = context.with_args(["bench", "16"]);
        assert_eq!(context.args().to_vec(), vec!["bench".to_owned(), "16".to_owned()]);
        assert_eq!(context.resolve("missing.nnue"), PathBuf::from("missing.nnue"));
    }
}
