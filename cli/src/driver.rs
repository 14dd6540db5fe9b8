//! Batch driver: executes parsed commands against a session holding the
//! environment, the named rule sets, and the simplifier options.

use crate::parser::{Command, Parser};
use anyhow::{anyhow, bail, Context as _, Result};
use kernel::checker::{infer_type, Context, Definition};
use kernel::display::display;
use kernel::prelude::std_env;
use simp::{simplify_named, CongrSchema, RuleSet, RuleSetStore, SimpOptions};
use std::path::Path;

pub struct Session {
    env: kernel::checker::Env,
    store: RuleSetStore,
    /// Registration order; `simp` uses every registered set.
    set_order: Vec<String>,
    pub opts: SimpOptions,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(SimpOptions::default())
    }
}

impl Session {
    pub fn new(opts: SimpOptions) -> Self {
        Session {
            env: std_env(),
            store: RuleSetStore::new(),
            set_order: Vec::new(),
            opts,
        }
    }

    /// Execute one command line; returns the text to show, if any.
    pub fn exec_line(&mut self, line: &str) -> Result<Option<String>> {
        let line = line.trim();
        if line.is_empty() || line.starts_with(';') {
            return Ok(None);
        }
        let cmd = Parser::new(line)
            .parse_command()
            .map_err(|e| anyhow!("parse error: {e}"))?;
        self.exec(cmd)
    }

    fn exec(&mut self, cmd: Command) -> Result<Option<String>> {
        match cmd {
            Command::Axiom { name, ty } => {
                infer_type(&self.env, &Context::new(), &ty)
                    .map_err(|e| anyhow!("ill-formed axiom type: {e}"))?;
                self.env
                    .add_definition(Definition::axiom(&name, ty))
                    .map_err(|e| anyhow!("{e}"))?;
                Ok(None)
            }
            Command::Def { name, ty, value } => {
                infer_type(&self.env, &Context::new(), &ty)
                    .map_err(|e| anyhow!("ill-formed type: {e}"))?;
                let value_ty = infer_type(&self.env, &Context::new(), &value)
                    .map_err(|e| anyhow!("ill-formed value: {e}"))?;
                if !kernel::checker::is_convertible(&self.env, &value_ty, &ty)
                    .map_err(|e| anyhow!("{e}"))?
                {
                    bail!(
                        "definition {}: value has type {}, expected {}",
                        name,
                        display(&value_ty),
                        display(&ty)
                    );
                }
                self.env
                    .add_definition(Definition::definition(&name, ty, value))
                    .map_err(|e| anyhow!("{e}"))?;
                Ok(None)
            }
            Command::Rule { set, fact } => {
                if self.store.get(&set).is_none() {
                    self.store.register(RuleSet::new(&set));
                    self.set_order.push(set.clone());
                }
                let rs = self
                    .store
                    .get_mut(&set)
                    .ok_or_else(|| anyhow!("rule set {set} vanished"))?;
                if !rs.insert_const(&self.env, &fact) {
                    bail!("no usable rule in {fact}");
                }
                Ok(None)
            }
            Command::CongrIte { set } => {
                if self.store.get(&set).is_none() {
                    self.store.register(RuleSet::new(&set));
                    self.set_order.push(set.clone());
                }
                let rs = self
                    .store
                    .get_mut(&set)
                    .ok_or_else(|| anyhow!("rule set {set} vanished"))?;
                rs.add_congr(CongrSchema::for_ite());
                Ok(None)
            }
            Command::Simp { term } => {
                infer_type(&self.env, &Context::new(), &term)
                    .map_err(|e| anyhow!("ill-typed term: {e}"))?;
                let names: Vec<&str> = self.set_order.iter().map(|s| s.as_str()).collect();
                let (out, proof) = simplify_named(
                    &term,
                    &self.env,
                    Context::new(),
                    self.opts.clone(),
                    &self.store,
                    &names,
                )
                .map_err(|e| anyhow!("{e}"))?;
                Ok(Some(format!(
                    "{}\n  by {}",
                    display(&out),
                    display(&proof)
                )))
            }
            Command::Infer { term } => {
                let ty = infer_type(&self.env, &Context::new(), &term)
                    .map_err(|e| anyhow!("{e}"))?;
                Ok(Some(format!("{}", display(&ty))))
            }
        }
    }

    /// Run a batch file, printing each command's output.
    pub fn run_file(&mut self, path: &Path) -> Result<String> {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        self.run_source(&source)
    }

    pub fn run_source(&mut self, source: &str) -> Result<String> {
        let mut out = String::new();
        for (lineno, line) in source.lines().enumerate() {
            match self.exec_line(line) {
                Ok(Some(text)) => {
                    out.push_str(&text);
                    out.push('\n');
                }
                Ok(None) => {}
                Err(e) => bail!("line {}: {e}", lineno + 1),
            }
        }
        Ok(out)
    }
}
