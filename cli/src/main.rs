use clap::Parser;
use cli::{driver, repl};
use serde::Deserialize;
use simp::SimpOptions;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about = "Proof-producing term simplifier", long_about = None)]
struct Cli {
    /// Batch file of commands to run (starts a REPL when omitted)
    file: Option<PathBuf>,

    /// Do not generate equality proofs
    #[arg(long)]
    no_proofs: bool,

    /// Disable contextual simplification through congruence schemas
    #[arg(long)]
    no_contextual: bool,

    /// Stop after the first successful rewrite of each subterm
    #[arg(long)]
    single_pass: bool,

    /// Disable beta reduction
    #[arg(long)]
    no_beta: bool,

    /// Disable eta reduction
    #[arg(long)]
    no_eta: bool,

    /// Disable evaluation of value applications
    #[arg(long)]
    no_eval: bool,

    /// Unfold non-opaque definitions
    #[arg(long)]
    unfold: bool,

    /// Disable conditional rewriting
    #[arg(long)]
    no_conditional: bool,

    /// Disable memoization of intermediate results
    #[arg(long)]
    no_memoize: bool,

    /// Abort after this many traversal steps
    #[arg(long)]
    max_steps: Option<u64>,

    /// JSON file with option overrides (same names as the flags' options)
    #[arg(long)]
    options: Option<PathBuf>,
}

/// Option overrides loadable from a JSON file; absent fields keep their
/// current value.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct OptionsFile {
    proofs: Option<bool>,
    contextual: Option<bool>,
    single_pass: Option<bool>,
    beta: Option<bool>,
    eta: Option<bool>,
    eval: Option<bool>,
    unfold: Option<bool>,
    conditional: Option<bool>,
    memoize: Option<bool>,
    max_steps: Option<u64>,
}

impl OptionsFile {
    fn apply(&self, opts: &mut SimpOptions) {
        if let Some(v) = self.proofs {
            opts.proofs = v;
        }
        if let Some(v) = self.contextual {
            opts.contextual = v;
        }
        if let Some(v) = self.single_pass {
            opts.single_pass = v;
        }
        if let Some(v) = self.beta {
            opts.beta = v;
        }
        if let Some(v) = self.eta {
            opts.eta = v;
        }
        if let Some(v) = self.eval {
            opts.eval = v;
        }
        if let Some(v) = self.unfold {
            opts.unfold = v;
        }
        if let Some(v) = self.conditional {
            opts.conditional = v;
        }
        if let Some(v) = self.memoize {
            opts.memoize = v;
        }
        if let Some(v) = self.max_steps {
            opts.max_steps = v;
        }
    }
}

fn build_options(cli: &Cli) -> anyhow::Result<SimpOptions> {
    let mut opts = SimpOptions::default();
    if let Some(path) = &cli.options {
        let text = std::fs::read_to_string(path)?;
        let file: OptionsFile = serde_json::from_str(&text)?;
        file.apply(&mut opts);
    }
    if cli.no_proofs {
        opts.proofs = false;
    }
    if cli.no_contextual {
        opts.contextual = false;
    }
    if cli.single_pass {
        opts.single_pass = true;
    }
    if cli.no_beta {
        opts.beta = false;
    }
    if cli.no_eta {
        opts.eta = false;
    }
    if cli.no_eval {
        opts.eval = false;
    }
    if cli.unfold {
        opts.unfold = true;
    }
    if cli.no_conditional {
        opts.conditional = false;
    }
    if cli.no_memoize {
        opts.memoize = false;
    }
    if let Some(n) = cli.max_steps {
        opts.max_steps = n;
    }
    Ok(opts)
}

fn main() {
    let cli = Cli::parse();
    let opts = match build_options(&cli) {
        Ok(opts) => opts,
        Err(e) => {
            eprintln!("Invalid options: {e}");
            std::process::exit(2);
        }
    };
    let mut session = driver::Session::new(opts);
    match &cli.file {
        Some(path) => match session.run_file(path) {
            Ok(out) => print!("{out}"),
            Err(e) => {
                eprintln!("{e}");
                std::process::exit(1);
            }
        },
        None => repl::start(session),
    }
}
