//! proofgen: CLI driver that builds a named proof-expression module and
//! writes its three phase streams (`.ml-gamma`/`.ml-claim`/`.ml-proof`, or
//! `.pretty-gamma`/`.pretty-claim`/`.pretty-proof` in text form) to disk.
//!
//! Usage: `proofgen <module> <binary|pretty> <output_dir> <slice_name> [--optimize]`

#![forbid(unsafe_code)]

use std::{env, fs, path::PathBuf};

use mlproof::interpreter::counting::CountingInterpreter;
use mlproof::interpreter::memoizing::MemoizingInterpreter;
use mlproof::interpreter::pretty::PrettyPrintingInterpreter;
use mlproof::interpreter::serializing::SerializingInterpreter;
use mlproof::{Phase, ProofExp};

fn has_flag(args: &[String], key: &str) -> bool {
    args.iter().any(|a| a == key)
}

fn resolve_module(name: &str) -> anyhow::Result<ProofExp<'static>> {
    match name {
        "propositional" | "propositional.imp_refl" => Ok(mlproof::rules::propositional::module()),
        other => Err(anyhow::anyhow!("unknown module `{other}`; known modules: propositional")),
    }
}

/// Non-optimized path: one `SerializingInterpreter` pass, one op sequence.
fn run_binary(module_name: &str) -> anyhow::Result<(Vec<u8>, Vec<u8>, Vec<u8>)> {
    let module = resolve_module(module_name)?;
    let mut interp = SerializingInterpreter::new(Phase::Gamma);
    module.execute_full(&mut interp)?;
    Ok(interp.into_streams())
}

/// Optimized path: a dry run through [`CountingInterpreter`] tallies
/// repeated pattern construction, then a real emission pass through
/// [`MemoizingInterpreter`] splices `Save`/`Load` for whatever repeats.
/// `ProofExp` owns its build closures and can't be cloned, so each pass
/// gets its own freshly constructed module from the same named builder —
/// both passes walk the identical op sequence by construction.
fn run_binary_optimized(module_name: &str) -> anyhow::Result<(Vec<u8>, Vec<u8>, Vec<u8>)> {
    let dry_run = resolve_module(module_name)?;
    let mut counter = CountingInterpreter::new(Phase::Gamma);
    dry_run.execute_full(&mut counter)?;
    let reuse = counter.finalize();

    let emit = resolve_module(module_name)?;
    let serializer = SerializingInterpreter::new(Phase::Gamma);
    let mut memo = MemoizingInterpreter::new(serializer, reuse);
    emit.execute_full(&mut memo)?;
    Ok(memo.into_inner().into_streams())
}

fn run_pretty(module_name: &str) -> anyhow::Result<(String, String, String)> {
    let module = resolve_module(module_name)?;
    let mut interp = PrettyPrintingInterpreter::new(Phase::Gamma);
    module.execute_full(&mut interp)?;
    Ok(interp.into_logs())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(env::var("RUST_LOG").unwrap_or_else(|_| "mlproof=info".into()))
        .with_target(false)
        .compact()
        .init();

    let args: Vec<String> = env::args().collect();
    let positional: Vec<&String> = args.iter().skip(1).filter(|a| !a.starts_with("--")).collect();
    if positional.len() < 4 {
        anyhow::bail!("usage: proofgen <module> <binary|pretty> <output_dir> <slice_name> [--optimize]");
    }
    let module_name = positional[0].as_str();
    let format = positional[1].as_str();
    let output_dir = PathBuf::from(positional[2]);
    let slice_name = positional[3].as_str();
    let optimize = has_flag(&args, "--optimize");

    tracing::info!(module = module_name, format, optimize, "building proof module");

    fs::create_dir_all(&output_dir)?;

    match format {
        "binary" => {
            let (gamma, claim, proof) =
                if optimize { run_binary_optimized(module_name)? } else { run_binary(module_name)? };
            fs::write(output_dir.join(format!("{slice_name}.ml-gamma")), &gamma)?;
            fs::write(output_dir.join(format!("{slice_name}.ml-claim")), &claim)?;
            fs::write(output_dir.join(format!("{slice_name}.ml-proof")), &proof)?;
            tracing::info!(gamma = gamma.len(), claim = claim.len(), proof = proof.len(), "bytes written");
        }
        "pretty" => {
            let (gamma, claim, proof) = run_pretty(module_name)?;
            fs::write(output_dir.join(format!("{slice_name}.pretty-gamma")), gamma)?;
            fs::write(output_dir.join(format!("{slice_name}.pretty-claim")), claim)?;
            fs::write(output_dir.join(format!("{slice_name}.pretty-proof")), proof)?;
        }
        other => anyhow::bail!("unknown output format `{other}`; expected `binary` or `pretty`"),
    }

    tracing::info!(dir = %output_dir.display(), slice = slice_name, "proof streams written");
    Ok(())
}
