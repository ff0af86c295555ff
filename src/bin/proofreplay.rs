//! proofreplay: CLI driver that reads back the three files emitted by
//! `proofgen` in binary format and replays them through a fresh interpreter,
//! verifying the phase sequence and (optionally) printing a pretty trace.
//!
//! Usage: `proofreplay <input_dir> <slice_name> [--pretty]`
//!
//! Exits non-zero (via `anyhow::Result`'s top-level error report) the moment
//! any phase fails to replay — there is no partial-acceptance mode.

#![forbid(unsafe_code)]

use std::{env, fs, path::PathBuf};

use mlproof::interpreter::deserialize::Deserializer;
use mlproof::interpreter::pretty::PrettyPrintingInterpreter;
use mlproof::{Interpreter, Phase, StatefulInterpreter};

fn has_flag(args: &[String], key: &str) -> bool {
    args.iter().any(|a| a == key)
}

fn read_slice(dir: &std::path::Path, slice_name: &str, suffix: &str) -> anyhow::Result<Vec<u8>> {
    let path = dir.join(format!("{slice_name}.{suffix}"));
    fs::read(&path).map_err(|e| anyhow::anyhow!("reading {}: {e}", path.display()))
}

fn replay_quiet(gamma: &[u8], claim: &[u8], proof: &[u8]) -> anyhow::Result<StatefulInterpreter> {
    let mut interp = StatefulInterpreter::new(Phase::Gamma);
    Deserializer::new(gamma).run(&mut interp)?;
    interp.into_claim_phase()?;
    Deserializer::new(claim).run(&mut interp)?;
    interp.into_proof_phase()?;
    Deserializer::new(proof).run(&mut interp)?;
    Ok(interp)
}

fn replay_pretty(gamma: &[u8], claim: &[u8], proof: &[u8]) -> anyhow::Result<(String, String, String)> {
    let mut interp = PrettyPrintingInterpreter::new(Phase::Gamma);
    Deserializer::new(gamma).run(&mut interp)?;
    interp.into_claim_phase()?;
    Deserializer::new(claim).run(&mut interp)?;
    interp.into_proof_phase()?;
    Deserializer::new(proof).run(&mut interp)?;
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
    if positional.len() < 2 {
        anyhow::bail!("usage: proofreplay <input_dir> <slice_name> [--pretty]");
    }
    let input_dir = PathBuf::from(positional[0]);
    let slice_name = positional[1].as_str();
    let pretty = has_flag(&args, "--pretty");

    tracing::info!(dir = %input_dir.display(), slice = slice_name, "replaying proof streams");

    let gamma = read_slice(&input_dir, slice_name, "ml-gamma")?;
    let claim = read_slice(&input_dir, slice_name, "ml-claim")?;
    let proof = read_slice(&input_dir, slice_name, "ml-proof")?;

    if pretty {
        let (gamma_log, claim_log, proof_log) = replay_pretty(&gamma, &claim, &proof)?;
        print!("{gamma_log}{claim_log}{proof_log}");
        return Ok(());
    }

    let interp = replay_quiet(&gamma, &claim, &proof)?;
    // Gamma-phase axioms are deliberately left live on the stack by
    // `publish_axiom` (see interpreter/mod.rs), so a nonzero remainder here
    // is not itself an error — every `publish_proof` call above already
    // checked its conclusion against the matching claim or this function
    // would have returned `Err` first.
    tracing::info!(remaining_stack = interp.stack().len(), warnings = interp.warnings().len(), "replay completed");
    for warning in interp.warnings() {
        tracing::warn!(%warning);
    }
    println!("replay of `{slice_name}` in `{}` succeeded", input_dir.display());
    Ok(())
}
