use gtpgen::error::Result;
use gtpgen::sink::PcapSink;
mod cmd;

use std::process;

use clap::Parser;

/// The entry point of the application.
///
/// Every error is fatal: it is logged and the process exits with a non-zero code.
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = cmd::Args::parse();

    if let Err(e) = run(args) {
        log::error!("{e}");
        process::exit(1);
    }
}

fn run(args: cmd::Args) -> Result<()> {
    let config = args.resolve()?;
    log::info!(
        "{} packets on {}: {}:{} -> {}:{}{}, payload {} bytes",
        config.count,
        config.device,
        config.src_ip,
        config.src_port,
        config.dst_ip,
        config.dst_port,
        config
            .teid
            .as_ref()
            .map(|teid| format!(", GTP-U teid {teid}"))
            .unwrap_or_default(),
        config.payload_len
    );
    log::debug!("Configuration: {:?}", config);
    // parse everything before touching the device
    let mut session = config.build_session()?;
    let mut sink = PcapSink::open(&config.device)?;
    session.run(&mut sink)?;
    Ok(())
}
