use anyhow::Context;
use clap::{value_parser, Arg, ArgMatches, Command};
use cmt_console::{Console, ConsoleConfig};
use cmt_types::{ActivityEvent, EligibleCandidate, NewActivity};
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("cmtool")
        .version(cmt_console::VERSION)
        .about("Cloud instance sizing console")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .subcommand(
            Command::new("recommend")
                .about("Rank eligible instance types for a requirement")
                .arg(
                    Arg::new("cpu")
                        .long("cpu")
                        .required(true)
                        .value_parser(value_parser!(u32))
                        .help("Required vCPU count"),
                )
                .arg(
                    Arg::new("ram")
                        .long("ram")
                        .required(true)
                        .value_parser(value_parser!(f64))
                        .help("Required memory in GB"),
                ),
        )
        .subcommand(Command::new("candidates").about("Show the last published candidate list"))
        .subcommand(Command::new("activity").about("Show the provisioning activity log"))
        .subcommand(
            Command::new("record")
                .about("Append an event to the activity log")
                .arg(
                    Arg::new("kind")
                        .long("kind")
                        .required(true)
                        .help("Event kind, e.g. provision:create"),
                )
                .arg(Arg::new("region").long("region").help("Region (defaults to the configured one)"))
                .arg(Arg::new("instance-id").long("instance-id").help("Instance id"))
                .arg(Arg::new("instance-type").long("instance-type").help("Instance type")),
        )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();

    let matches = cli().get_matches();
    let config = ConsoleConfig::load(matches.get_one::<PathBuf>("config").map(PathBuf::as_path))
        .context("loading configuration")?;
    let console = Console::open(config).context("building sizing service client")?;

    match matches.subcommand() {
        Some(("recommend", args)) => recommend(&console, args).await?,
        Some(("candidates", _)) => print_candidates(console.candidates().as_slice()),
        Some(("activity", _)) => {
            for event in console.activity().iter() {
                print_event(event);
            }
        }
        Some(("record", args)) => {
            let event = console.record(new_activity(args));
            print_event(&event);
        }
        _ => {}
    }
    Ok(())
}

async fn recommend(console: &Console, args: &ArgMatches) -> anyhow::Result<()> {
    let cpu = args.get_one::<u32>("cpu").copied().unwrap_or_default();
    let ram = args.get_one::<f64>("ram").copied().unwrap_or_default();

    // views mounted before the run follow whatever it publishes
    let script = console.script_generator();
    let form = console.provision_form();

    let report = console.recommend(cpu, ram).await?;
    for warning in &report.warnings {
        println!("warning: {warning}");
    }
    match &report.best_pick {
        Some(pick) => println!(
            "best pick: {} ({})",
            pick.instance_type,
            format_price(pick.price_per_hour)
        ),
        None => println!("best pick: unavailable"),
    }
    println!("run {}: {}", report.sequence, report.outcome);

    print_candidates(&script.reconciler().candidates());
    if let Ok(request) = script.request() {
        println!("script request: {}", serde_json::to_string(&request)?);
    }
    if let Ok(request) = form.request() {
        println!("provision request: {}", serde_json::to_string(&request)?);
    }

    if !report.outcome.is_published() {
        anyhow::bail!("{}", report.outcome);
    }
    Ok(())
}

fn new_activity(args: &ArgMatches) -> NewActivity {
    let kind = args.get_one::<String>("kind").cloned().unwrap_or_default();
    let mut activity = NewActivity::new(kind);
    if let Some(region) = args.get_one::<String>("region") {
        activity = activity.region(region.as_str());
    }
    if let Some(id) = args.get_one::<String>("instance-id") {
        activity = activity.instance_id(id.as_str());
    }
    if let Some(itype) = args.get_one::<String>("instance-type") {
        activity = activity.instance_type(itype.as_str());
    }
    activity
}

fn format_price(price: Option<f64>) -> String {
    price.map_or_else(|| "n/a".to_string(), |p| format!("${p:.4}/h"))
}

fn print_candidates(candidates: &[EligibleCandidate]) {
    if candidates.is_empty() {
        println!("no candidates");
        return;
    }
    println!("{:<4}{:<20}{:>6}{:>10}{:>14}", "#", "instance type", "vCPU", "mem GB", "price");
    for (rank, c) in candidates.iter().enumerate() {
        println!(
            "{:<4}{:<20}{:>6}{:>10.1}{:>14}",
            rank + 1,
            c.instance_type,
            c.vcpu,
            c.memory_gb,
            format_price(c.price_per_hour)
        );
    }
}

fn print_event(event: &ActivityEvent) {
    println!(
        "{}  {:<20} {:<12} {:<14} {}",
        event.ts.format("%Y-%m-%d %H:%M:%S"),
        event.kind.as_str(),
        event.region.as_deref().unwrap_or("-"),
        event.instance_type.as_deref().unwrap_or("-"),
        event.instance_id.as_deref().unwrap_or("-"),
    );
}
